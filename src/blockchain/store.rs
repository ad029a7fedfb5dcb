use super::{BlockIndex, Chain, ChainEntry};
use crate::db::{Batch, Database, DiskDatabase};
use crate::error::DBError;
use bitcoin::BlockHash;
use log::info;
use std::path::PathBuf;

/// On-disk header index, so a restart picks up the chain where it left off
/// instead of redownloading headers.
///
/// Entries are stored with their computed skip hash, which is what lets
/// [`load_index`](ChainStore::load_index) repopulate the arena in whatever
/// order the column yields them.
pub struct ChainStore {
    db: DiskDatabase,
}

impl ChainStore {
    pub fn open(path: PathBuf) -> Result<Self, DBError> {
        Ok(Self {
            db: DiskDatabase::open(path, key::columns())?,
        })
    }

    /// Persist a linked entry
    pub fn save_entry(&self, entry: &ChainEntry) -> Result<(), DBError> {
        let mut batch = Batch::new();
        batch.insert(Key::Entry(entry.hash), entry)?;
        self.db.write_batch(batch)
    }

    /// Record the hash of the active chain's tip
    pub fn set_tip(&self, hash: &BlockHash) -> Result<(), DBError> {
        let mut batch = Batch::new();
        batch.insert(Key::Tip, hash)?;
        self.db.write_batch(batch)
    }

    pub fn tip(&self) -> Result<Option<BlockHash>, DBError> {
        self.db.get(Key::Tip)
    }

    /// Rebuild the in-memory block index from every stored entry
    pub fn load_index(&self) -> Result<BlockIndex, DBError> {
        info!("Populating block index");
        let mut index = BlockIndex::new();
        for (_, entry) in self.db.iter_cf::<ChainEntry>(key::COL_ENTRY)? {
            index.restore(entry);
        }
        info!("Loaded block index with {} entries", index.len());
        Ok(index)
    }

    /// Rebuild the active chain from the stored tip hash
    pub fn load_chain(&self, index: &BlockIndex) -> Result<Chain, DBError> {
        let mut chain = Chain::new();
        if let Some(hash) = self.tip()? {
            chain.set_tip(index.get(&hash), index);
        }
        Ok(chain)
    }
}

use key::Key;

mod key {
    use crate::db::DBKey;
    use bitcoin::consensus::{Encodable, WriteExt};
    use bitcoin::{io, BlockHash};

    pub const COL_ENTRY: &str = "E";
    pub const COL_MISC: &str = "M";

    pub const KEY_TIP: [u8; 1] = [0];

    pub fn columns() -> Vec<&'static str> {
        vec![COL_ENTRY, COL_MISC]
    }

    pub enum Key {
        Entry(BlockHash),
        Tip,
    }

    impl DBKey for Key {
        fn col(&self) -> &'static str {
            match self {
                Key::Entry(_) => COL_ENTRY,
                Key::Tip => COL_MISC,
            }
        }
    }

    impl Encodable for Key {
        fn consensus_encode<W: io::Write + ?Sized>(&self, e: &mut W) -> Result<usize, io::Error> {
            Ok(match self {
                Key::Entry(hash) => hash.consensus_encode(e)?,
                Key::Tip => {
                    e.emit_slice(&KEY_TIP)?;
                    1
                }
            })
        }
    }
}
