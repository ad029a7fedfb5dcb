use super::{Coin, CoinsMap, CoinsView};
use crate::db::{Batch, Database, DiskDatabase};
use crate::error::DBError;
use bitcoin::{BlockHash, OutPoint};
use log::debug;
use std::path::PathBuf;

/// The persistent half of the UTXO set.
///
/// Keys are outpoints, values are live coins; a spent coin is a deletion,
/// never a stored value. All writes go through one atomic batch so a failed
/// flush leaves the store at its previous best block.
pub struct CoinsDb {
    db: DiskDatabase,
}

impl CoinsDb {
    pub fn open(path: PathBuf) -> Result<Self, DBError> {
        Ok(Self {
            db: DiskDatabase::open(path, key::columns())?,
        })
    }
}

impl CoinsView for CoinsDb {
    fn get_coin(&mut self, outpoint: &OutPoint) -> Result<Option<Coin>, DBError> {
        self.db.get(Key::Coin(*outpoint))
    }

    fn have_coin(&mut self, outpoint: &OutPoint) -> Result<bool, DBError> {
        self.db.has(Key::Coin(*outpoint))
    }

    fn get_best_block(&mut self) -> Result<Option<BlockHash>, DBError> {
        self.db.get(Key::BestBlock)
    }

    fn get_head_blocks(&mut self) -> Result<Vec<BlockHash>, DBError> {
        Ok(self.db.get(Key::HeadBlocks)?.unwrap_or_default())
    }

    fn batch_write(
        &mut self,
        changes: &mut CoinsMap,
        best_block: BlockHash,
    ) -> Result<(), DBError> {
        let mut batch = Batch::new();
        let mut written = 0usize;
        let mut erased = 0usize;

        for (outpoint, entry) in changes.iter() {
            if !entry.is_dirty() {
                continue;
            }
            if entry.coin.is_spent() {
                batch.remove(Key::Coin(*outpoint));
                erased += 1;
            } else {
                batch.insert(Key::Coin(*outpoint), &entry.coin)?;
                written += 1;
            }
        }
        batch.insert(Key::BestBlock, &best_block)?;

        self.db.write_batch(batch)?;

        // Only consume the change set once the write is on disk
        changes.clear();
        debug!(
            "Committed coins to disk: written={} erased={} best={}",
            written, erased, best_block
        );
        Ok(())
    }
}

use key::Key;

mod key {
    use crate::db::DBKey;
    use bitcoin::consensus::{Encodable, WriteExt};
    use bitcoin::{io, OutPoint};

    pub const COL_COIN: &str = "C";
    pub const COL_MISC: &str = "M";

    pub const KEY_BEST_BLOCK: [u8; 1] = [0];
    pub const KEY_HEAD_BLOCKS: [u8; 1] = [1];

    pub fn columns() -> Vec<&'static str> {
        vec![COL_COIN, COL_MISC]
    }

    pub enum Key {
        Coin(OutPoint),
        BestBlock,
        HeadBlocks,
    }

    impl DBKey for Key {
        fn col(&self) -> &'static str {
            match self {
                Key::Coin(_) => COL_COIN,
                Key::BestBlock | Key::HeadBlocks => COL_MISC,
            }
        }
    }

    impl Encodable for Key {
        fn consensus_encode<W: io::Write + ?Sized>(&self, e: &mut W) -> Result<usize, io::Error> {
            Ok(match self {
                Key::Coin(outpoint) => outpoint.consensus_encode(e)?,
                Key::BestBlock => {
                    e.emit_slice(&KEY_BEST_BLOCK)?;
                    1
                }
                Key::HeadBlocks => {
                    e.emit_slice(&KEY_HEAD_BLOCKS)?;
                    1
                }
            })
        }
    }
}
