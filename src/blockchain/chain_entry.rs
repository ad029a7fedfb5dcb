use bitcoin::block::{Header, Version};
use bitcoin::pow::Work;
use bitcoin::{BlockHash, CompactTarget, TxMerkleNode};

/// An entry in the block index.
/// Essentially a block header with its position in the chain attached.
///
/// Entries link to their parent and skip ancestor by hash, resolved through
/// the owning [`BlockIndex`](super::BlockIndex); once linked, an entry never
/// changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainEntry {
    pub hash: BlockHash,
    pub version: i32,
    pub prev_block: BlockHash,
    pub merkle_root: TxMerkleNode,
    pub time: u32,
    /// Maximum header time seen on the path from genesis to this entry.
    /// Monotonic along any chain, which is what makes time queries over
    /// the active chain binary-searchable.
    pub time_max: u32,
    pub bits: u32,
    pub nonce: u32,
    /// Height of this entry in the chain
    pub height: u32,
    /// Work accumulated over this block and all its ancestors. The
    /// per-block contribution is supplied by the consensus layer and only
    /// ever compared, never inspected, here.
    pub chainwork: Work,
    /// Ancestor hash used for fast ancestor traversal, fixed at link time
    pub skip: Option<BlockHash>,
}

impl ChainEntry {
    /// Create a chain entry from a block header and previous chain entry
    /// (unless genesis). `proof` is this block's own work contribution.
    pub fn from_block_header(header: &Header, prev: Option<&Self>, proof: Work) -> Self {
        Self {
            hash: header.block_hash(),
            version: header.version.to_consensus(),
            prev_block: header.prev_blockhash,
            merkle_root: header.merkle_root,
            time: header.time,
            time_max: match prev {
                Some(prev) => prev.time_max.max(header.time),
                None => header.time,
            },
            bits: header.bits.to_consensus(),
            nonce: header.nonce,
            height: match prev {
                Some(prev) => prev.height + 1,
                None => 0,
            },
            chainwork: match prev {
                Some(prev) => prev.chainwork + proof,
                None => proof,
            },
            skip: None,
        }
    }

    /// Whether the entry is for the genesis block
    pub fn is_genesis(&self) -> bool {
        self.height == 0
    }
}

impl From<&ChainEntry> for Header {
    fn from(entry: &ChainEntry) -> Self {
        Self {
            version: Version::from_consensus(entry.version),
            prev_blockhash: entry.prev_block,
            merkle_root: entry.merkle_root,
            time: entry.time,
            bits: CompactTarget::from_consensus(entry.bits),
            nonce: entry.nonce,
        }
    }
}
