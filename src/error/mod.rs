use bitcoin::BlockHash;
use thiserror::Error;

/// Failures surfaced by the on-disk stores.
///
/// These are recoverable from the caller's perspective: the in-memory state
/// that produced the write is left untouched, so the operation can be
/// retried or abandoned.
#[derive(Debug, Error)]
pub enum DBError {
    #[error(transparent)]
    RocksDBError(#[from] rocksdb::Error),
    #[error(transparent)]
    EncodeError(#[from] bitcoin::consensus::encode::Error),
    #[error("{0}")]
    Other(&'static str),
}

#[derive(Debug, Error)]
pub enum ChainError {
    /// A header was linked before its previous header was known.
    /// Normal during sync when headers arrive out of order.
    #[error("previous entry {0} not found in block index")]
    UnknownPreviousEntry(BlockHash),
    #[error(transparent)]
    DB(#[from] DBError),
}
