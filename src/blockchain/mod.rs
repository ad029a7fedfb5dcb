mod block_index;
mod chain;
mod chain_entry;
mod store;

pub use block_index::BlockIndex;
pub use chain::Chain;
pub use chain_entry::ChainEntry;
pub use store::ChainStore;
