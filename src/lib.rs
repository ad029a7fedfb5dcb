//! Hive full node written in Rust

/// Block index and active chain state
pub mod blockchain;
/// Utilities for working with coins (UTXO set)
pub mod coins;
/// On-disk key-value storage
pub mod db;
/// Error types
pub mod error;

pub use blockchain::{BlockIndex, Chain, ChainEntry, ChainStore};
pub use coins::{Coin, CoinsDb, CoinsView, CoinsViewCache, UndoCoins};
