use super::{CacheEntry, Coin};
use crate::error::DBError;
use bitcoin::{BlockHash, OutPoint};
use std::collections::HashMap;

/// The change set handed to a backing view on flush
pub type CoinsMap = HashMap<OutPoint, CacheEntry>;

/// A view of the UTXO set.
///
/// Implemented by the on-disk store and by the overlay cache, so caches can
/// be layered on either. Reads take `&mut self` because a caching
/// implementation fills itself lazily.
pub trait CoinsView {
    /// The live coin at this outpoint, if it exists and is unspent
    fn get_coin(&mut self, outpoint: &OutPoint) -> Result<Option<Coin>, DBError>;

    /// Existence check. Implementations with a cheaper direct lookup
    /// should override this.
    fn have_coin(&mut self, outpoint: &OutPoint) -> Result<bool, DBError> {
        Ok(self.get_coin(outpoint)?.is_some())
    }

    /// Hash of the block up to which this view's coin set is consistent
    fn get_best_block(&mut self) -> Result<Option<BlockHash>, DBError>;

    /// Blocks bracketing an interrupted flush, oldest last. Empty when the
    /// view is consistent.
    fn get_head_blocks(&mut self) -> Result<Vec<BlockHash>, DBError> {
        Ok(vec![])
    }

    /// Atomically apply a set of flagged entries and advance the recorded
    /// best block.
    ///
    /// On error the change set and the view must both be left unmodified so
    /// the caller can retry; entries may only be consumed on success.
    fn batch_write(&mut self, changes: &mut CoinsMap, best_block: BlockHash)
        -> Result<(), DBError>;
}

impl<V: CoinsView + ?Sized> CoinsView for &mut V {
    fn get_coin(&mut self, outpoint: &OutPoint) -> Result<Option<Coin>, DBError> {
        (**self).get_coin(outpoint)
    }

    fn have_coin(&mut self, outpoint: &OutPoint) -> Result<bool, DBError> {
        (**self).have_coin(outpoint)
    }

    fn get_best_block(&mut self) -> Result<Option<BlockHash>, DBError> {
        (**self).get_best_block()
    }

    fn get_head_blocks(&mut self) -> Result<Vec<BlockHash>, DBError> {
        (**self).get_head_blocks()
    }

    fn batch_write(
        &mut self,
        changes: &mut CoinsMap,
        best_block: BlockHash,
    ) -> Result<(), DBError> {
        (**self).batch_write(changes, best_block)
    }
}
