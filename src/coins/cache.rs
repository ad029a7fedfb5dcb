use super::{CacheEntry, Coin, CoinFlags, CoinsMap, CoinsView};
use crate::error::DBError;
use bitcoin::{Amount, BlockHash, OutPoint, Transaction};
use std::collections::hash_map::Entry;
use std::mem;

/// An in-memory overlay over a backing [`CoinsView`].
///
/// Coins are pulled up lazily on first access and written back in a single
/// atomic batch on [`flush`](CoinsViewCache::flush). Entries track whether
/// they differ from the backing view (`DIRTY`) and whether the backing view
/// has any record of them (`FRESH`); a coin that is created and spent
/// between two flushes never touches the backing store at all.
///
/// The cache performs no internal locking. Callers serialize mutating
/// access around each sequence of operations that must appear atomic.
pub struct CoinsViewCache<V> {
    base: V,
    map: CoinsMap,
    best_block: Option<BlockHash>,
    /// Running total of the heap memory held by cached coins, maintained at
    /// every point an entry is materialized, replaced or dropped
    cached_coins_usage: usize,
}

impl<V: CoinsView> CoinsViewCache<V> {
    pub fn new(base: V) -> Self {
        Self {
            base,
            map: CoinsMap::default(),
            best_block: None,
            cached_coins_usage: 0,
        }
    }

    pub fn base(&self) -> &V {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut V {
        &mut self.base
    }

    /// Pull the entry for an outpoint into the cache, fetching from the
    /// backing view at most once
    fn fetch(&mut self, outpoint: OutPoint) -> Result<Option<&mut CacheEntry>, DBError> {
        match self.map.entry(outpoint) {
            Entry::Occupied(entry) => Ok(Some(entry.into_mut())),
            Entry::Vacant(entry) => match self.base.get_coin(&outpoint)? {
                Some(coin) => {
                    let mut flags = CoinFlags::empty();
                    if coin.is_spent() {
                        // The backing view should never report a spent
                        // coin, but if it does the entry is droppable
                        flags |= CoinFlags::FRESH;
                    }
                    self.cached_coins_usage += coin.dynamic_memory_usage();
                    Ok(Some(entry.insert(CacheEntry::new(coin, flags))))
                }
                None => Ok(None),
            },
        }
    }

    /// Borrow the live coin at an outpoint, pulling it into the cache
    pub fn access_coin(&mut self, outpoint: &OutPoint) -> Result<Option<&Coin>, DBError> {
        Ok(self
            .fetch(*outpoint)?
            .map(|entry| &entry.coin)
            .filter(|coin| !coin.is_spent()))
    }

    /// Check the in-memory map only, without triggering a backing fetch.
    /// Distinguishes "known absent" from "not yet queried".
    pub fn have_coin_in_cache(&self, outpoint: &OutPoint) -> bool {
        self.map
            .get(outpoint)
            .map_or(false, |entry| !entry.coin.is_spent())
    }

    /// Add a coin at an outpoint.
    ///
    /// Panics if an unspent coin is already present and `possible_overwrite`
    /// is false: the caller's spending rules should have made double
    /// creation impossible, so this is a bug upstream, not bad input.
    pub fn add_coin(&mut self, outpoint: OutPoint, coin: Coin, possible_overwrite: bool) {
        assert!(!coin.is_spent(), "cannot add a spent coin");
        match self.map.entry(outpoint) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                let mut fresh = false;
                if !possible_overwrite {
                    assert!(
                        entry.coin.is_spent(),
                        "attempted to overwrite an unspent coin at {}",
                        outpoint
                    );
                    // A spent placeholder that was never flushed still has
                    // no on-disk record, so the replacement stays droppable
                    fresh = !entry.is_dirty();
                }
                self.cached_coins_usage -= entry.coin.dynamic_memory_usage();
                entry.coin = coin;
                entry.flags.insert(CoinFlags::DIRTY);
                if fresh {
                    entry.flags.insert(CoinFlags::FRESH);
                }
                self.cached_coins_usage += entry.coin.dynamic_memory_usage();
            }
            Entry::Vacant(vacant) => {
                let mut flags = CoinFlags::DIRTY;
                if !possible_overwrite {
                    flags |= CoinFlags::FRESH;
                }
                self.cached_coins_usage += coin.dynamic_memory_usage();
                vacant.insert(CacheEntry::new(coin, flags));
            }
        }
    }

    /// Add every spendable output of a transaction.
    /// Overwriting is only tolerated for coinbases, which historically
    /// could repeat an earlier transaction id.
    pub fn add_tx(&mut self, tx: &Transaction, height: u32) {
        let coinbase = tx.is_coinbase();
        let txid = tx.compute_txid();
        for (vout, output) in tx.output.iter().enumerate() {
            if output.script_pubkey.is_op_return() {
                continue;
            }
            let vout = vout as u32;
            self.add_coin(
                OutPoint { txid, vout },
                Coin::from_tx(tx, vout, height),
                coinbase,
            );
        }
    }

    /// Spend the coin at an outpoint, returning the taken coin, or `None`
    /// if the outpoint is unknown to both the cache and the backing view.
    ///
    /// A `FRESH` entry is erased outright: the backing view has nothing on
    /// record, so no deletion needs to be written for it. Anything else is
    /// cleared in place and marked `DIRTY` so the flush writes a deletion.
    pub fn spend_coin(&mut self, outpoint: &OutPoint) -> Result<Option<Coin>, DBError> {
        if self.fetch(*outpoint)?.is_none() {
            return Ok(None);
        }
        let entry = self.map.get_mut(outpoint).expect("entry was just fetched");
        self.cached_coins_usage -= entry.coin.dynamic_memory_usage();
        let coin = if entry.is_fresh() {
            let entry = self.map.remove(outpoint).expect("entry was just fetched");
            entry.coin
        } else {
            entry.flags.insert(CoinFlags::DIRTY);
            // take() leaves the spent/empty state behind as the tombstone
            mem::take(&mut entry.coin)
        };
        Ok(Some(coin))
    }

    pub fn set_best_block(&mut self, hash: BlockHash) {
        self.best_block = Some(hash);
    }

    /// Write the full dirty set to the backing view and reset the cache.
    /// If the backing write fails the cache is left exactly as it was, so
    /// the flush can be retried.
    pub fn flush(&mut self) -> Result<(), DBError> {
        let best_block = self
            .get_best_block()?
            .ok_or(DBError::Other("cannot flush without a best block"))?;
        let mut map = mem::take(&mut self.map);
        match self.base.batch_write(&mut map, best_block) {
            Ok(()) => {
                self.cached_coins_usage = 0;
                Ok(())
            }
            Err(err) => {
                self.map = map;
                Err(err)
            }
        }
    }

    /// Drop a clean entry purely to bound memory. Entries with pending
    /// state are left alone, since evicting them would lose it.
    pub fn uncache(&mut self, outpoint: &OutPoint) {
        if let Some(entry) = self.map.get(outpoint) {
            if entry.flags.is_empty() {
                self.cached_coins_usage -= entry.coin.dynamic_memory_usage();
                self.map.remove(outpoint);
            }
        }
    }

    /// Number of entries currently cached
    pub fn cache_size(&self) -> usize {
        self.map.len()
    }

    /// Approximate bytes of memory held by the cache, used by external
    /// flush-triggering logic
    pub fn dynamic_memory_usage(&self) -> usize {
        self.map.len() * mem::size_of::<(OutPoint, CacheEntry)>() + self.cached_coins_usage
    }

    /// Total value of the coins a transaction spends.
    /// The caller must have established with [`have_inputs`] that every
    /// input exists.
    ///
    /// [`have_inputs`]: CoinsViewCache::have_inputs
    pub fn get_value_in(&mut self, tx: &Transaction) -> Result<Amount, DBError> {
        if tx.is_coinbase() {
            return Ok(Amount::ZERO);
        }
        let mut total = Amount::ZERO;
        for input in &tx.input {
            let coin = self
                .access_coin(&input.previous_output)?
                .expect("input coin checked before use");
            total = total
                .checked_add(coin.output.value)
                .expect("input values already range checked");
        }
        Ok(total)
    }

    /// Whether every input of a transaction refers to a live coin
    pub fn have_inputs(&mut self, tx: &Transaction) -> Result<bool, DBError> {
        if tx.is_coinbase() {
            return Ok(true);
        }
        for input in &tx.input {
            if !self.have_coin(&input.previous_output)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl<V: CoinsView> CoinsView for CoinsViewCache<V> {
    fn get_coin(&mut self, outpoint: &OutPoint) -> Result<Option<Coin>, DBError> {
        Ok(self.access_coin(outpoint)?.cloned())
    }

    fn have_coin(&mut self, outpoint: &OutPoint) -> Result<bool, DBError> {
        Ok(self
            .fetch(*outpoint)?
            .map_or(false, |entry| !entry.coin.is_spent()))
    }

    fn get_best_block(&mut self) -> Result<Option<BlockHash>, DBError> {
        if self.best_block.is_none() {
            self.best_block = self.base.get_best_block()?;
        }
        Ok(self.best_block)
    }

    fn get_head_blocks(&mut self) -> Result<Vec<BlockHash>, DBError> {
        self.base.get_head_blocks()
    }

    /// Fold a child cache's dirty set into this one.
    ///
    /// An incoming `FRESH` entry colliding with an unspent coin here means
    /// the two views disagree about the UTXO set and is a bug in the
    /// caller's bookkeeping, so it panics rather than returning an error.
    /// A `FRESH` entry here that the child spent is erased outright, so
    /// tombstone avoidance propagates through nested flushes.
    fn batch_write(
        &mut self,
        changes: &mut CoinsMap,
        best_block: BlockHash,
    ) -> Result<(), DBError> {
        for (outpoint, incoming) in changes.drain() {
            if !incoming.is_dirty() {
                continue;
            }
            match self.map.entry(outpoint) {
                Entry::Vacant(vacant) => {
                    // A coin that was created and spent below us never
                    // needs to exist here either
                    if !(incoming.is_fresh() && incoming.coin.is_spent()) {
                        let mut flags = CoinFlags::DIRTY;
                        if incoming.is_fresh() {
                            flags |= CoinFlags::FRESH;
                        }
                        self.cached_coins_usage += incoming.coin.dynamic_memory_usage();
                        vacant.insert(CacheEntry::new(incoming.coin, flags));
                    }
                }
                Entry::Occupied(mut occupied) => {
                    assert!(
                        !(incoming.is_fresh() && !occupied.get().coin.is_spent()),
                        "fresh coin collides with an unspent coin at {}",
                        outpoint
                    );
                    if occupied.get().is_fresh() && incoming.coin.is_spent() {
                        self.cached_coins_usage -= occupied.get().coin.dynamic_memory_usage();
                        occupied.remove();
                    } else {
                        let entry = occupied.get_mut();
                        self.cached_coins_usage -= entry.coin.dynamic_memory_usage();
                        entry.coin = incoming.coin;
                        entry.flags.insert(CoinFlags::DIRTY);
                        self.cached_coins_usage += entry.coin.dynamic_memory_usage();
                    }
                }
            }
        }
        self.best_block = Some(best_block);
        Ok(())
    }
}
