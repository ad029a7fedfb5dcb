use super::ChainEntry;
use crate::error::ChainError;
use bitcoin::BlockHash;
use std::collections::HashMap;

/// Height targeted by an entry's skip pointer, derived from the entry's
/// height alone. Spaces the pointers exponentially so that any ancestor
/// walk needs O(log n) hops.
fn skip_height(height: u32) -> u32 {
    if height < 2 {
        return 0;
    }

    // turn off the lowest set bit
    let flip = |n: u32| n & (n - 1);

    if height & 1 == 1 {
        flip(flip(height - 1) + 1)
    } else {
        flip(height)
    }
}

/// The forest of all known block headers, rooted at genesis.
///
/// Owns every [`ChainEntry`]; entries reference their parent and skip
/// ancestor by hash into this map. Append-only from the caller's point of
/// view: once linked, entries never change, so lookups are safe under
/// concurrent readers as long as no block is being linked.
#[derive(Debug, Clone, Default)]
pub struct BlockIndex {
    entries: HashMap<BlockHash, ChainEntry>,
}

impl BlockIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, hash: &BlockHash) -> Option<&ChainEntry> {
        self.entries.get(hash)
    }

    pub fn contains(&self, hash: &BlockHash) -> bool {
        self.entries.contains_key(hash)
    }

    /// Link a new entry into the index, fixing its skip pointer.
    ///
    /// A non-genesis entry is only accepted once its previous entry is
    /// present; callers holding headers that arrived out of order retry
    /// after the parent connects.
    pub fn insert(&mut self, mut entry: ChainEntry) -> Result<ChainEntry, ChainError> {
        if !entry.is_genesis() {
            let prev = *self
                .get(&entry.prev_block)
                .ok_or(ChainError::UnknownPreviousEntry(entry.prev_block))?;
            debug_assert_eq!(prev.height + 1, entry.height);
            entry.skip = self
                .ancestor(&prev, skip_height(entry.height))
                .map(|skip| skip.hash);
        }
        self.entries.insert(entry.hash, entry);
        Ok(entry)
    }

    /// Re-add an entry whose skip pointer was already computed, for
    /// reloading a persisted index in arbitrary order
    pub(crate) fn restore(&mut self, entry: ChainEntry) {
        self.entries.insert(entry.hash, entry);
    }

    /// The entry at `height` on the path from `entry` back to genesis, or
    /// `None` if the height is above the entry or the path is incomplete
    pub fn ancestor<'a>(&'a self, entry: &'a ChainEntry, height: u32) -> Option<&'a ChainEntry> {
        if height > entry.height {
            return None;
        }
        let mut cursor = entry;
        while cursor.height != height {
            cursor = self.step_back(cursor, height)?;
        }
        Some(cursor)
    }

    /// One hop of an ancestor walk: the skip pointer when it lands on or
    /// tightly above the target, the previous entry otherwise
    fn step_back<'a>(&'a self, entry: &'a ChainEntry, height: u32) -> Option<&'a ChainEntry> {
        let height_skip = skip_height(entry.height);
        let height_skip_prev = skip_height(entry.height - 1);
        match entry.skip {
            Some(skip)
                if height_skip == height
                    || (height_skip > height
                        && !(height_skip_prev < height_skip.saturating_sub(2)
                            && height_skip_prev >= height)) =>
            {
                self.get(&skip)
            }
            _ => self.get(&entry.prev_block),
        }
    }

    /// The deepest entry on both entries' paths to genesis. `None` only
    /// for entries that do not share a root in this index.
    pub fn last_common_ancestor<'a>(
        &'a self,
        a: &'a ChainEntry,
        b: &'a ChainEntry,
    ) -> Option<&'a ChainEntry> {
        let (mut a, mut b) = if a.height > b.height {
            (self.ancestor(a, b.height)?, b)
        } else if b.height > a.height {
            (a, self.ancestor(b, a.height)?)
        } else {
            (a, b)
        };
        while a.hash != b.hash {
            a = self.get(&a.prev_block)?;
            b = self.get(&b.prev_block)?;
        }
        Some(a)
    }
}
