use super::{BlockIndex, ChainEntry};
use bitcoin::BlockHash;

/// The best-known chain, materialized as a dense height-indexed array.
///
/// Every populated slot satisfies `chain.get(h).height == h` and each
/// entry's previous link is the slot below it, so height lookups are O(1)
/// and membership is an identity check. Mutated only through
/// [`set_tip`](Chain::set_tip) by whoever drives reorgs.
#[derive(Debug, Clone, Default)]
pub struct Chain {
    entries: Vec<ChainEntry>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Height of the tip, or `None` for an empty chain
    pub fn height(&self) -> Option<u32> {
        self.entries.len().checked_sub(1).map(|height| height as u32)
    }

    pub fn tip(&self) -> Option<&ChainEntry> {
        self.entries.last()
    }

    pub fn genesis(&self) -> Option<&ChainEntry> {
        self.entries.first()
    }

    pub fn get(&self, height: u32) -> Option<&ChainEntry> {
        self.entries.get(height as usize)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether this exact entry is on the chain. Competing branches share
    /// heights, so this compares identity, not height.
    pub fn contains(&self, entry: &ChainEntry) -> bool {
        self.get(entry.height)
            .map_or(false, |ours| ours.hash == entry.hash)
    }

    /// The entry following this one on the chain, if the entry itself is
    /// on the chain and not the tip
    pub fn next(&self, entry: &ChainEntry) -> Option<&ChainEntry> {
        if self.contains(entry) {
            self.get(entry.height + 1)
        } else {
            None
        }
    }

    /// Splice in a new best tip.
    ///
    /// Walks backward from `tip`, overwriting slots until it reaches one
    /// that already holds the right entry; everything below that fork point
    /// is shared with the old chain and left untouched. `None` clears the
    /// chain entirely.
    pub fn set_tip(&mut self, tip: Option<&ChainEntry>, index: &BlockIndex) {
        let tip = match tip {
            Some(tip) => *tip,
            None => {
                self.entries.clear();
                return;
            }
        };

        self.entries.truncate(tip.height as usize + 1);

        // entries above the old length, collected tip-first
        let mut pending = Vec::new();
        let mut cursor = Some(tip);
        while let Some(entry) = cursor {
            let slot = entry.height as usize;
            if slot < self.entries.len() {
                if self.entries[slot].hash == entry.hash {
                    break;
                }
                self.entries[slot] = entry;
            } else {
                pending.push(entry);
            }
            if entry.is_genesis() {
                break;
            }
            cursor = index.get(&entry.prev_block).copied();
        }

        while let Some(entry) = pending.pop() {
            debug_assert_eq!(entry.height as usize, self.entries.len());
            self.entries.push(entry);
        }
    }

    /// The deepest entry shared between this chain and the path from
    /// `entry` to genesis
    pub fn find_fork(&self, entry: &ChainEntry, index: &BlockIndex) -> Option<ChainEntry> {
        let height = self.height()?;
        let mut entry = if entry.height > height {
            *index.ancestor(entry, height)?
        } else {
            *entry
        };
        while !self.contains(&entry) {
            if entry.is_genesis() {
                return None;
            }
            entry = *index.get(&entry.prev_block)?;
        }
        Some(entry)
    }

    /// The lowest entry whose running-maximum block time is at or past
    /// `time`. Binary search, since `time_max` is monotonic along the
    /// chain even though raw header times are not.
    pub fn find_earliest_at_least(&self, time: u32) -> Option<&ChainEntry> {
        let index = self.entries.partition_point(|entry| entry.time_max < time);
        self.entries.get(index)
    }

    /// A compact backward summary of the chain starting at `from` (the tip
    /// if `None`): dense for the latest blocks, then exponentially sparser,
    /// always ending at genesis. Sync logic sends this to describe what it
    /// has without listing every hash.
    pub fn locator(&self, from: Option<&ChainEntry>, index: &BlockIndex) -> Vec<BlockHash> {
        let mut entry = match from.or_else(|| self.tip()) {
            Some(entry) => *entry,
            None => return vec![],
        };

        let mut hashes = Vec::with_capacity(32);
        let mut step = 1u32;
        loop {
            hashes.push(entry.hash);
            if entry.height == 0 {
                break;
            }
            let height = entry.height.saturating_sub(step);
            entry = if self.contains(&entry) {
                *self.get(height).expect("chain is dense below a member")
            } else {
                match index.ancestor(&entry, height) {
                    Some(ancestor) => *ancestor,
                    None => break,
                }
            };
            if hashes.len() > 10 {
                step *= 2;
            }
        }
        hashes
    }
}
