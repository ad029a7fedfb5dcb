use super::Coin;

bitflags::bitflags! {
    /// Pending state of a cached coin relative to the backing view
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CoinFlags: u8 {
        /// The cached coin differs from the backing view and must be
        /// written out on flush
        const DIRTY = 1 << 0;
        /// The backing view has no record of this coin at all, so if it is
        /// spent before the next flush the entry can be dropped instead of
        /// written as a deletion
        const FRESH = 1 << 1;
    }
}

/// A coin plus its pending state, owned by the cache map.
/// The map's key uniqueness is what enforces one entry per outpoint.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub coin: Coin,
    pub flags: CoinFlags,
}

impl CacheEntry {
    pub fn new(coin: Coin, flags: CoinFlags) -> Self {
        Self { coin, flags }
    }

    pub fn is_dirty(&self) -> bool {
        self.flags.contains(CoinFlags::DIRTY)
    }

    pub fn is_fresh(&self) -> bool {
        self.flags.contains(CoinFlags::FRESH)
    }
}
