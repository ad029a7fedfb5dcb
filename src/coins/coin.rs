use bitcoin::{Amount, ScriptBuf, Transaction, TxOut};

/// A single unspent transaction output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coin {
    /// The transaction output
    pub output: TxOut,
    /// The height of the block this output was created in
    pub height: u32,
    /// Whether this coin originated from a coinbase transaction.
    /// Used to check that a coinbase is not spent until it has matured.
    pub coinbase: bool,
    /// Whether this coin has been spent. A spent coin is only ever a
    /// transient marker inside a cache entry, never a stored value.
    pub spent: bool,
}

impl Coin {
    pub fn new(output: TxOut, height: u32, coinbase: bool) -> Self {
        Self {
            output,
            height,
            coinbase,
            spent: false,
        }
    }

    /// Create a coin from a transaction output at the given chain height
    pub fn from_tx(tx: &Transaction, vout: u32, height: u32) -> Self {
        Self::new(tx.output[vout as usize].clone(), height, tx.is_coinbase())
    }

    pub fn is_spent(&self) -> bool {
        self.spent
    }

    /// Transition to the spent state in place, releasing the script
    /// allocation so the memory accounting sees the entry as empty
    pub fn clear(&mut self) {
        self.spent = true;
        self.output = TxOut {
            value: Amount::ZERO,
            script_pubkey: ScriptBuf::new(),
        };
    }

    /// Heap bytes attributable to this coin, tracked by the cache's
    /// running memory counter
    pub fn dynamic_memory_usage(&self) -> usize {
        self.output.script_pubkey.len()
    }
}

impl Default for Coin {
    /// The default coin is the spent/empty state
    fn default() -> Self {
        Self {
            output: TxOut {
                value: Amount::ZERO,
                script_pubkey: ScriptBuf::new(),
            },
            height: 0,
            coinbase: false,
            spent: true,
        }
    }
}
