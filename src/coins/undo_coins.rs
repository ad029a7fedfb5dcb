use super::{Coin, CoinsView, CoinsViewCache};
use bitcoin::OutPoint;

/// Spent coins kept aside while connecting a block, in spend order, so a
/// disconnect can restore them by replaying in reverse
#[derive(Default, Debug, Clone)]
pub struct UndoCoins {
    items: Vec<(OutPoint, Coin)>,
}

impl UndoCoins {
    pub fn push(&mut self, outpoint: OutPoint, coin: Coin) {
        self.items.push((outpoint, coin));
    }

    /// Restore the most recently spent coin into the view
    pub fn apply<V: CoinsView>(&mut self, view: &mut CoinsViewCache<V>) {
        let (outpoint, coin) = self.items.pop().expect("no undo data left");
        view.add_coin(outpoint, coin, true);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
