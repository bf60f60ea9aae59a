//! Market-data subscription set.

use parking_lot::RwLock;
use std::collections::HashSet;

/// Symbols a connection wants streamed. The set drives resubscription after
/// every successful synchronize, so membership survives transport-level
/// unsubscribes.
#[derive(Default)]
pub struct MarketDataSubscriptions {
    symbols: RwLock<HashSet<String>>,
}

impl MarketDataSubscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, symbol: &str) {
        self.symbols.write().insert(symbol.to_string());
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.read().contains(symbol)
    }

    pub fn symbols(&self) -> Vec<String> {
        self.symbols.read().iter().cloned().collect()
    }
}
