//! Host resources spent when acquiring a doctrine.
use serde::{Deserialize, Serialize};

/// Gold and influence balances owned by the host simulation.
pub trait ResourceLedger {
    fn gold(&self) -> i64;
    fn influence(&self) -> i64;

    /// Remove both amounts. Only called after the balances were checked.
    fn debit(&mut self, gold: i64, influence: i64);
}

/// Plain in-memory balances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purse {
    pub gold: i64,
    pub influence: i64,
}

impl Purse {
    #[must_use]
    pub const fn new(gold: i64, influence: i64) -> Self {
        Self { gold, influence }
    }
}

impl ResourceLedger for Purse {
    fn gold(&self) -> i64 {
        self.gold
    }

    fn influence(&self) -> i64 {
        self.influence
    }

    /// Neither balance goes negative.
    fn debit(&mut self, gold: i64, influence: i64) {
        self.gold = self.gold.saturating_sub(gold).max(0);
        self.influence = self.influence.saturating_sub(influence).max(0);
    }
}
