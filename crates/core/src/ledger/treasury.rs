//! # Treasury Ledger
//!
//! Undeployed capital held by the system plus lifetime fee counters. The
//! treasury grows from fee collection and buffer withdrawal and shrinks when
//! the buffer is deployed.

use serde::{Deserialize, Serialize};

use crate::errors::{DefenseError, DefenseResult};

/// Token balances and lifetime fee totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryLedger {
    balance0: u64,
    balance1: u64,
    total_fees_collected0: u64,
    total_fees_collected1: u64,
}

impl TreasuryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance0(&self) -> u64 {
        self.balance0
    }

    pub fn balance1(&self) -> u64 {
        self.balance1
    }

    pub fn total_fees_collected(&self) -> (u64, u64) {
        (self.total_fees_collected0, self.total_fees_collected1)
    }

    /// Add capital. Infallible; balances saturate at the type bound.
    pub fn credit(&mut self, amount0: u64, amount1: u64) {
        self.balance0 = self.balance0.saturating_add(amount0);
        self.balance1 = self.balance1.saturating_add(amount1);
    }

    /// Remove capital. Fails with `InsufficientFunds` if either balance
    /// would go negative; on failure nothing changes.
    pub fn debit(&mut self, amount0: u64, amount1: u64) -> DefenseResult<()> {
        let balance0 = self
            .balance0
            .checked_sub(amount0)
            .ok_or(DefenseError::InsufficientFunds)?;
        let balance1 = self
            .balance1
            .checked_sub(amount1)
            .ok_or(DefenseError::InsufficientFunds)?;
        self.balance0 = balance0;
        self.balance1 = balance1;
        Ok(())
    }

    pub fn can_debit(&self, amount0: u64, amount1: u64) -> bool {
        self.balance0 >= amount0 && self.balance1 >= amount1
    }

    /// Bump the monotonic lifetime fee counters
    pub fn record_fees_collected(&mut self, amount0: u64, amount1: u64) {
        self.total_fees_collected0 = self.total_fees_collected0.saturating_add(amount0);
        self.total_fees_collected1 = self.total_fees_collected1.saturating_add(amount1);
    }
}
