//! # Access Gate
//!
//! Owner/keeper authorization plus the cooldown timer that bounds rebalance
//! churn from tick noise. Cooldown is the system's only rate limiting; it
//! exists to bound execution and capital churn, not to provide fairness.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::errors::{DefenseError, DefenseResult};

/// Opaque 32-byte caller identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId([u8; 32]);

impl AccountId {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Convenience constructor for tests and fixtures
    pub const fn from_byte(byte: u8) -> Self {
        Self([byte; 32])
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "…")
    }
}

/// Owner and keeper role assignments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGate {
    owner: AccountId,
    keepers: BTreeSet<AccountId>,
}

impl AccessGate {
    pub fn new(owner: AccountId) -> Self {
        Self { owner, keepers: BTreeSet::new() }
    }

    pub fn owner(&self) -> AccountId {
        self.owner
    }

    pub fn add_keeper(&mut self, keeper: AccountId) {
        self.keepers.insert(keeper);
    }

    pub fn remove_keeper(&mut self, keeper: &AccountId) {
        self.keepers.remove(keeper);
    }

    /// Owner-only operations: configuration, overrides, treasury movement
    pub fn ensure_owner(&self, caller: AccountId) -> DefenseResult<()> {
        if caller == self.owner {
            Ok(())
        } else {
            Err(DefenseError::NotAuthorized)
        }
    }

    /// Operator operations (`auto_rebalance`, `collect_fees`): owner or any
    /// registered keeper
    pub fn ensure_operator(&self, caller: AccountId) -> DefenseResult<()> {
        if caller == self.owner || self.keepers.contains(&caller) {
            Ok(())
        } else {
            Err(DefenseError::NotAuthorized)
        }
    }
}

/// Minimum-interval timer over unix-second timestamps.
///
/// The clock is caller-supplied so the whole core stays deterministic under
/// test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownState {
    last_action_at: i64,
    min_interval: i64,
}

impl CooldownState {
    pub fn new(min_interval: i64) -> Self {
        Self { last_action_at: 0, min_interval }
    }

    pub fn min_interval(&self) -> i64 {
        self.min_interval
    }

    pub fn last_action_at(&self) -> i64 {
        self.last_action_at
    }

    /// Fails with `CooldownActive` (carrying the next eligible time) while
    /// the interval since the last action has not elapsed
    pub fn check(&self, now: i64) -> DefenseResult<()> {
        if self.last_action_at == 0 {
            return Ok(());
        }
        let next_eligible = self.last_action_at.saturating_add(self.min_interval);
        if now < next_eligible {
            return Err(DefenseError::CooldownActive { next_eligible });
        }
        Ok(())
    }

    /// Reset on every successful rebalance
    pub fn reset(&mut self, now: i64) {
        self.last_action_at = now;
    }

    pub fn set_interval(&mut self, min_interval: i64) {
        self.min_interval = min_interval;
    }
}
