//! # Event Records
//!
//! Notifications emitted on every regime change, buffer deploy/remove, fee
//! collection, and treasury movement. Each carries the triggering tick and
//! before/after amounts, so the external scheduler and observability tooling
//! can reconstruct history without replaying ledger state.

use serde::Serialize;

use crate::gate::AccountId;
use crate::pool::PositionId;
use crate::regime::Regime;

/// One observable state change in the defense core
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DefenseEvent {
    RegimeChanged {
        from: Regime,
        to: Regime,
        tick: i32,
        timestamp: i64,
    },
    BufferDeployed {
        id: PositionId,
        tick: i32,
        liquidity: u128,
        amount0: u64,
        amount1: u64,
        treasury0_after: u64,
        treasury1_after: u64,
        timestamp: i64,
    },
    BufferRemoved {
        id: PositionId,
        tick: i32,
        liquidity: u128,
        amount0: u64,
        amount1: u64,
        treasury0_after: u64,
        treasury1_after: u64,
        timestamp: i64,
    },
    FeesCollected {
        amount0: u64,
        amount1: u64,
        lifetime_total0: u64,
        lifetime_total1: u64,
        tick: i32,
        timestamp: i64,
    },
    CoreInitialized {
        id: PositionId,
        tick: i32,
        liquidity: u128,
        amount0: u64,
        amount1: u64,
        timestamp: i64,
    },
    TreasuryFunded {
        amount0: u64,
        amount1: u64,
        balance0_after: u64,
        balance1_after: u64,
        timestamp: i64,
    },
    TreasuryWithdrawn {
        to: AccountId,
        amount0: u64,
        amount1: u64,
        balance0_after: u64,
        balance1_after: u64,
        timestamp: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_for_observers() {
        let event = DefenseEvent::RegimeChanged {
            from: Regime::Normal,
            to: Regime::Defend,
            tick: -60,
            timestamp: 1_000,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("RegimeChanged"));
        assert!(json.contains("-60"));
    }
}
