//! # Pegshield Core
//!
//! Defense core for a pegged exchange rate traded through an external
//! concentrated-liquidity pool. The system holds a permanent core position
//! at the peg and a treasury of reserve capital; when the price deviates
//! past a threshold it deploys the treasury as a buffer position below the
//! peg, and withdraws it back once the price recovers. A hysteresis band
//! between the escalate and de-escalate thresholds prevents oscillation.
//!
//! The crate is deterministic end to end: the clock and the pool are both
//! injected, so every behavior is reproducible in tests. Entry point is
//! [`engine::RebalanceEngine`] over any [`pool::LiquidityPool`].

pub mod config;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod events;
pub mod fee;
pub mod gate;
pub mod ledger;
pub mod math;
pub mod pool;
pub mod regime;

pub use config::{DefenseConfig, RangeConfig};
pub use engine::{RebalanceCheck, RebalanceEngine};
pub use errors::{DefenseError, DefenseResult};
pub use events::DefenseEvent;
pub use fee::FeeConfig;
pub use gate::{AccessGate, AccountId, CooldownState};
pub use ledger::{PositionLedger, PositionMeta, TreasuryLedger};
pub use pool::{LiquidityPool, PoolError, PoolOp, PoolReceipt, PositionId, Slot0};
pub use regime::{Regime, Thresholds};
