//! # Pool Collaborator Interface
//!
//! The external concentrated-liquidity pool, as seen by the defense core:
//! a price source plus position-mutation primitives. The engine never calls
//! the pool directly — every mutation goes through [`PoolCommand`], checked
//! against a configured allowlist of [`PoolOp`] capabilities, so the
//! execution-target mechanism stays a bounded, testable surface.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::RangeConfig;

/// Opaque pool-assigned position handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionId(pub u64);

impl std::fmt::Display for PositionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "position#{}", self.0)
    }
}

/// Current price observation from the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot0 {
    pub sqrt_price_x64: u128,
    pub tick: i32,
}

/// Result of a position mutation: the handle touched and the token deltas
/// settled with the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolReceipt {
    pub id: PositionId,
    pub amount0: u64,
    pub amount1: u64,
}

/// Errors surfaced by the pool collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("unknown position {0}")]
    UnknownPosition(PositionId),

    #[error("position holds less liquidity than requested")]
    InsufficientPositionLiquidity,

    #[error("pool price unavailable")]
    PriceUnavailable,

    #[error("pool rejected the operation: {0}")]
    Rejected(String),
}

/// External pool primitives consumed by the engine.
///
/// Calls are synchronous; a returned error aborts the caller's whole
/// operation (the engine unwinds any ledger change it made beforehand).
pub trait LiquidityPool {
    /// Read the current sqrt price and tick
    fn slot0(&self) -> Result<Slot0, PoolError>;

    /// Tick spacing all position ranges must align to
    fn tick_spacing(&self) -> i32;

    /// Mint a fresh position over `range` with `liquidity`
    fn mint(&mut self, range: RangeConfig, liquidity: u128) -> Result<PoolReceipt, PoolError>;

    /// Add liquidity to an existing position
    fn increase_liquidity(
        &mut self,
        id: PositionId,
        liquidity: u128,
    ) -> Result<PoolReceipt, PoolError>;

    /// Remove liquidity from an existing position, settling token deltas
    fn decrease_liquidity(
        &mut self,
        id: PositionId,
        liquidity: u128,
    ) -> Result<PoolReceipt, PoolError>;

    /// Collect fees accrued to a position. Zero accrual is a valid result.
    fn collect_fees(&mut self, id: PositionId) -> Result<PoolReceipt, PoolError>;

    /// Actual liquidity the pool holds for a position (source of truth,
    /// reconciled against the ledger before withdrawal)
    fn position_liquidity(&self, id: PositionId) -> Result<u128, PoolError>;
}

/// Capability tags for the pool-mutation allowlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PoolOp {
    Mint,
    IncreaseLiquidity,
    DecreaseLiquidity,
    CollectFees,
}

/// A permitted pool mutation with its parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolCommand {
    Mint { range: RangeConfig, liquidity: u128 },
    Increase { id: PositionId, liquidity: u128 },
    Decrease { id: PositionId, liquidity: u128 },
    Collect { id: PositionId },
}

impl PoolCommand {
    /// The capability this command requires
    pub fn op(&self) -> PoolOp {
        match self {
            PoolCommand::Mint { .. } => PoolOp::Mint,
            PoolCommand::Increase { .. } => PoolOp::IncreaseLiquidity,
            PoolCommand::Decrease { .. } => PoolOp::DecreaseLiquidity,
            PoolCommand::Collect { .. } => PoolOp::CollectFees,
        }
    }
}
