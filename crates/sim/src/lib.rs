//! # Pegshield Simulation
//!
//! Testing harness for the defense core: an in-memory pool that settles
//! position changes with the real fixed-point math, plus seeded price-path
//! generators for long-horizon scenarios. Everything is deterministic; no
//! wall clocks, no global state.

pub mod pool;
pub mod walk;

pub use pool::{SharedPool, SimPool};
pub use walk::TickWalk;

/// Errors raised by the simulation harness itself (as opposed to pool
/// errors, which flow through `pegshield_core::PoolError`)
#[derive(thiserror::Error, Debug)]
pub enum SimError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}
