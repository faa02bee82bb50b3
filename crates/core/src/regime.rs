//! # Regime Detection
//!
//! Hysteresis-based regime detection for peg stress management. The detector
//! is a Mealy machine: the next regime depends on the active regime as well
//! as the current tick, which is what prevents oscillation when the tick
//! hovers near a single boundary.

use serde::{Deserialize, Serialize};

use crate::errors::{DefenseError, DefenseResult};

/// Defense posture. Gates which position topology and fee curve apply.
///
/// Closed enum by design: generalizing to more tiers means adding variants
/// and transition rows, not new ad hoc comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Regime {
    /// At-peg posture: only the permanent core position is deployed
    Normal,
    /// Defensive posture: treasury capital is deployed into the buffer
    Defend,
}

/// Escalation and de-escalation tick thresholds.
///
/// `deescalate > escalate` is the hysteresis gap: a tick strictly between
/// the two never changes regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Entering Defend requires tick <= escalate
    pub escalate: i32,
    /// Leaving Defend requires tick >= deescalate
    pub deescalate: i32,
}

impl Thresholds {
    pub fn validate(&self) -> DefenseResult<()> {
        if self.deescalate <= self.escalate {
            return Err(DefenseError::InvalidThresholds {
                escalate: self.escalate,
                deescalate: self.deescalate,
            });
        }
        Ok(())
    }
}

/// Pure regime transition function.
///
/// Side-effect free and callable arbitrarily often; the external scheduler
/// polls this (through `RebalanceEngine::needs_rebalance`) without touching
/// state.
pub fn determine_regime(current_tick: i32, active: Regime, thresholds: Thresholds) -> Regime {
    match active {
        Regime::Normal if current_tick <= thresholds.escalate => Regime::Defend,
        Regime::Defend if current_tick >= thresholds.deescalate => Regime::Normal,
        unchanged => unchanged,
    }
}
