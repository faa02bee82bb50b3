//! # Defense Configuration
//!
//! The explicit configuration struct injected into the engine at
//! construction and mutable only through validated setters. Loadable from a
//! TOML file for deployments; every load and every setter runs the same
//! validation, so invalid ranges or thresholds never reach runtime state.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_COOLDOWN_SECS;
use crate::errors::{DefenseError, DefenseResult};
use crate::fee::FeeConfig;
use crate::math::tick::{is_aligned, is_tick_valid};
use crate::pool::PoolOp;
use crate::regime::Thresholds;

/// A tick range for a pool position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeConfig {
    pub tick_lower: i32,
    pub tick_upper: i32,
}

impl RangeConfig {
    pub fn validate(&self, tick_spacing: i32) -> DefenseResult<()> {
        if self.tick_lower >= self.tick_upper
            || !is_tick_valid(self.tick_lower)
            || !is_tick_valid(self.tick_upper)
        {
            return Err(DefenseError::InvalidRange {
                lower: self.tick_lower,
                upper: self.tick_upper,
            });
        }
        if !is_aligned(self.tick_lower, tick_spacing) || !is_aligned(self.tick_upper, tick_spacing)
        {
            return Err(DefenseError::UnalignedRange { spacing: tick_spacing });
        }
        Ok(())
    }
}

/// Full defense configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefenseConfig {
    /// Permanent at-peg position range (narrow, centered on the peg)
    pub core_range: RangeConfig,
    /// Defensive position range (adjacent, on the side the peg is expected
    /// to fail toward)
    pub buffer_range: RangeConfig,
    /// Regime escalation/de-escalation thresholds
    pub thresholds: Thresholds,
    /// Minimum seconds between rebalance actions
    pub cooldown_secs: i64,
    /// Fee curve parameters
    pub fee: FeeConfig,
    /// Pool mutations the engine is permitted to dispatch.
    /// `IncreaseLiquidity` additionally enables buffer-handle reuse.
    pub capabilities: BTreeSet<PoolOp>,
}

impl DefenseConfig {
    /// Baseline capability set: fresh mint on every deploy, no handle reuse
    pub fn default_capabilities() -> BTreeSet<PoolOp> {
        BTreeSet::from([PoolOp::Mint, PoolOp::DecreaseLiquidity, PoolOp::CollectFees])
    }

    pub fn new(
        core_range: RangeConfig,
        buffer_range: RangeConfig,
        thresholds: Thresholds,
    ) -> Self {
        Self {
            core_range,
            buffer_range,
            thresholds,
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
            fee: FeeConfig::default(),
            capabilities: Self::default_capabilities(),
        }
    }

    pub fn validate(&self, tick_spacing: i32) -> DefenseResult<()> {
        self.core_range.validate(tick_spacing)?;
        self.buffer_range.validate(tick_spacing)?;
        self.thresholds.validate()?;
        self.fee.validate()?;

        if self.cooldown_secs < 0 {
            return Err(DefenseError::InvalidConfig(
                "cooldown must be non-negative".to_string(),
            ));
        }
        // Deploy and removal must always be possible.
        for required in [PoolOp::Mint, PoolOp::DecreaseLiquidity, PoolOp::CollectFees] {
            if !self.capabilities.contains(&required) {
                return Err(DefenseError::InvalidConfig(format!(
                    "capability set must include {required:?}"
                )));
            }
        }
        Ok(())
    }

    /// Load from a TOML file and validate against the pool's tick spacing
    pub fn load(path: impl AsRef<Path>, tick_spacing: i32) -> DefenseResult<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| DefenseError::InvalidConfig(format!("read config: {e}")))?;
        let config: DefenseConfig = toml::from_str(&content)
            .map_err(|e| DefenseError::InvalidConfig(format!("parse config: {e}")))?;
        config.validate(tick_spacing)?;
        Ok(config)
    }

    /// Save to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> DefenseResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| DefenseError::InvalidConfig(format!("serialize config: {e}")))?;
        fs::write(path.as_ref(), content)
            .map_err(|e| DefenseError::InvalidConfig(format!("write config: {e}")))?;
        Ok(())
    }
}
