//! # Position Ledger
//!
//! Typed record store for the system's two logical positions. No business
//! logic lives here; the engine decides when records change. Invariants:
//! the core record is active from initialization for the system's lifetime,
//! the buffer record is active exactly while the regime is Defend.

use serde::{Deserialize, Serialize};

use crate::pool::PositionId;

/// Metadata for one pool position owned by the defense system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionMeta {
    pub id: PositionId,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: u128,
    pub active: bool,
}

/// Record store for the Core and Buffer positions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionLedger {
    core: Option<PositionMeta>,
    buffer: Option<PositionMeta>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn core(&self) -> Option<&PositionMeta> {
        self.core.as_ref()
    }

    pub fn buffer(&self) -> Option<&PositionMeta> {
        self.buffer.as_ref()
    }

    /// The buffer record, only while it is deployed
    pub fn active_buffer(&self) -> Option<&PositionMeta> {
        self.buffer.as_ref().filter(|meta| meta.active)
    }

    pub fn set_core(&mut self, meta: PositionMeta) {
        self.core = Some(meta);
    }

    pub fn set_buffer(&mut self, meta: PositionMeta) {
        self.buffer = Some(meta);
    }

    /// Drop the buffer record entirely; the next deploy mints a fresh handle
    pub fn clear_buffer(&mut self) {
        self.buffer = None;
    }

    /// Keep the buffer handle but mark it drained, for capability-gated
    /// reuse on the next deploy with the same range
    pub fn deactivate_buffer(&mut self) {
        if let Some(meta) = self.buffer.as_mut() {
            meta.liquidity = 0;
            meta.active = false;
        }
    }

    /// All currently active positions
    pub fn active_positions(&self) -> Vec<&PositionMeta> {
        self.core
            .iter()
            .chain(self.buffer.iter())
            .filter(|meta| meta.active)
            .collect()
    }
}
