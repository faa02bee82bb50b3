//! In-memory concentrated-liquidity pool.
//!
//! Implements [`LiquidityPool`] with the same fixed-point math the engine
//! sizes positions with, so scenario tests exercise real settlement amounts
//! rather than canned stub values. Deposits round up and withdrawals round
//! down, matching how a live pool protects itself against its callers.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use pegshield_core::math::liquidity::amounts_for_liquidity;
use pegshield_core::math::tick::{is_aligned, is_tick_valid, sqrt_price_x64_at_tick};
use pegshield_core::math::Rounding;
use pegshield_core::{
    LiquidityPool, PoolError, PoolReceipt, PositionId, RangeConfig, Slot0,
};

use crate::SimError;

#[derive(Debug, Clone, Copy)]
struct SimPosition {
    range: RangeConfig,
    liquidity: u128,
    fees_owed0: u64,
    fees_owed1: u64,
}

/// Deterministic pool simulator: price is set explicitly with
/// [`SimPool::set_tick`], fees accrue only via [`SimPool::accrue_fees`].
pub struct SimPool {
    slot0: Slot0,
    tick_spacing: i32,
    next_id: u64,
    positions: BTreeMap<u64, SimPosition>,
}

impl SimPool {
    pub fn new(initial_tick: i32, tick_spacing: i32) -> Result<Self, SimError> {
        if tick_spacing <= 0 {
            return Err(SimError::InvalidParameter(format!(
                "tick spacing must be positive, got {tick_spacing}"
            )));
        }
        if !is_tick_valid(initial_tick) {
            return Err(SimError::InvalidParameter(format!(
                "tick {initial_tick} out of range"
            )));
        }
        Ok(Self {
            slot0: Slot0 {
                sqrt_price_x64: sqrt_price_x64_at_tick(initial_tick)
                    .map_err(|e| SimError::InvalidParameter(e.to_string()))?,
                tick: initial_tick,
            },
            tick_spacing,
            next_id: 1,
            positions: BTreeMap::new(),
        })
    }

    /// Move the pool price to `tick`, as an external swap would
    pub fn set_tick(&mut self, tick: i32) -> Result<(), SimError> {
        if !is_tick_valid(tick) {
            return Err(SimError::InvalidParameter(format!("tick {tick} out of range")));
        }
        self.slot0 = Slot0 {
            sqrt_price_x64: sqrt_price_x64_at_tick(tick)
                .map_err(|e| SimError::InvalidParameter(e.to_string()))?,
            tick,
        };
        log::debug!("pool tick -> {tick}");
        Ok(())
    }

    /// Credit swap fees to a position, as trading through its range would
    pub fn accrue_fees(&mut self, id: PositionId, fees0: u64, fees1: u64) -> Result<(), SimError> {
        let position = self
            .positions
            .get_mut(&id.0)
            .ok_or_else(|| SimError::InvalidParameter(format!("unknown position {id}")))?;
        position.fees_owed0 = position.fees_owed0.saturating_add(fees0);
        position.fees_owed1 = position.fees_owed1.saturating_add(fees1);
        Ok(())
    }

    /// Token amounts a position change of `liquidity` settles at the current
    /// price
    fn settlement(
        &self,
        range: RangeConfig,
        liquidity: u128,
        rounding: Rounding,
    ) -> Result<(u64, u64), PoolError> {
        let sqrt_lower = sqrt_price_x64_at_tick(range.tick_lower)
            .map_err(|e| PoolError::Rejected(e.to_string()))?;
        let sqrt_upper = sqrt_price_x64_at_tick(range.tick_upper)
            .map_err(|e| PoolError::Rejected(e.to_string()))?;
        amounts_for_liquidity(
            self.slot0.sqrt_price_x64,
            sqrt_lower,
            sqrt_upper,
            liquidity,
            rounding,
        )
        .map_err(|e| PoolError::Rejected(e.to_string()))
    }

    fn check_range(&self, range: RangeConfig) -> Result<(), PoolError> {
        if range.tick_lower >= range.tick_upper
            || !is_tick_valid(range.tick_lower)
            || !is_tick_valid(range.tick_upper)
            || !is_aligned(range.tick_lower, self.tick_spacing)
            || !is_aligned(range.tick_upper, self.tick_spacing)
        {
            return Err(PoolError::Rejected(format!(
                "invalid range [{}, {}]",
                range.tick_lower, range.tick_upper
            )));
        }
        Ok(())
    }
}

impl LiquidityPool for SimPool {
    fn slot0(&self) -> Result<Slot0, PoolError> {
        Ok(self.slot0)
    }

    fn tick_spacing(&self) -> i32 {
        self.tick_spacing
    }

    fn mint(&mut self, range: RangeConfig, liquidity: u128) -> Result<PoolReceipt, PoolError> {
        self.check_range(range)?;
        if liquidity == 0 {
            return Err(PoolError::Rejected("zero liquidity mint".to_string()));
        }
        let (amount0, amount1) = self.settlement(range, liquidity, Rounding::Up)?;
        let id = PositionId(self.next_id);
        self.next_id += 1;
        self.positions.insert(
            id.0,
            SimPosition { range, liquidity, fees_owed0: 0, fees_owed1: 0 },
        );
        Ok(PoolReceipt { id, amount0, amount1 })
    }

    fn increase_liquidity(
        &mut self,
        id: PositionId,
        liquidity: u128,
    ) -> Result<PoolReceipt, PoolError> {
        let position = self
            .positions
            .get(&id.0)
            .copied()
            .ok_or(PoolError::UnknownPosition(id))?;
        let (amount0, amount1) = self.settlement(position.range, liquidity, Rounding::Up)?;
        let position = self.positions.get_mut(&id.0).expect("checked above");
        position.liquidity += liquidity;
        Ok(PoolReceipt { id, amount0, amount1 })
    }

    fn decrease_liquidity(
        &mut self,
        id: PositionId,
        liquidity: u128,
    ) -> Result<PoolReceipt, PoolError> {
        let position = self
            .positions
            .get(&id.0)
            .copied()
            .ok_or(PoolError::UnknownPosition(id))?;
        if position.liquidity < liquidity {
            return Err(PoolError::InsufficientPositionLiquidity);
        }
        let (amount0, amount1) = self.settlement(position.range, liquidity, Rounding::Down)?;
        let position = self.positions.get_mut(&id.0).expect("checked above");
        position.liquidity -= liquidity;
        Ok(PoolReceipt { id, amount0, amount1 })
    }

    fn collect_fees(&mut self, id: PositionId) -> Result<PoolReceipt, PoolError> {
        let position = self
            .positions
            .get_mut(&id.0)
            .ok_or(PoolError::UnknownPosition(id))?;
        let amount0 = std::mem::take(&mut position.fees_owed0);
        let amount1 = std::mem::take(&mut position.fees_owed1);
        Ok(PoolReceipt { id, amount0, amount1 })
    }

    fn position_liquidity(&self, id: PositionId) -> Result<u128, PoolError> {
        self.positions
            .get(&id.0)
            .map(|p| p.liquidity)
            .ok_or(PoolError::UnknownPosition(id))
    }
}

/// Cloneable handle to one pool. The engine takes one clone as its
/// collaborator while the scenario driver keeps another to move the price
/// and accrue fees, the way a live pool changes underneath its observers.
#[derive(Clone)]
pub struct SharedPool(Rc<RefCell<SimPool>>);

impl SharedPool {
    pub fn new(pool: SimPool) -> Self {
        Self(Rc::new(RefCell::new(pool)))
    }

    pub fn set_tick(&self, tick: i32) -> Result<(), SimError> {
        self.0.borrow_mut().set_tick(tick)
    }

    pub fn accrue_fees(&self, id: PositionId, fees0: u64, fees1: u64) -> Result<(), SimError> {
        self.0.borrow_mut().accrue_fees(id, fees0, fees1)
    }
}

impl LiquidityPool for SharedPool {
    fn slot0(&self) -> Result<Slot0, PoolError> {
        self.0.borrow().slot0()
    }

    fn tick_spacing(&self) -> i32 {
        self.0.borrow().tick_spacing()
    }

    fn mint(&mut self, range: RangeConfig, liquidity: u128) -> Result<PoolReceipt, PoolError> {
        self.0.borrow_mut().mint(range, liquidity)
    }

    fn increase_liquidity(
        &mut self,
        id: PositionId,
        liquidity: u128,
    ) -> Result<PoolReceipt, PoolError> {
        self.0.borrow_mut().increase_liquidity(id, liquidity)
    }

    fn decrease_liquidity(
        &mut self,
        id: PositionId,
        liquidity: u128,
    ) -> Result<PoolReceipt, PoolError> {
        self.0.borrow_mut().decrease_liquidity(id, liquidity)
    }

    fn collect_fees(&mut self, id: PositionId) -> Result<PoolReceipt, PoolError> {
        self.0.borrow_mut().collect_fees(id)
    }

    fn position_liquidity(&self, id: PositionId) -> Result<u128, PoolError> {
        self.0.borrow().position_liquidity(id)
    }
}
