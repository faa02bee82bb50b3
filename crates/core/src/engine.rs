//! # Rebalance Engine
//!
//! The central state machine. Orchestrates regime transitions by moving
//! treasury capital into and out of the buffer position, keeps both ledgers
//! consistent with the pool, and gates every mutation behind authorization,
//! cooldown, and a reentrancy guard.
//!
//! The core position is never touched by rebalancing: the at-peg depth is
//! the primary defense, and only treasury-funded buffer capital moves with
//! the regime.

use crate::config::{DefenseConfig, RangeConfig};
use crate::errors::{DefenseError, DefenseResult};
use crate::events::DefenseEvent;
use crate::gate::{AccessGate, AccountId, CooldownState};
use crate::ledger::{PositionLedger, PositionMeta, TreasuryLedger};
use crate::math::liquidity::liquidity_fitting_amounts;
use crate::math::tick::sqrt_price_x64_at_tick;
use crate::pool::{LiquidityPool, PoolCommand, PoolOp, PoolReceipt, PositionId, Slot0};
use crate::regime::{determine_regime, Regime, Thresholds};

/// Read-only answer to "does the regime want to change?", polled by the
/// external scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebalanceCheck {
    pub needed: bool,
    pub current_regime: Regime,
    pub target_regime: Regime,
    pub tick: i32,
}

/// Defense core over an external liquidity pool
pub struct RebalanceEngine<P: LiquidityPool> {
    pool: P,
    config: DefenseConfig,
    gate: AccessGate,
    cooldown: CooldownState,
    positions: PositionLedger,
    treasury: TreasuryLedger,
    regime: Regime,
    busy: bool,
    events: Vec<DefenseEvent>,
}

impl<P: LiquidityPool> RebalanceEngine<P> {
    /// Build an engine over `pool` with a validated configuration
    pub fn new(pool: P, config: DefenseConfig, owner: AccountId) -> DefenseResult<Self> {
        config.validate(pool.tick_spacing())?;
        let cooldown = CooldownState::new(config.cooldown_secs);
        Ok(Self {
            pool,
            gate: AccessGate::new(owner),
            cooldown,
            positions: PositionLedger::new(),
            treasury: TreasuryLedger::new(),
            regime: Regime::Normal,
            busy: false,
            events: Vec::new(),
            config,
        })
    }

    // ========================================================================
    // Read-only queries
    // ========================================================================

    pub fn regime(&self) -> Regime {
        self.regime
    }

    pub fn config(&self) -> &DefenseConfig {
        &self.config
    }

    pub fn treasury(&self) -> &TreasuryLedger {
        &self.treasury
    }

    pub fn positions(&self) -> &PositionLedger {
        &self.positions
    }

    pub fn cooldown(&self) -> &CooldownState {
        &self.cooldown
    }

    /// Events recorded since the last drain
    pub fn events(&self) -> &[DefenseEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<DefenseEvent> {
        std::mem::take(&mut self.events)
    }

    /// Current tick from the pool
    pub fn current_tick(&self) -> DefenseResult<i32> {
        Ok(self.pool.slot0()?.tick)
    }

    /// Side-effect-free regime query for the polling scheduler
    pub fn needs_rebalance(&self) -> DefenseResult<RebalanceCheck> {
        let slot0 = self.pool.slot0()?;
        let target = determine_regime(slot0.tick, self.regime, self.config.thresholds);
        Ok(RebalanceCheck {
            needed: target != self.regime,
            current_regime: self.regime,
            target_regime: target,
            tick: slot0.tick,
        })
    }

    /// Fee rate in basis points for a trade at the current pool price
    pub fn preview_fee(&self, toward_peg: bool) -> DefenseResult<u64> {
        let slot0 = self.pool.slot0()?;
        Ok(self.config.fee.preview_fee(slot0.tick, toward_peg))
    }

    // ========================================================================
    // Keeper entry points
    // ========================================================================

    /// Rebalance positions to match the target regime.
    ///
    /// Preconditions: caller is owner or keeper, cooldown elapsed, and the
    /// detector disagrees with the active regime. Executes as one atomic
    /// unit; any failure leaves every ledger exactly as it was.
    pub fn auto_rebalance(&mut self, caller: AccountId, now: i64) -> DefenseResult<Regime> {
        self.gate.ensure_operator(caller)?;
        self.guarded(|eng| {
            eng.cooldown.check(now)?;
            let slot0 = eng.pool.slot0()?;
            let target = determine_regime(slot0.tick, eng.regime, eng.config.thresholds);
            if target == eng.regime {
                return Err(DefenseError::NoRegimeChange);
            }
            match target {
                Regime::Defend => eng.deploy_buffer(slot0, now)?,
                Regime::Normal => eng.remove_buffer(slot0, now)?,
            }
            eng.finish_transition(target, slot0.tick, now);
            Ok(target)
        })
    }

    /// Pull accrued core-position fees into the treasury.
    ///
    /// Idempotent: zero accrual is a successful no-op, not an error.
    pub fn collect_fees(&mut self, caller: AccountId, now: i64) -> DefenseResult<(u64, u64)> {
        self.gate.ensure_operator(caller)?;
        self.guarded(|eng| {
            let core = eng.positions.core().ok_or(DefenseError::NotInitialized)?;
            let id = core.id;
            let tick = eng.pool.slot0()?.tick;
            let receipt = eng.dispatch(PoolCommand::Collect { id })?;
            if receipt.amount0 == 0 && receipt.amount1 == 0 {
                return Ok((0, 0));
            }
            eng.treasury.credit(receipt.amount0, receipt.amount1);
            eng.treasury.record_fees_collected(receipt.amount0, receipt.amount1);
            let (lifetime_total0, lifetime_total1) = eng.treasury.total_fees_collected();
            log::info!(
                "collected fees {}/{} from {id} at tick {tick}",
                receipt.amount0,
                receipt.amount1
            );
            eng.events.push(DefenseEvent::FeesCollected {
                amount0: receipt.amount0,
                amount1: receipt.amount1,
                lifetime_total0,
                lifetime_total1,
                tick,
                timestamp: now,
            });
            Ok((receipt.amount0, receipt.amount1))
        })
    }

    // ========================================================================
    // Owner entry points
    // ========================================================================

    /// One-time mint of the permanent core position from treasury capital
    pub fn initialize_core(
        &mut self,
        caller: AccountId,
        amount0: u64,
        amount1: u64,
        now: i64,
    ) -> DefenseResult<()> {
        self.gate.ensure_owner(caller)?;
        self.guarded(|eng| {
            if eng.positions.core().is_some() {
                return Err(DefenseError::AlreadyInitialized);
            }
            let slot0 = eng.pool.slot0()?;
            let range = eng.config.core_range;
            let sqrt_lower = sqrt_price_x64_at_tick(range.tick_lower)?;
            let sqrt_upper = sqrt_price_x64_at_tick(range.tick_upper)?;
            let (liquidity, need0, need1) = liquidity_fitting_amounts(
                slot0.sqrt_price_x64,
                sqrt_lower,
                sqrt_upper,
                amount0,
                amount1,
            )?;
            if liquidity == 0 {
                return Err(DefenseError::InsufficientDefenseCapital);
            }
            eng.treasury.debit(need0, need1)?;
            let receipt = match eng.dispatch(PoolCommand::Mint { range, liquidity }) {
                Ok(receipt) => receipt,
                Err(err) => {
                    eng.treasury.credit(need0, need1);
                    return Err(err);
                }
            };
            eng.positions.set_core(PositionMeta {
                id: receipt.id,
                tick_lower: range.tick_lower,
                tick_upper: range.tick_upper,
                liquidity,
                active: true,
            });
            log::info!("core position {} initialized with liquidity {liquidity}", receipt.id);
            eng.events.push(DefenseEvent::CoreInitialized {
                id: receipt.id,
                tick: slot0.tick,
                liquidity,
                amount0: need0,
                amount1: need1,
                timestamp: now,
            });
            Ok(())
        })
    }

    /// Emergency override: deploy the buffer regardless of the current tick.
    /// Still requires an inactive buffer and runs atomically.
    pub fn force_deploy_buffer(&mut self, caller: AccountId, now: i64) -> DefenseResult<()> {
        self.gate.ensure_owner(caller)?;
        self.guarded(|eng| {
            let slot0 = eng.pool.slot0()?;
            eng.deploy_buffer(slot0, now)?;
            eng.finish_transition(Regime::Defend, slot0.tick, now);
            Ok(())
        })
    }

    /// Emergency override: withdraw the buffer regardless of the current tick
    pub fn force_remove_buffer(&mut self, caller: AccountId, now: i64) -> DefenseResult<()> {
        self.gate.ensure_owner(caller)?;
        self.guarded(|eng| {
            let slot0 = eng.pool.slot0()?;
            eng.remove_buffer(slot0, now)?;
            eng.finish_transition(Regime::Normal, slot0.tick, now);
            Ok(())
        })
    }

    /// Credit owner capital into the treasury
    pub fn fund(
        &mut self,
        caller: AccountId,
        amount0: u64,
        amount1: u64,
        now: i64,
    ) -> DefenseResult<()> {
        self.gate.ensure_owner(caller)?;
        self.guarded(|eng| {
            eng.treasury.credit(amount0, amount1);
            eng.events.push(DefenseEvent::TreasuryFunded {
                amount0,
                amount1,
                balance0_after: eng.treasury.balance0(),
                balance1_after: eng.treasury.balance1(),
                timestamp: now,
            });
            Ok(())
        })
    }

    /// Debit treasury capital for transfer to `to` (the transfer itself is
    /// the asset collaborator's job; the event records the movement)
    pub fn withdraw_treasury(
        &mut self,
        caller: AccountId,
        to: AccountId,
        amount0: u64,
        amount1: u64,
        now: i64,
    ) -> DefenseResult<()> {
        self.gate.ensure_owner(caller)?;
        self.guarded(|eng| {
            eng.treasury.debit(amount0, amount1)?;
            eng.events.push(DefenseEvent::TreasuryWithdrawn {
                to,
                amount0,
                amount1,
                balance0_after: eng.treasury.balance0(),
                balance1_after: eng.treasury.balance1(),
                timestamp: now,
            });
            Ok(())
        })
    }

    /// Replace the position ranges. The core range is locked once the core
    /// position exists; the buffer range is locked while the buffer is
    /// deployed.
    pub fn set_ranges(
        &mut self,
        caller: AccountId,
        core: RangeConfig,
        buffer: RangeConfig,
    ) -> DefenseResult<()> {
        self.gate.ensure_owner(caller)?;
        let spacing = self.pool.tick_spacing();
        core.validate(spacing)?;
        buffer.validate(spacing)?;

        if self.positions.core().is_some() && core != self.config.core_range {
            return Err(DefenseError::CoreRangeLocked);
        }
        if self.positions.active_buffer().is_some() && buffer != self.config.buffer_range {
            return Err(DefenseError::BufferAlreadyActive);
        }
        if buffer != self.config.buffer_range {
            // A retained handle is only reusable for its original range.
            self.positions.clear_buffer();
        }
        self.config.core_range = core;
        self.config.buffer_range = buffer;
        Ok(())
    }

    pub fn set_thresholds(&mut self, caller: AccountId, thresholds: Thresholds) -> DefenseResult<()> {
        self.gate.ensure_owner(caller)?;
        thresholds.validate()?;
        self.config.thresholds = thresholds;
        Ok(())
    }

    pub fn set_cooldown(&mut self, caller: AccountId, cooldown_secs: i64) -> DefenseResult<()> {
        self.gate.ensure_owner(caller)?;
        if cooldown_secs < 0 {
            return Err(DefenseError::InvalidConfig(
                "cooldown must be non-negative".to_string(),
            ));
        }
        self.config.cooldown_secs = cooldown_secs;
        self.cooldown.set_interval(cooldown_secs);
        Ok(())
    }

    pub fn add_keeper(&mut self, caller: AccountId, keeper: AccountId) -> DefenseResult<()> {
        self.gate.ensure_owner(caller)?;
        self.gate.add_keeper(keeper);
        Ok(())
    }

    pub fn remove_keeper(&mut self, caller: AccountId, keeper: AccountId) -> DefenseResult<()> {
        self.gate.ensure_owner(caller)?;
        self.gate.remove_keeper(&keeper);
        Ok(())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Run `f` with the reentrancy flag held. The flag is released on every
    /// path, success or error.
    fn guarded<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> DefenseResult<T>,
    ) -> DefenseResult<T> {
        if self.busy {
            return Err(DefenseError::ReentrantCall);
        }
        self.busy = true;
        let result = f(self);
        self.busy = false;
        result
    }

    /// Dispatch a pool mutation through the capability allowlist
    fn dispatch(&mut self, command: PoolCommand) -> DefenseResult<PoolReceipt> {
        let op = command.op();
        if !self.config.capabilities.contains(&op) {
            return Err(DefenseError::OperationNotPermitted(op));
        }
        let receipt = match command {
            PoolCommand::Mint { range, liquidity } => self.pool.mint(range, liquidity)?,
            PoolCommand::Increase { id, liquidity } => self.pool.increase_liquidity(id, liquidity)?,
            PoolCommand::Decrease { id, liquidity } => self.pool.decrease_liquidity(id, liquidity)?,
            PoolCommand::Collect { id } => self.pool.collect_fees(id)?,
        };
        Ok(receipt)
    }

    /// A drained buffer handle is reusable only with the capability and an
    /// unchanged range
    fn reusable_buffer_handle(&self, range: RangeConfig) -> Option<PositionId> {
        if !self.config.capabilities.contains(&PoolOp::IncreaseLiquidity) {
            return None;
        }
        self.positions
            .buffer()
            .filter(|meta| {
                !meta.active
                    && meta.tick_lower == range.tick_lower
                    && meta.tick_upper == range.tick_upper
            })
            .map(|meta| meta.id)
    }

    /// Size the buffer from treasury capital at the current price, debit the
    /// treasury, and mint (or increase) through the pool. On pool failure
    /// the debit is restored, leaving state untouched.
    fn deploy_buffer(&mut self, slot0: Slot0, now: i64) -> DefenseResult<()> {
        if self.positions.active_buffer().is_some() {
            return Err(DefenseError::BufferAlreadyActive);
        }
        let range = self.config.buffer_range;
        let sqrt_lower = sqrt_price_x64_at_tick(range.tick_lower)?;
        let sqrt_upper = sqrt_price_x64_at_tick(range.tick_upper)?;
        // Fitted sizing: the round-up deposit amounts are guaranteed to fit
        // the balances, so the debit below cannot fail against capital the
        // sizing itself consumed.
        let (liquidity, amount0, amount1) = liquidity_fitting_amounts(
            slot0.sqrt_price_x64,
            sqrt_lower,
            sqrt_upper,
            self.treasury.balance0(),
            self.treasury.balance1(),
        )?;
        if liquidity == 0 || (amount0 == 0 && amount1 == 0) {
            return Err(DefenseError::InsufficientDefenseCapital);
        }
        self.treasury
            .debit(amount0, amount1)
            .map_err(|_| DefenseError::InsufficientDefenseCapital)?;

        let command = match self.reusable_buffer_handle(range) {
            Some(id) => PoolCommand::Increase { id, liquidity },
            None => PoolCommand::Mint { range, liquidity },
        };
        let receipt = match self.dispatch(command) {
            Ok(receipt) => receipt,
            Err(err) => {
                self.treasury.credit(amount0, amount1);
                return Err(err);
            }
        };
        self.positions.set_buffer(PositionMeta {
            id: receipt.id,
            tick_lower: range.tick_lower,
            tick_upper: range.tick_upper,
            liquidity,
            active: true,
        });
        log::info!(
            "buffer {} deployed: liquidity {liquidity}, amounts {amount0}/{amount1}, tick {}",
            receipt.id,
            slot0.tick
        );
        self.events.push(DefenseEvent::BufferDeployed {
            id: receipt.id,
            tick: slot0.tick,
            liquidity,
            amount0,
            amount1,
            treasury0_after: self.treasury.balance0(),
            treasury1_after: self.treasury.balance1(),
            timestamp: now,
        });
        Ok(())
    }

    /// Withdraw the buffer fully into the treasury. The pool's recorded
    /// liquidity is reconciled before acting; the ledger never overrides it.
    fn remove_buffer(&mut self, slot0: Slot0, now: i64) -> DefenseResult<()> {
        let meta = *self
            .positions
            .active_buffer()
            .ok_or(DefenseError::BufferNotActive)?;
        let live_liquidity = self.pool.position_liquidity(meta.id)?;
        let receipt = self.dispatch(PoolCommand::Decrease {
            id: meta.id,
            liquidity: live_liquidity,
        })?;
        self.treasury.credit(receipt.amount0, receipt.amount1);
        if self.config.capabilities.contains(&PoolOp::IncreaseLiquidity) {
            self.positions.deactivate_buffer();
        } else {
            self.positions.clear_buffer();
        }
        log::info!(
            "buffer {} removed: liquidity {live_liquidity}, amounts {}/{}, tick {}",
            meta.id,
            receipt.amount0,
            receipt.amount1,
            slot0.tick
        );
        self.events.push(DefenseEvent::BufferRemoved {
            id: meta.id,
            tick: slot0.tick,
            liquidity: live_liquidity,
            amount0: receipt.amount0,
            amount1: receipt.amount1,
            treasury0_after: self.treasury.balance0(),
            treasury1_after: self.treasury.balance1(),
            timestamp: now,
        });
        Ok(())
    }

    /// Commit the regime flip and reset the cooldown
    fn finish_transition(&mut self, target: Regime, tick: i32, now: i64) {
        let from = self.regime;
        self.regime = target;
        self.cooldown.reset(now);
        if from != target {
            log::info!("regime transition {from:?} -> {target:?} at tick {tick}");
            self.events.push(DefenseEvent::RegimeChanged {
                from,
                to: target,
                tick,
                timestamp: now,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::PoolError;
    use std::collections::HashMap;

    const OWNER: AccountId = AccountId::from_byte(1);
    const KEEPER: AccountId = AccountId::from_byte(2);
    const STRANGER: AccountId = AccountId::from_byte(9);

    /// Minimal pool stub: tracks per-position liquidity, echoes configured
    /// settlement amounts, and can fail its next mutation on demand.
    struct StubPool {
        slot0: Slot0,
        next_id: u64,
        liquidity: HashMap<u64, u128>,
        decrease_returns: (u64, u64),
        collect_returns: (u64, u64),
        fail_next: bool,
    }

    impl StubPool {
        fn at_tick(tick: i32) -> Self {
            Self {
                slot0: Slot0 {
                    sqrt_price_x64: sqrt_price_x64_at_tick(tick).unwrap(),
                    tick,
                },
                next_id: 1,
                liquidity: HashMap::new(),
                decrease_returns: (0, 0),
                collect_returns: (0, 0),
                fail_next: false,
            }
        }

        fn set_tick(&mut self, tick: i32) {
            self.slot0 = Slot0 {
                sqrt_price_x64: sqrt_price_x64_at_tick(tick).unwrap(),
                tick,
            };
        }

        fn take_failure(&mut self) -> Result<(), PoolError> {
            if self.fail_next {
                self.fail_next = false;
                return Err(PoolError::Rejected("injected".to_string()));
            }
            Ok(())
        }
    }

    impl LiquidityPool for StubPool {
        fn slot0(&self) -> Result<Slot0, PoolError> {
            Ok(self.slot0)
        }

        fn tick_spacing(&self) -> i32 {
            10
        }

        fn mint(&mut self, _range: RangeConfig, liquidity: u128) -> Result<PoolReceipt, PoolError> {
            self.take_failure()?;
            let id = PositionId(self.next_id);
            self.next_id += 1;
            self.liquidity.insert(id.0, liquidity);
            Ok(PoolReceipt { id, amount0: 0, amount1: 0 })
        }

        fn increase_liquidity(
            &mut self,
            id: PositionId,
            liquidity: u128,
        ) -> Result<PoolReceipt, PoolError> {
            self.take_failure()?;
            let entry = self
                .liquidity
                .get_mut(&id.0)
                .ok_or(PoolError::UnknownPosition(id))?;
            *entry += liquidity;
            Ok(PoolReceipt { id, amount0: 0, amount1: 0 })
        }

        fn decrease_liquidity(
            &mut self,
            id: PositionId,
            liquidity: u128,
        ) -> Result<PoolReceipt, PoolError> {
            self.take_failure()?;
            let entry = self
                .liquidity
                .get_mut(&id.0)
                .ok_or(PoolError::UnknownPosition(id))?;
            if *entry < liquidity {
                return Err(PoolError::InsufficientPositionLiquidity);
            }
            *entry -= liquidity;
            let (amount0, amount1) = self.decrease_returns;
            Ok(PoolReceipt { id, amount0, amount1 })
        }

        fn collect_fees(&mut self, id: PositionId) -> Result<PoolReceipt, PoolError> {
            self.take_failure()?;
            if !self.liquidity.contains_key(&id.0) {
                return Err(PoolError::UnknownPosition(id));
            }
            let (amount0, amount1) = std::mem::take(&mut self.collect_returns);
            Ok(PoolReceipt { id, amount0, amount1 })
        }

        fn position_liquidity(&self, id: PositionId) -> Result<u128, PoolError> {
            self.liquidity
                .get(&id.0)
                .copied()
                .ok_or(PoolError::UnknownPosition(id))
        }
    }

    fn config() -> DefenseConfig {
        DefenseConfig::new(
            RangeConfig { tick_lower: -10, tick_upper: 10 },
            RangeConfig { tick_lower: -120, tick_upper: -60 },
            Thresholds { escalate: -50, deescalate: -30 },
        )
    }

    fn engine_at(tick: i32) -> RebalanceEngine<StubPool> {
        let mut engine = RebalanceEngine::new(StubPool::at_tick(tick), config(), OWNER).unwrap();
        engine.add_keeper(OWNER, KEEPER).unwrap();
        engine
    }

    #[test]
    fn authorization_is_enforced() {
        let mut engine = engine_at(0);
        assert_eq!(
            engine.auto_rebalance(STRANGER, 1_000),
            Err(DefenseError::NotAuthorized)
        );
        assert_eq!(
            engine.fund(KEEPER, 1, 1, 1_000),
            Err(DefenseError::NotAuthorized)
        );
        assert_eq!(
            engine.force_deploy_buffer(KEEPER, 1_000),
            Err(DefenseError::NotAuthorized)
        );
    }

    #[test]
    fn no_regime_change_is_an_error() {
        let mut engine = engine_at(0);
        engine.fund(OWNER, 0, 1_000_000, 1_000).unwrap();
        assert_eq!(
            engine.auto_rebalance(KEEPER, 1_000),
            Err(DefenseError::NoRegimeChange)
        );
        assert_eq!(engine.regime(), Regime::Normal);
    }

    #[test]
    fn deploy_and_remove_buffer() {
        let mut engine = engine_at(0);
        engine.fund(OWNER, 0, 1_000_000, 1_000).unwrap();

        engine.pool.set_tick(-60);
        let check = engine.needs_rebalance().unwrap();
        assert!(check.needed);
        assert_eq!(check.target_regime, Regime::Defend);

        assert_eq!(engine.auto_rebalance(KEEPER, 1_000).unwrap(), Regime::Defend);
        assert_eq!(engine.regime(), Regime::Defend);
        // The whole defense-asset balance moves into the buffer.
        assert_eq!(engine.treasury().balance1(), 0);
        let buffer = *engine.positions().active_buffer().unwrap();
        assert_eq!(buffer.liquidity, 334_853_254);

        engine.pool.set_tick(-20);
        engine.pool.decrease_returns = (0, 999_999);
        assert_eq!(engine.auto_rebalance(KEEPER, 2_000).unwrap(), Regime::Normal);
        assert_eq!(engine.regime(), Regime::Normal);
        assert_eq!(engine.treasury().balance1(), 999_999);
        // Default capabilities: no reuse, handle fully cleared.
        assert!(engine.positions().buffer().is_none());
    }

    #[test]
    fn cooldown_blocks_second_rebalance() {
        let mut engine = engine_at(0);
        engine.fund(OWNER, 0, 1_000_000, 1_000).unwrap();

        engine.pool.set_tick(-60);
        engine.auto_rebalance(KEEPER, 1_000).unwrap();

        engine.pool.set_tick(-20);
        let before_treasury = *engine.treasury();
        let before_regime = engine.regime();
        assert_eq!(
            engine.auto_rebalance(KEEPER, 1_100),
            Err(DefenseError::CooldownActive { next_eligible: 1_300 })
        );
        assert_eq!(*engine.treasury(), before_treasury);
        assert_eq!(engine.regime(), before_regime);

        engine.pool.decrease_returns = (0, 999_999);
        assert!(engine.auto_rebalance(KEEPER, 1_300).is_ok());
    }

    #[test]
    fn deep_crash_deploy_consumes_exact_token0_balance() {
        // Price below the buffer range: the deploy is token0-sided, and the
        // sizing must fit the balance exactly instead of demanding one token
        // more than the treasury holds.
        let mut engine = engine_at(-160);
        engine.fund(OWNER, 1_000_000, 0, 500).unwrap();

        assert_eq!(engine.auto_rebalance(KEEPER, 1_000).unwrap(), Regime::Defend);
        let buffer = *engine.positions().active_buffer().unwrap();
        assert_eq!(buffer.liquidity, 331_852_913);
        assert_eq!(engine.treasury().balance0(), 0);
        assert_eq!(engine.treasury().balance1(), 0);
    }

    #[test]
    fn in_range_deploy_fits_both_balances() {
        let mut engine = engine_at(-90);
        engine.fund(OWNER, 1_000_000, 1_000_000, 500).unwrap();

        assert_eq!(engine.auto_rebalance(KEEPER, 1_000).unwrap(), Regime::Defend);
        assert_eq!(
            engine.positions().active_buffer().unwrap().liquidity,
            664_204_618
        );
        // Token0 binds; the token1 remainder stays in the treasury.
        assert_eq!(engine.treasury().balance0(), 0);
        assert_eq!(engine.treasury().balance1(), 8_959);
    }

    #[test]
    fn deploy_without_capital_fails() {
        let mut engine = engine_at(-60);
        assert_eq!(
            engine.auto_rebalance(KEEPER, 1_000),
            Err(DefenseError::InsufficientDefenseCapital)
        );
    }

    #[test]
    fn pool_failure_unwinds_deploy() {
        let mut engine = engine_at(0);
        engine.fund(OWNER, 0, 1_000_000, 1_000).unwrap();
        engine.pool.set_tick(-60);
        engine.pool.fail_next = true;

        let err = engine.auto_rebalance(KEEPER, 1_000).unwrap_err();
        assert!(matches!(err, DefenseError::Pool(_)));

        // Nothing applied: treasury intact, no buffer, regime and cooldown
        // unchanged (an immediate retry is allowed).
        assert_eq!(engine.treasury().balance1(), 1_000_000);
        assert!(engine.positions().buffer().is_none());
        assert_eq!(engine.regime(), Regime::Normal);
        assert!(engine.auto_rebalance(KEEPER, 1_001).is_ok());
    }

    #[test]
    fn core_position_is_never_touched() {
        let mut engine = engine_at(0);
        engine.fund(OWNER, 500_000, 1_500_000, 1_000).unwrap();
        engine.initialize_core(OWNER, 500_000, 500_000, 1_000).unwrap();
        let core_before = *engine.positions().core().unwrap();

        engine.pool.set_tick(-60);
        engine.auto_rebalance(KEEPER, 1_000).unwrap();
        engine.pool.set_tick(-20);
        engine.pool.decrease_returns = (0, 999_999);
        engine.auto_rebalance(KEEPER, 2_000).unwrap();

        assert_eq!(*engine.positions().core().unwrap(), core_before);
        assert_eq!(
            engine.pool.position_liquidity(core_before.id).unwrap(),
            core_before.liquidity
        );
    }

    #[test]
    fn initialize_core_requires_funding_and_happens_once() {
        let mut engine = engine_at(0);
        assert_eq!(
            engine.initialize_core(OWNER, 500_000, 500_000, 1_000),
            Err(DefenseError::InsufficientFunds)
        );

        engine.fund(OWNER, 500_000, 500_000, 1_000).unwrap();
        engine.initialize_core(OWNER, 500_000, 500_000, 1_000).unwrap();
        assert_eq!(engine.positions().core().unwrap().liquidity, 1_000_300_019);
        assert_eq!(engine.treasury().balance0(), 0);
        assert_eq!(engine.treasury().balance1(), 0);

        assert_eq!(
            engine.initialize_core(OWNER, 1, 1, 2_000),
            Err(DefenseError::AlreadyInitialized)
        );
    }

    #[test]
    fn collect_fees_is_idempotent() {
        let mut engine = engine_at(0);
        engine.fund(OWNER, 500_000, 500_000, 1_000).unwrap();
        engine.initialize_core(OWNER, 500_000, 500_000, 1_000).unwrap();

        engine.pool.collect_returns = (40, 25);
        assert_eq!(engine.collect_fees(KEEPER, 2_000).unwrap(), (40, 25));
        assert_eq!(engine.treasury().total_fees_collected(), (40, 25));
        assert_eq!(engine.treasury().balance0(), 40);

        // Nothing accrued since: successful no-op, counters unchanged.
        assert_eq!(engine.collect_fees(KEEPER, 2_100).unwrap(), (0, 0));
        assert_eq!(engine.treasury().total_fees_collected(), (40, 25));
    }

    #[test]
    fn force_overrides_bypass_tick_but_not_preconditions() {
        let mut engine = engine_at(-40); // hysteresis band
        engine.fund(OWNER, 0, 1_000_000, 1_000).unwrap();

        engine.force_deploy_buffer(OWNER, 1_000).unwrap();
        assert_eq!(engine.regime(), Regime::Defend);
        assert_eq!(
            engine.force_deploy_buffer(OWNER, 1_100),
            Err(DefenseError::BufferAlreadyActive)
        );

        engine.pool.decrease_returns = (0, 999_999);
        engine.force_remove_buffer(OWNER, 1_200).unwrap();
        assert_eq!(engine.regime(), Regime::Normal);
        assert_eq!(
            engine.force_remove_buffer(OWNER, 1_300),
            Err(DefenseError::BufferNotActive)
        );
    }

    #[test]
    fn buffer_handle_reuse_behind_capability() {
        let mut cfg = config();
        cfg.capabilities.insert(PoolOp::IncreaseLiquidity);
        let mut engine = RebalanceEngine::new(StubPool::at_tick(-60), cfg, OWNER).unwrap();
        engine.fund(OWNER, 0, 1_000_000, 1_000).unwrap();

        engine.auto_rebalance(OWNER, 1_000).unwrap();
        let first_id = engine.positions().active_buffer().unwrap().id;

        engine.pool.set_tick(-20);
        engine.pool.decrease_returns = (0, 999_999);
        engine.auto_rebalance(OWNER, 2_000).unwrap();
        // Handle retained, drained.
        assert_eq!(engine.positions().buffer().unwrap().id, first_id);
        assert!(!engine.positions().buffer().unwrap().active);

        engine.pool.set_tick(-60);
        engine.auto_rebalance(OWNER, 3_000).unwrap();
        assert_eq!(engine.positions().active_buffer().unwrap().id, first_id);
    }

    #[test]
    fn reentrant_calls_are_rejected() {
        let mut engine = engine_at(0);
        engine.busy = true;
        assert_eq!(
            engine.auto_rebalance(OWNER, 1_000),
            Err(DefenseError::ReentrantCall)
        );
        assert_eq!(
            engine.collect_fees(OWNER, 1_000),
            Err(DefenseError::ReentrantCall)
        );
    }

    #[test]
    fn range_setters_respect_locks() {
        let mut engine = engine_at(0);
        let core = RangeConfig { tick_lower: -10, tick_upper: 10 };
        let wider_buffer = RangeConfig { tick_lower: -200, tick_upper: -60 };

        engine.set_ranges(OWNER, core, wider_buffer).unwrap();
        assert_eq!(engine.config().buffer_range, wider_buffer);

        engine.fund(OWNER, 500_000, 500_000, 1_000).unwrap();
        engine.initialize_core(OWNER, 500_000, 500_000, 1_000).unwrap();
        let moved_core = RangeConfig { tick_lower: -20, tick_upper: 20 };
        assert_eq!(
            engine.set_ranges(OWNER, moved_core, wider_buffer),
            Err(DefenseError::CoreRangeLocked)
        );
    }

    #[test]
    fn unpermitted_pool_operation_is_rejected() {
        let mut engine = engine_at(0);
        // IncreaseLiquidity is not in the default capability set.
        assert_eq!(
            engine.dispatch(PoolCommand::Increase { id: PositionId(1), liquidity: 1 }),
            Err(DefenseError::OperationNotPermitted(PoolOp::IncreaseLiquidity))
        );
    }

    #[test]
    fn events_record_the_cycle() {
        let mut engine = engine_at(0);
        engine.fund(OWNER, 0, 1_000_000, 1_000).unwrap();
        engine.pool.set_tick(-60);
        engine.auto_rebalance(KEEPER, 1_000).unwrap();

        let events = engine.drain_events();
        assert!(matches!(events[0], DefenseEvent::TreasuryFunded { .. }));
        assert!(matches!(
            events[1],
            DefenseEvent::BufferDeployed { tick: -60, amount1: 1_000_000, .. }
        ));
        assert!(matches!(
            events[2],
            DefenseEvent::RegimeChanged { from: Regime::Normal, to: Regime::Defend, .. }
        ));
        assert!(engine.events().is_empty());
    }

    #[test]
    fn preview_fee_uses_pool_tick() {
        let mut engine = engine_at(0);
        assert_eq!(engine.preview_fee(false).unwrap(), 30);
        engine.pool.set_tick(200);
        assert_eq!(engine.preview_fee(false).unwrap(), 1_000);
        assert_eq!(engine.preview_fee(true).unwrap(), 5);
    }
}
