//! # Fee Policy
//!
//! Directional dynamic-fee curve for the policy layer. The fee is a
//! piecewise-linear function of tick deviation from the peg with two slopes:
//! a steep penalty for trades pushing the price away from the peg and a
//! shallow discount (8x shallower by default) rewarding trades that push it
//! back.
//!
//! All arithmetic is integer and truncates (rounds toward zero); the result
//! is charged against real transfers, so the rounding rule is part of the
//! contract.

use serde::{Deserialize, Serialize};

use crate::constants::{
    BPS_DENOMINATOR, DEFAULT_AWAY_SLOPE_BPS_PER_TICK, DEFAULT_BASE_FEE_BPS, DEFAULT_DEAD_ZONE_TICKS,
    DEFAULT_MAX_FEE_BPS, DEFAULT_MIN_FEE_BPS, DEFAULT_TOWARD_SLOPE_DEN,
    DEFAULT_TOWARD_SLOPE_NUM,
};
use crate::errors::{DefenseError, DefenseResult};

/// Fee curve parameters, in basis points of 10,000.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Fee charged inside the dead zone, both directions
    pub base_fee_bps: u64,
    /// Floor for toward-peg trades
    pub min_fee_bps: u64,
    /// Ceiling for away-from-peg trades
    pub max_fee_bps: u64,
    /// Deviation (in ticks) below which direction is ignored
    pub dead_zone_ticks: u32,
    /// Penalty slope, bps per tick of excess deviation
    pub away_slope_bps_per_tick: u64,
    /// Reward slope numerator (bps per tick, fractional)
    pub toward_slope_num: u64,
    /// Reward slope denominator
    pub toward_slope_den: u64,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            base_fee_bps: DEFAULT_BASE_FEE_BPS,
            min_fee_bps: DEFAULT_MIN_FEE_BPS,
            max_fee_bps: DEFAULT_MAX_FEE_BPS,
            dead_zone_ticks: DEFAULT_DEAD_ZONE_TICKS,
            away_slope_bps_per_tick: DEFAULT_AWAY_SLOPE_BPS_PER_TICK,
            toward_slope_num: DEFAULT_TOWARD_SLOPE_NUM,
            toward_slope_den: DEFAULT_TOWARD_SLOPE_DEN,
        }
    }
}

impl FeeConfig {
    pub fn validate(&self) -> DefenseResult<()> {
        if self.max_fee_bps >= BPS_DENOMINATOR {
            return Err(DefenseError::InvalidFeeConfig(format!(
                "max fee {} must be below {BPS_DENOMINATOR} bps",
                self.max_fee_bps
            )));
        }
        if self.min_fee_bps > self.base_fee_bps || self.base_fee_bps > self.max_fee_bps {
            return Err(DefenseError::InvalidFeeConfig(format!(
                "fee bounds must satisfy min <= base <= max, got {} / {} / {}",
                self.min_fee_bps, self.base_fee_bps, self.max_fee_bps
            )));
        }
        if self.away_slope_bps_per_tick == 0 {
            return Err(DefenseError::InvalidFeeConfig(
                "away slope must be nonzero".to_string(),
            ));
        }
        if self.toward_slope_den == 0 {
            return Err(DefenseError::InvalidFeeConfig(
                "toward slope denominator must be nonzero".to_string(),
            ));
        }
        Ok(())
    }

    /// Fee rate in basis points for a trade at `current_tick`.
    ///
    /// `toward_peg` is true when the trade moves the pool price toward the
    /// peg. Pure; usable both on the trade path and for off-path previews.
    pub fn preview_fee(&self, current_tick: i32, toward_peg: bool) -> u64 {
        let deviation = u64::from(current_tick.unsigned_abs());
        if deviation <= u64::from(self.dead_zone_ticks) {
            return self.base_fee_bps;
        }

        let excess = deviation - u64::from(self.dead_zone_ticks);
        if toward_peg {
            // Truncating division: the discount grows with deviation.
            let discount = excess
                .saturating_mul(self.toward_slope_num)
                / self.toward_slope_den;
            self.base_fee_bps
                .saturating_sub(discount)
                .max(self.min_fee_bps)
        } else {
            let penalty = excess.saturating_mul(self.away_slope_bps_per_tick);
            self.base_fee_bps
                .saturating_add(penalty)
                .min(self.max_fee_bps)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn fee_curve_vectors() {
        let fee = FeeConfig::default();

        // At the peg both directions pay the base fee.
        assert_eq!(fee.preview_fee(0, true), 30);
        assert_eq!(fee.preview_fee(0, false), 30);

        // Dead zone boundary.
        assert_eq!(fee.preview_fee(5, false), 30);
        assert_eq!(fee.preview_fee(-5, true), 30);
        assert_eq!(fee.preview_fee(6, false), 35);

        // Deep deviation: away side pinned at the ceiling, toward side at
        // the floor, away strictly greater.
        assert_eq!(fee.preview_fee(200, false), 1_000);
        assert_eq!(fee.preview_fee(200, true), 5);
        assert_eq!(fee.preview_fee(-200, false), 1_000);
        assert_eq!(fee.preview_fee(-200, true), 5);
        assert!(fee.preview_fee(200, false) > fee.preview_fee(200, true));

        // Truncation: one tick past the dead zone the 5/8 discount is zero.
        assert_eq!(fee.preview_fee(6, true), 30);
        assert_eq!(fee.preview_fee(10, true), 27);
        assert_eq!(fee.preview_fee(10, false), 55);
    }

    #[test]
    fn validation() {
        assert!(FeeConfig::default().validate().is_ok());

        let mut bad = FeeConfig::default();
        bad.min_fee_bps = 50;
        assert!(matches!(bad.validate(), Err(DefenseError::InvalidFeeConfig(_))));

        let mut bad = FeeConfig::default();
        bad.toward_slope_den = 0;
        assert!(bad.validate().is_err());
    }

    proptest! {
        /// Away-from-peg fee is nondecreasing in deviation; toward-peg fee is
        /// nonincreasing; both stay inside [min, max]; at equal deviation the
        /// away fee dominates.
        #[test]
        fn fee_curve_shape(d1 in 0i32..=443_636, d2 in 0i32..=443_636) {
            let fee = FeeConfig::default();
            let (lo, hi) = if d1 <= d2 { (d1, d2) } else { (d2, d1) };

            prop_assert!(fee.preview_fee(lo, false) <= fee.preview_fee(hi, false));
            prop_assert!(fee.preview_fee(lo, true) >= fee.preview_fee(hi, true));

            for d in [lo, hi] {
                let away = fee.preview_fee(d, false);
                let toward = fee.preview_fee(d, true);
                prop_assert!(away >= toward);
                prop_assert!((fee.min_fee_bps..=fee.max_fee_bps).contains(&away));
                prop_assert!((fee.min_fee_bps..=fee.max_fee_bps).contains(&toward));
            }
        }

        /// The curve is symmetric in the sign of the deviation.
        #[test]
        fn fee_curve_sign_symmetric(d in 0i32..=443_636, toward in any::<bool>()) {
            let fee = FeeConfig::default();
            prop_assert_eq!(fee.preview_fee(d, toward), fee.preview_fee(-d, toward));
        }
    }
}
