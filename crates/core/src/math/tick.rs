//! # Tick Math
//!
//! Conversion from ticks to Q64 sqrt prices via binary decomposition over
//! precomputed powers of sqrt(1.0001), plus tick validity and spacing
//! alignment checks.

use crate::constants::{MAX_TICK, MIN_TICK, Q64};
use crate::errors::{DefenseError, DefenseResult};
use crate::math::muldiv::{mul_div, Rounding};

/// Precomputed sqrt(1.0001)^(2^i) in Q64 format, i = 0..=18.
///
/// MAX_TICK fits in 19 bits, so 19 entries cover the whole tick space.
const SQRT_PRICE_MAGIC: [u128; 19] = [
    18447666387855959850,      // sqrt(1.0001)^(2^0)
    18448588748116922569,      // sqrt(1.0001)^(2^1)
    18450433606991734259,      // sqrt(1.0001)^(2^2)
    18454123878217468671,      // sqrt(1.0001)^(2^3)
    18461506635090006683,      // sqrt(1.0001)^(2^4)
    18476281010653910107,      // sqrt(1.0001)^(2^5)
    18505865242158249966,      // sqrt(1.0001)^(2^6)
    18565175891880433370,      // sqrt(1.0001)^(2^7)
    18684368066214940275,      // sqrt(1.0001)^(2^8)
    18925053041275764047,      // sqrt(1.0001)^(2^9)
    19415764168677885645,      // sqrt(1.0001)^(2^10)
    20435687552633174797,      // sqrt(1.0001)^(2^11)
    22639080592224297029,      // sqrt(1.0001)^(2^12)
    27784196929998385068,      // sqrt(1.0001)^(2^13)
    41848122137994941923,      // sqrt(1.0001)^(2^14)
    94936283578220170147,      // sqrt(1.0001)^(2^15)
    488590176327620415397,     // sqrt(1.0001)^(2^16)
    12941056668319120408908,   // sqrt(1.0001)^(2^17)
    9078618265828695359366874, // sqrt(1.0001)^(2^18)
];

/// Check if a tick is within the supported range
pub fn is_tick_valid(tick: i32) -> bool {
    (MIN_TICK..=MAX_TICK).contains(&tick)
}

/// Check if a tick sits on a spacing boundary
pub fn is_aligned(tick: i32, tick_spacing: i32) -> bool {
    tick_spacing > 0 && tick % tick_spacing == 0
}

/// Get the Q64 sqrt price at a tick.
///
/// Rounds down at every multiplication step; the whole crate uses this one
/// conversion so sizing and settlement stay mutually consistent.
pub fn sqrt_price_x64_at_tick(tick: i32) -> DefenseResult<u128> {
    if !is_tick_valid(tick) {
        return Err(DefenseError::InvalidTick);
    }

    let abs_tick = tick.unsigned_abs();
    let mut sqrt_price = Q64;
    for (i, magic) in SQRT_PRICE_MAGIC.iter().enumerate() {
        if abs_tick & (1 << i) != 0 {
            sqrt_price = mul_div(sqrt_price, *magic, Q64, Rounding::Down)?;
        }
    }

    if tick < 0 {
        // Invert: Q64^2 / sqrt_price
        sqrt_price = mul_div(Q64, Q64, sqrt_price, Rounding::Down)?;
    }

    Ok(sqrt_price)
}
