//! Wide-integer multiply-divide.
//!
//! `mul_div` computes `a * b / denominator` over u128 operands with a full
//! 256-bit intermediate product, so sqrt-price and liquidity math never
//! silently truncates. Rounding direction is always explicit.

use crate::errors::{DefenseError, DefenseResult};

/// Rounding mode for division operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Round down (towards zero)
    Down,
    /// Round up (away from zero)
    Up,
}

/// Full 128x128 -> 256 bit multiplication, returned as (hi, lo) u128 words.
fn wide_mul(a: u128, b: u128) -> (u128, u128) {
    const MASK: u128 = (1u128 << 64) - 1;

    let (a_hi, a_lo) = (a >> 64, a & MASK);
    let (b_hi, b_lo) = (b >> 64, b & MASK);

    let ll = a_lo * b_lo;
    let lh = a_lo * b_hi;
    let hl = a_hi * b_lo;
    let hh = a_hi * b_hi;

    // Middle column: carries from ll plus the low halves of the cross terms.
    let mid = (ll >> 64) + (lh & MASK) + (hl & MASK);

    let lo = (mid << 64) | (ll & MASK);
    let hi = hh + (lh >> 64) + (hl >> 64) + (mid >> 64);

    (hi, lo)
}

/// Divide a 256-bit value (hi, lo) by a u128 divisor.
///
/// Returns (quotient, remainder). Requires `hi < divisor` so the quotient
/// fits in a u128; callers check this before calling.
fn div_wide(hi: u128, lo: u128, divisor: u128) -> (u128, u128) {
    debug_assert!(divisor != 0);
    debug_assert!(hi < divisor);

    if hi == 0 {
        return (lo / divisor, lo % divisor);
    }

    // Shift-subtract long division over the 128 bits of `lo`, seeded with
    // `hi` as the running remainder. The remainder can momentarily exceed
    // 128 bits after the shift; wrapping subtraction stays correct because
    // the true remainder is then remainder + 2^128 and the overshoot is
    // always below 2 * divisor.
    let mut remainder = hi;
    let mut quotient = 0u128;
    for i in (0..128).rev() {
        let carry = remainder >> 127;
        remainder = (remainder << 1) | ((lo >> i) & 1);
        if carry == 1 || remainder >= divisor {
            remainder = remainder.wrapping_sub(divisor);
            quotient |= 1 << i;
        }
    }

    (quotient, remainder)
}

/// Compute `a * b / denominator` with a 256-bit intermediate product.
///
/// Fails with `DivisionByZero` when the denominator is zero and with
/// `MathOverflow` when the quotient does not fit in a u128.
pub fn mul_div(a: u128, b: u128, denominator: u128, rounding: Rounding) -> DefenseResult<u128> {
    if denominator == 0 {
        return Err(DefenseError::DivisionByZero);
    }

    let (hi, lo) = wide_mul(a, b);
    if hi >= denominator {
        return Err(DefenseError::MathOverflow);
    }

    let (quotient, remainder) = div_wide(hi, lo, denominator);
    match rounding {
        Rounding::Down => Ok(quotient),
        Rounding::Up if remainder == 0 => Ok(quotient),
        Rounding::Up => quotient.checked_add(1).ok_or(DefenseError::MathOverflow),
    }
}
