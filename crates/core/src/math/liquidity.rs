//! # Liquidity Math
//!
//! Conversions between token amounts and concentrated-liquidity quantities
//! for a tick range. Used to size the buffer position from treasury capital
//! and to compute the exact treasury debits and credits for a mint or burn.
//!
//! Rounding always favors the treasury: debits (amounts required to mint)
//! round up, credits (amounts returned on burn) round down.

use crate::constants::Q64;
use crate::errors::{DefenseError, DefenseResult};
use crate::math::muldiv::{mul_div, Rounding};

fn sorted(a: u128, b: u128) -> DefenseResult<(u128, u128)> {
    let (lo, hi) = if a > b { (b, a) } else { (a, b) };
    if lo == hi {
        return Err(DefenseError::DivisionByZero);
    }
    Ok((lo, hi))
}

/// Liquidity obtainable from `amount0` over a sqrt-price interval
pub fn liquidity_for_amount_0(
    sqrt_ratio_a_x64: u128,
    sqrt_ratio_b_x64: u128,
    amount0: u64,
) -> DefenseResult<u128> {
    let (lo, hi) = sorted(sqrt_ratio_a_x64, sqrt_ratio_b_x64)?;
    let intermediate = mul_div(lo, hi, Q64, Rounding::Down)?;
    mul_div(amount0 as u128, intermediate, hi - lo, Rounding::Down)
}

/// Liquidity obtainable from `amount1` over a sqrt-price interval
pub fn liquidity_for_amount_1(
    sqrt_ratio_a_x64: u128,
    sqrt_ratio_b_x64: u128,
    amount1: u64,
) -> DefenseResult<u128> {
    let (lo, hi) = sorted(sqrt_ratio_a_x64, sqrt_ratio_b_x64)?;
    mul_div(amount1 as u128, Q64, hi - lo, Rounding::Down)
}

/// Maximum liquidity mintable from both amounts at the current price.
///
/// Entirely-above-range positions consume token1, entirely-below-range
/// positions consume token0, in-range positions take the binding minimum of
/// the two sides.
pub fn liquidity_for_amounts(
    sqrt_price_x64: u128,
    sqrt_ratio_a_x64: u128,
    sqrt_ratio_b_x64: u128,
    amount0: u64,
    amount1: u64,
) -> DefenseResult<u128> {
    let (lo, hi) = sorted(sqrt_ratio_a_x64, sqrt_ratio_b_x64)?;

    if sqrt_price_x64 <= lo {
        liquidity_for_amount_0(lo, hi, amount0)
    } else if sqrt_price_x64 < hi {
        let liquidity0 = liquidity_for_amount_0(sqrt_price_x64, hi, amount0)?;
        let liquidity1 = liquidity_for_amount_1(lo, sqrt_price_x64, amount1)?;
        Ok(liquidity0.min(liquidity1))
    } else {
        liquidity_for_amount_1(lo, hi, amount1)
    }
}

/// Token0 owed for `liquidity` over a sqrt-price interval
pub fn amount_0_delta(
    sqrt_ratio_a_x64: u128,
    sqrt_ratio_b_x64: u128,
    liquidity: u128,
    rounding: Rounding,
) -> DefenseResult<u64> {
    let (lo, hi) = sorted(sqrt_ratio_a_x64, sqrt_ratio_b_x64)?;
    // amount0 = liquidity * Q64 * (hi - lo) / (lo * hi), in two muldiv steps
    let scaled = mul_div(liquidity, Q64, lo, rounding)?;
    let amount = mul_div(scaled, hi - lo, hi, rounding)?;
    u64::try_from(amount).map_err(|_| DefenseError::ConversionError)
}

/// Token1 owed for `liquidity` over a sqrt-price interval
pub fn amount_1_delta(
    sqrt_ratio_a_x64: u128,
    sqrt_ratio_b_x64: u128,
    liquidity: u128,
    rounding: Rounding,
) -> DefenseResult<u64> {
    let (lo, hi) = sorted(sqrt_ratio_a_x64, sqrt_ratio_b_x64)?;
    let amount = mul_div(liquidity, hi - lo, Q64, rounding)?;
    u64::try_from(amount).map_err(|_| DefenseError::ConversionError)
}

/// Token amounts represented by `liquidity` over a range at the current price
pub fn amounts_for_liquidity(
    sqrt_price_x64: u128,
    sqrt_ratio_a_x64: u128,
    sqrt_ratio_b_x64: u128,
    liquidity: u128,
    rounding: Rounding,
) -> DefenseResult<(u64, u64)> {
    let (lo, hi) = sorted(sqrt_ratio_a_x64, sqrt_ratio_b_x64)?;

    if sqrt_price_x64 <= lo {
        Ok((amount_0_delta(lo, hi, liquidity, rounding)?, 0))
    } else if sqrt_price_x64 < hi {
        Ok((
            amount_0_delta(sqrt_price_x64, hi, liquidity, rounding)?,
            amount_1_delta(lo, sqrt_price_x64, liquidity, rounding)?,
        ))
    } else {
        Ok((0, amount_1_delta(lo, hi, liquidity, rounding)?))
    }
}

/// Maximum liquidity whose round-up deposit amounts fit within the funding,
/// returned together with those amounts.
///
/// `liquidity_for_amounts` sizes with round-down division, so recomputing
/// the deposit with `Rounding::Up` can demand one token more than the
/// funding on the token0 side (two chained round-up steps). Scale liquidity
/// down to the binding side until the round-up amounts fit; the overshoot
/// is a few token units at most, so this settles within two passes.
pub fn liquidity_fitting_amounts(
    sqrt_price_x64: u128,
    sqrt_ratio_a_x64: u128,
    sqrt_ratio_b_x64: u128,
    amount0: u64,
    amount1: u64,
) -> DefenseResult<(u128, u64, u64)> {
    let mut liquidity = liquidity_for_amounts(
        sqrt_price_x64,
        sqrt_ratio_a_x64,
        sqrt_ratio_b_x64,
        amount0,
        amount1,
    )?;
    while liquidity > 0 {
        let (need0, need1) = amounts_for_liquidity(
            sqrt_price_x64,
            sqrt_ratio_a_x64,
            sqrt_ratio_b_x64,
            liquidity,
            Rounding::Up,
        )?;
        if need0 <= amount0 && need1 <= amount1 {
            return Ok((liquidity, need0, need1));
        }
        let scaled0 = if need0 > amount0 {
            mul_div(liquidity, amount0 as u128, need0 as u128, Rounding::Down)?
        } else {
            liquidity
        };
        let scaled1 = if need1 > amount1 {
            mul_div(liquidity, amount1 as u128, need1 as u128, Rounding::Down)?
        } else {
            liquidity
        };
        let next = scaled0.min(scaled1);
        // mul_div floors a product strictly below liquidity, so this always
        // decreases and the loop terminates.
        liquidity = if next < liquidity { next } else { liquidity - 1 };
    }
    Ok((0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::tick::sqrt_price_x64_at_tick;

    #[test]
    fn single_sided_below_peg_range() {
        // Buffer-style range entirely below the current price holds token1.
        let lo = sqrt_price_x64_at_tick(-120).unwrap();
        let hi = sqrt_price_x64_at_tick(-60).unwrap();
        let price = sqrt_price_x64_at_tick(-20).unwrap();

        let liquidity = liquidity_for_amounts(price, lo, hi, 0, 1_000_000).unwrap();
        assert_eq!(liquidity, 334_853_254);

        let (amount0, amount1) =
            amounts_for_liquidity(price, lo, hi, liquidity, Rounding::Up).unwrap();
        assert_eq!(amount0, 0);
        assert_eq!(amount1, 1_000_000);

        // Withdrawal rounds down and never returns more than was deposited.
        let (_, withdrawn) =
            amounts_for_liquidity(price, lo, hi, liquidity, Rounding::Down).unwrap();
        assert_eq!(withdrawn, 999_999);
    }

    #[test]
    fn in_range_position_takes_binding_minimum() {
        let lo = sqrt_price_x64_at_tick(-10).unwrap();
        let hi = sqrt_price_x64_at_tick(10).unwrap();
        let price = sqrt_price_x64_at_tick(0).unwrap();

        let liquidity = liquidity_for_amounts(price, lo, hi, 500_000, 500_000).unwrap();
        assert_eq!(liquidity, 1_000_300_019);

        let (amount0, amount1) =
            amounts_for_liquidity(price, lo, hi, liquidity, Rounding::Up).unwrap();
        assert_eq!((amount0, amount1), (500_000, 500_000));
    }

    #[test]
    fn mint_never_exceeds_funding() {
        let lo = sqrt_price_x64_at_tick(-120).unwrap();
        let hi = sqrt_price_x64_at_tick(-60).unwrap();

        // Price above, inside, at the edges of, and below the range: the
        // fitted deposit must never exceed the funding on either side.
        for tick in [-20, -60, -90, -120, -160, -443_000] {
            let price = sqrt_price_x64_at_tick(tick).unwrap();
            for funding in [1u64, 17, 999, 12_345, 123_456, 10_000_000] {
                let (liquidity, need0, need1) =
                    liquidity_fitting_amounts(price, lo, hi, funding, funding).unwrap();
                assert!(need0 <= funding, "tick {tick} funding {funding}: token0 exceeded");
                assert!(need1 <= funding, "tick {tick} funding {funding}: token1 exceeded");
                let (check0, check1) =
                    amounts_for_liquidity(price, lo, hi, liquidity, Rounding::Up).unwrap();
                assert_eq!((check0, check1), (need0, need1));
            }
        }
    }

    #[test]
    fn fitted_liquidity_respects_token0_round_up() {
        let lo = sqrt_price_x64_at_tick(-120).unwrap();
        let hi = sqrt_price_x64_at_tick(-60).unwrap();

        // Price below the range: token0 single-sided. Naive sizing demands
        // 1_000_001 for 1_000_000 of funding; the fitted figure does not.
        let price = sqrt_price_x64_at_tick(-160).unwrap();
        let naive = liquidity_for_amounts(price, lo, hi, 1_000_000, 0).unwrap();
        assert_eq!(naive, 331_853_245);
        let (need0, _) = amounts_for_liquidity(price, lo, hi, naive, Rounding::Up).unwrap();
        assert_eq!(need0, 1_000_001);

        let (liquidity, need0, need1) =
            liquidity_fitting_amounts(price, lo, hi, 1_000_000, 0).unwrap();
        assert_eq!(liquidity, 331_852_913);
        assert_eq!((need0, need1), (1_000_000, 0));

        // In-range: both sides bind.
        let price = sqrt_price_x64_at_tick(-90).unwrap();
        let (liquidity, need0, need1) =
            liquidity_fitting_amounts(price, lo, hi, 12_345, 12_345).unwrap();
        assert_eq!(liquidity, 8_198_941);
        assert_eq!((need0, need1), (12_344, 12_234));

        // Above the range the round trip was already exact; fitting must
        // not change it.
        let price = sqrt_price_x64_at_tick(-20).unwrap();
        let (liquidity, need0, need1) =
            liquidity_fitting_amounts(price, lo, hi, 0, 1_000_000).unwrap();
        assert_eq!(liquidity, 334_853_254);
        assert_eq!((need0, need1), (0, 1_000_000));
    }

    #[test]
    fn fitting_with_no_usable_funding_returns_zero() {
        let lo = sqrt_price_x64_at_tick(-120).unwrap();
        let hi = sqrt_price_x64_at_tick(-60).unwrap();
        // In-range position with one side empty cannot mint.
        let price = sqrt_price_x64_at_tick(-90).unwrap();
        assert_eq!(
            liquidity_fitting_amounts(price, lo, hi, 0, 1_000_000).unwrap(),
            (0, 0, 0)
        );
    }

    #[test]
    fn degenerate_interval_rejected() {
        let p = sqrt_price_x64_at_tick(0).unwrap();
        assert_eq!(
            liquidity_for_amount_1(p, p, 1000),
            Err(DefenseError::DivisionByZero)
        );
    }
}
