//! Integer-only fixed-point math for tick, price, and liquidity conversions.

pub mod liquidity;
pub mod muldiv;
pub mod tick;

pub use muldiv::{mul_div, Rounding};
