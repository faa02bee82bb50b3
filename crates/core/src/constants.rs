//! # Protocol Constants
//!
//! Fundamental constants for the peg defense core:
//! - Fixed-point scale factors (Q64)
//! - Tick and sqrt-price bounds
//! - Fee curve defaults
//! - Cooldown defaults

// ============================================================================
// Mathematical Constants
// ============================================================================

/// Q64 fixed-point scale factor: 2^64
pub const Q64: u128 = 1u128 << 64;

/// Basis points denominator (10,000 = 100%)
pub const BPS_DENOMINATOR: u64 = 10_000;

// ============================================================================
// Tick Space Constants
// ============================================================================

/// Minimum tick supported by the Q64 sqrt-price encoding
pub const MIN_TICK: i32 = -443_636;

/// Maximum tick supported by the Q64 sqrt-price encoding
pub const MAX_TICK: i32 = 443_636;

/// Sqrt price at MIN_TICK in Q64 format
pub const MIN_SQRT_PRICE_X64: u128 = 4_295_048_016;

/// Sqrt price at MAX_TICK in Q64 format
pub const MAX_SQRT_PRICE_X64: u128 = 79_226_673_515_399_013_880_257_568_879;

// ============================================================================
// Fee Curve Defaults
// ============================================================================

/// Default base fee at the peg (0.3%)
pub const DEFAULT_BASE_FEE_BPS: u64 = 30;

/// Default fee floor for toward-peg trades (0.05%)
pub const DEFAULT_MIN_FEE_BPS: u64 = 5;

/// Default fee ceiling for away-from-peg trades (10%)
pub const DEFAULT_MAX_FEE_BPS: u64 = 1_000;

/// Default dead zone around the peg where the base fee applies regardless
/// of direction
pub const DEFAULT_DEAD_ZONE_TICKS: u32 = 5;

/// Default penalty slope for away-from-peg trades (bps per tick of excess
/// deviation)
pub const DEFAULT_AWAY_SLOPE_BPS_PER_TICK: u64 = 5;

/// Default reward slope numerator for toward-peg trades. With the default
/// denominator this is 5/8 bps per tick, 8x shallower than the penalty slope.
pub const DEFAULT_TOWARD_SLOPE_NUM: u64 = 5;

/// Default reward slope denominator for toward-peg trades
pub const DEFAULT_TOWARD_SLOPE_DEN: u64 = 8;

// ============================================================================
// Rebalance Defaults
// ============================================================================

/// Default minimum seconds between successive rebalance actions
pub const DEFAULT_COOLDOWN_SECS: i64 = 300;
