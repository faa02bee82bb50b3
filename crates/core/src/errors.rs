//! # Core Error Types
//!
//! One taxonomy for the whole defense core: configuration errors (rejected
//! at write time), precondition errors (expected and recoverable, no state
//! change), resource errors (recoverable by funding the treasury),
//! authorization errors, and external pool failures (which unwind the whole
//! operation).

use thiserror::Error;

use crate::pool::{PoolError, PoolOp};

/// Errors produced by the defense core
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefenseError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    #[error("invalid tick range [{lower}, {upper}]")]
    InvalidRange { lower: i32, upper: i32 },

    #[error("range not aligned to tick spacing {spacing}")]
    UnalignedRange { spacing: i32 },

    #[error("invalid thresholds: escalate {escalate} must be below deescalate {deescalate}")]
    InvalidThresholds { escalate: i32, deescalate: i32 },

    #[error("invalid fee configuration: {0}")]
    InvalidFeeConfig(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ========================================================================
    // Precondition Errors
    // ========================================================================
    #[error("cooldown active, next eligible at {next_eligible}")]
    CooldownActive { next_eligible: i64 },

    #[error("regime unchanged, nothing to rebalance")]
    NoRegimeChange,

    #[error("buffer position already active")]
    BufferAlreadyActive,

    #[error("no active buffer position")]
    BufferNotActive,

    #[error("core position already initialized")]
    AlreadyInitialized,

    #[error("core position not initialized")]
    NotInitialized,

    #[error("core range is locked after initialization")]
    CoreRangeLocked,

    #[error("reentrant call rejected")]
    ReentrantCall,

    // ========================================================================
    // Resource Errors
    // ========================================================================
    #[error("insufficient defense capital in treasury")]
    InsufficientDefenseCapital,

    #[error("insufficient treasury funds")]
    InsufficientFunds,

    // ========================================================================
    // Authorization Errors
    // ========================================================================
    #[error("caller is not authorized")]
    NotAuthorized,

    #[error("pool operation not permitted: {0:?}")]
    OperationNotPermitted(PoolOp),

    // ========================================================================
    // Math Errors
    // ========================================================================
    #[error("math overflow")]
    MathOverflow,

    #[error("division by zero")]
    DivisionByZero,

    #[error("tick out of range")]
    InvalidTick,

    #[error("conversion error")]
    ConversionError,

    // ========================================================================
    // External Errors
    // ========================================================================
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Result type using core errors
pub type DefenseResult<T> = Result<T, DefenseError>;
