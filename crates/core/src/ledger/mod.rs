//! Record stores exclusively owned by the defense core.

pub mod position;
pub mod treasury;

pub use position::{PositionLedger, PositionMeta};
pub use treasury::TreasuryLedger;
