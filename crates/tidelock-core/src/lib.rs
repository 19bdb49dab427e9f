//! # tidelock-core
//! Foundation types, boost schedule, month clock and collaborator traits
//! for the Tidelock locking engine.

pub mod boost;
pub mod clock;
pub mod constants;
pub mod error;
pub mod ledger;
pub mod traits;
pub mod types;
