//! # tidelock-rewards
//!
//! Reward programs that release a fixed emission per month and split it
//! across accounts by boosted power.
//!
//! - [`program`]: per-month emissions, accrued rates and recovery flags.
//! - [`checkpoint`]: per-account settlement against those rates.
//! - [`book`]: all programs and checkpoints, with plan/apply mutations.

pub mod book;
pub mod checkpoint;
pub mod program;

pub use book::{units_at, RewardBook};
pub use checkpoint::{owed_between, UserCheckpoint};
pub use program::{MonthSlot, Recovery, RewardProgram};
