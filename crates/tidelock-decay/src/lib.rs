//! # tidelock-decay: decaying lock aggregates.
//!
//! All calculations use integer arithmetic only.
//!
//! - **Ring buffer**: [`DecayBuckets`] keeps principal in 24 slots keyed by
//!   months remaining and rolls forward lazily, so `total_locked` and the
//!   boosted total decay without iterating over lock holders.
//! - **Lock ledger**: [`LockLedger`] holds one `{amount, end_month}` per
//!   account and plans every change before it is committed.

pub mod buckets;
pub mod ledger;

pub use buckets::DecayBuckets;
pub use ledger::{lock_boosted_units, LockChange, LockLedger};
