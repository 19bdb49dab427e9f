//! Scenario test suite for Tidelock.
//!
//! Integration tests drive the public engine API the way a caller would:
//! timestamps in seconds, tokens minted into an in-memory ledger, owner
//! calls through a single-owner access control. Every observable property
//! is checked through views and ledger balances only.

pub mod helpers;
