//! # tidelock-engine
//!
//! The locking engine ([`Locking`]) over pluggable token and access-control
//! collaborators, together with its configuration ([`EngineConfig`]),
//! emitted events ([`LockEvent`]) and snapshot persistence
//! ([`SnapshotStore`]).

pub mod config;
pub mod events;
pub mod locking;
pub mod state;
pub mod storage;

pub use config::{ConfigError, EngineConfig};
pub use events::LockEvent;
pub use locking::{Locking, PenaltyReceipt};
pub use state::LockingState;
pub use storage::SnapshotStore;
