//! Snapshot persistence for [`LockingState`] and anything stored alongside it.
//!
//! # File format
//! ```text
//! magic (4 bytes "TDLK") || version (4 bytes LE) || bincode(value)
//! ```
//! Writes go to a sibling temp file which is then renamed over the target,
//! so a crash never leaves a half-written snapshot.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use tidelock_core::error::TideError;

const SNAPSHOT_MAGIC: &[u8; 4] = b"TDLK";
const SNAPSHOT_VERSION: u32 = 1;
const HEADER_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot, or `Ok(None)` if none has been written yet.
    ///
    /// # Errors
    ///
    /// [`TideError::Storage`] if the file cannot be read or is not a valid
    /// snapshot.
    pub fn load<T: bincode::Decode<()>>(&self) -> Result<Option<T>, TideError> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(TideError::Storage(format!("read {}: {e}", self.path.display()))),
        };
        if data.len() < HEADER_LEN {
            return Err(TideError::Storage("snapshot too short".into()));
        }
        if &data[..4] != SNAPSHOT_MAGIC {
            return Err(TideError::Storage("invalid snapshot magic".into()));
        }
        let mut version = [0u8; 4];
        version.copy_from_slice(&data[4..HEADER_LEN]);
        let version = u32::from_le_bytes(version);
        if version != SNAPSHOT_VERSION {
            return Err(TideError::Storage(format!("unsupported snapshot version: {version}")));
        }

        let (value, _) = bincode::decode_from_slice(&data[HEADER_LEN..], bincode::config::standard())
            .map_err(|e| TideError::Storage(format!("invalid snapshot payload: {e}")))?;
        debug!(path = %self.path.display(), bytes = data.len(), "loaded snapshot");
        Ok(Some(value))
    }

    /// Atomically replace the snapshot with `value`.
    ///
    /// # Errors
    ///
    /// [`TideError::Storage`] on encoding or filesystem failure.
    pub fn save<T: bincode::Encode>(&self, value: &T) -> Result<(), TideError> {
        let payload = bincode::encode_to_vec(value, bincode::config::standard())
            .map_err(|e| TideError::Storage(format!("encode snapshot: {e}")))?;
        let mut data = Vec::with_capacity(HEADER_LEN + payload.len());
        data.extend_from_slice(SNAPSHOT_MAGIC);
        data.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
        data.extend_from_slice(&payload);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| TideError::Storage(format!("create {}: {e}", parent.display())))?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &data).map_err(|e| TideError::Storage(format!("write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| TideError::Storage(format!("rename to {}: {e}", self.path.display())))?;
        debug!(path = %self.path.display(), bytes = data.len(), "saved snapshot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidelock_core::ledger::MemoryLedger;
    use tidelock_core::types::Address;

    use crate::state::LockingState;

    fn sample_state() -> LockingState {
        let mut state = LockingState::default();
        let account = Address::from_label("bob");
        let change = state.locks.plan_lock(&account, 1_000, 12, 0).unwrap();
        change.apply_to(&mut state.buckets).unwrap();
        state.locks.apply(&change);
        state
    }

    #[test]
    fn missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("state.bin"));
        assert!(store.load::<LockingState>().unwrap().is_none());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("nested").join("state.bin"));
        let state = sample_state();
        store.save(&state).unwrap();
        assert_eq!(store.load::<LockingState>().unwrap(), Some(state));
        assert!(!dir.path().join("nested").join("state.tmp").exists());
    }

    #[test]
    fn save_overwrites_previous() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("state.bin"));
        store.save(&LockingState::default()).unwrap();
        let state = sample_state();
        store.save(&state).unwrap();
        assert_eq!(store.load::<LockingState>().unwrap(), Some(state));
    }

    #[test]
    fn stores_state_with_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("sim.bin"));
        let mut ledger = MemoryLedger::new(Address::from_label("custody"));
        ledger.mint(&Address::from_label("token"), &Address::from_label("bob"), 42).unwrap();
        let snapshot = (sample_state(), ledger);
        store.save(&snapshot).unwrap();
        assert_eq!(store.load::<(LockingState, MemoryLedger)>().unwrap(), Some(snapshot));
    }

    #[test]
    fn corrupted_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.bin");
        let store = SnapshotStore::new(&path);

        std::fs::write(&path, b"garbage").unwrap();
        assert!(matches!(store.load::<LockingState>(), Err(TideError::Storage(_))));

        std::fs::write(&path, b"TDLK\x02\x00\x00\x00").unwrap();
        let err = store.load::<LockingState>().unwrap_err();
        assert!(err.to_string().contains("unsupported snapshot version"));

        std::fs::write(&path, b"TDLK\x01\x00\x00\x00\xff").unwrap();
        assert!(matches!(store.load::<LockingState>(), Err(TideError::Storage(_))));
    }
}
