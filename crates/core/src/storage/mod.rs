//! Session-scoped holder of the latest analysis.
//!
//! Created empty at session start, overwritten on each successful analysis,
//! read by any number of presentation passes, cleared by [`SnapshotStore::end_session`].

pub mod session;

use crate::domain::snapshot::AnalysisSnapshot;
use session::SessionFile;
use std::path::Path;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

static SESSION_STORE: OnceLock<Arc<SnapshotStore>> = OnceLock::new();

#[derive(Debug, Default)]
pub struct SnapshotStore {
    latest: RwLock<Option<Arc<AnalysisSnapshot>>>,
    file: Option<SessionFile>,
}

impl SnapshotStore {
    /// A store with no backing file.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// A store backed by `dir`, restoring whatever the session last committed.
    pub fn open_session(dir: impl AsRef<Path>) -> Self {
        let file = SessionFile::in_dir(dir);
        let restored = match file.load() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(path = %file.path().display(), error = %err, "ignoring unreadable session snapshot");
                None
            }
        };
        if restored.is_some() {
            tracing::info!(path = %file.path().display(), "restored session snapshot");
        }

        Self {
            latest: RwLock::new(restored.map(Arc::new)),
            file: Some(file),
        }
    }

    /// The process-wide store. The first call fixes the session directory;
    /// later calls return the same instance.
    pub fn session(dir: impl AsRef<Path>) -> Arc<SnapshotStore> {
        SESSION_STORE
            .get_or_init(|| Arc::new(SnapshotStore::open_session(dir)))
            .clone()
    }

    /// Last write wins. A failed session-file write is logged; the in-memory
    /// value is still replaced.
    pub fn commit(&self, snapshot: AnalysisSnapshot) {
        if let Some(file) = &self.file {
            if let Err(err) = file.save(&snapshot) {
                tracing::warn!(path = %file.path().display(), error = %err, "failed to persist session snapshot");
            }
        }
        let mut latest = self.latest.write().unwrap_or_else(PoisonError::into_inner);
        *latest = Some(Arc::new(snapshot));
    }

    pub fn latest(&self) -> Option<Arc<AnalysisSnapshot>> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drops the held snapshot and deletes the session file.
    pub fn end_session(&self) {
        *self.latest.write().unwrap_or_else(PoisonError::into_inner) = None;
        if let Some(file) = &self.file {
            match file.remove() {
                Ok(()) => tracing::info!(path = %file.path().display(), "session ended"),
                Err(err) => {
                    tracing::warn!(path = %file.path().display(), error = %err, "failed to remove session snapshot")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::normalize;
    use serde_json::json;
    use std::path::PathBuf;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("fhat-store-test-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn starts_empty_and_keeps_the_last_commit() {
        let store = SnapshotStore::in_memory();
        assert!(store.latest().is_none());

        store.commit(normalize(&json!({"risk": {"score": 610}})));
        store.commit(normalize(&json!({"risk": {"score": 820}})));
        assert_eq!(store.latest().unwrap().risk.score, 820.0);
        // Reads do not consume.
        assert_eq!(store.latest().unwrap().risk.score, 820.0);
    }

    #[test]
    fn session_file_survives_a_reload() {
        let dir = scratch_dir();
        let snapshot = normalize(&json!({
            "risk": {"score": 700, "category": "Medium Risk"},
            "warnings": [{"type": "Debt", "severity": "High", "message": "Leverage"}],
            "productRecommendations": {"recommendedProduct": "Term Loan", "reason": "ok"},
        }));

        SnapshotStore::open_session(&dir).commit(snapshot.clone());
        let reloaded = SnapshotStore::open_session(&dir);
        assert_eq!(reloaded.latest().as_deref(), Some(&snapshot));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn corrupt_session_file_is_ignored() {
        let dir = scratch_dir();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(SessionFile::in_dir(&dir).path(), "{not json").unwrap();

        let store = SnapshotStore::open_session(&dir);
        assert!(store.latest().is_none());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn ended_session_does_not_come_back() {
        let dir = scratch_dir();
        let store = SnapshotStore::open_session(&dir);
        store.commit(normalize(&json!({"risk": {"score": 700}})));
        assert!(SessionFile::in_dir(&dir).path().exists());

        store.end_session();
        assert!(store.latest().is_none());
        assert!(!dir.exists());
        assert!(SnapshotStore::open_session(&dir).latest().is_none());
    }

    #[test]
    fn missing_session_dir_starts_empty() {
        let store = SnapshotStore::open_session(scratch_dir());
        assert!(store.latest().is_none());
    }
}
