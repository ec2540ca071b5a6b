use crate::domain::snapshot::AnalysisSnapshot;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Well-known key the latest snapshot is saved under.
pub const SESSION_KEY: &str = "fhat.latestAnalysis";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    key: String,
    committed_at: DateTime<Utc>,
    snapshot: AnalysisSnapshot,
}

/// Session-scoped JSON file holding the latest snapshot. The file lives as
/// long as the session directory does; nothing here deletes it.
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{SESSION_KEY}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> anyhow::Result<Option<AnalysisSnapshot>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", self.path.display()))
            }
        };

        let envelope = serde_json::from_str::<Envelope>(&text)
            .with_context(|| format!("session file {} is not a snapshot", self.path.display()))?;
        anyhow::ensure!(
            envelope.key == SESSION_KEY,
            "session file key mismatch: expected {SESSION_KEY}, got {}",
            envelope.key
        );
        Ok(Some(envelope.snapshot))
    }

    pub fn save(&self, snapshot: &AnalysisSnapshot) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create session dir {}", dir.display()))?;
        }

        let envelope = Envelope {
            key: SESSION_KEY.to_string(),
            committed_at: Utc::now(),
            snapshot: snapshot.clone(),
        };
        let json = serde_json::to_vec(&envelope).context("failed to serialize snapshot")?;

        // Write then rename so a reader never sees a half-written file.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }

    /// Deletes the file, then the session directory if nothing else is in it.
    pub fn remove(&self) -> anyhow::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("failed to remove {}", self.path.display()))
            }
        }
        if let Some(dir) = self.path.parent() {
            let _ = std::fs::remove_dir(dir);
        }
        Ok(())
    }
}
