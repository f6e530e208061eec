//! On-disk checkpoint for the pull batch.
//!
//! The checkpoint is a single JSON file holding the fetched taxonomy and the
//! last completed index per level. Its presence means a batch is in progress;
//! its absence means the next run starts fresh.
//!
//! Writes go to a sibling temp file which is then renamed over the target, so
//! a crash mid-write leaves the previous checkpoint intact.

use std::fs::File;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use recipepull_shared::{RecipePullError, Result, TraversalProgress};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Current on-disk schema version. Bump when [`TraversalProgress`] changes shape.
pub const CURRENT_CHECKPOINT_VERSION: u32 = 1;

/// The full on-disk record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub schema_version: u32,
    pub saved_at: DateTime<Utc>,
    pub progress: TraversalProgress,
}

/// Read ahead of the full decode so an unknown version gets a clear error
/// rather than a field mismatch.
#[derive(Deserialize)]
struct VersionProbe {
    schema_version: Option<u32>,
}

// ---------------------------------------------------------------------------
// CheckpointStore
// ---------------------------------------------------------------------------

/// Reads and writes the checkpoint file. Holds no copy of the progress.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when a checkpoint file is present.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load the saved progress. `Ok(None)` means no batch is in progress.
    pub fn load(&self) -> Result<Option<TraversalProgress>> {
        Ok(self.load_checkpoint()?.map(|c| c.progress))
    }

    /// Load the full record, including its version and save time.
    pub fn load_checkpoint(&self) -> Result<Option<Checkpoint>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no checkpoint found");
                return Ok(None);
            }
            Err(e) => {
                return Err(RecipePullError::checkpoint_load(&self.path, e.to_string()));
            }
        };

        let probe: VersionProbe = serde_json::from_str(&content)
            .map_err(|e| RecipePullError::checkpoint_load(&self.path, e.to_string()))?;

        match probe.schema_version {
            Some(CURRENT_CHECKPOINT_VERSION) => {}
            Some(other) => {
                return Err(RecipePullError::checkpoint_load(
                    &self.path,
                    format!(
                        "schema_version {other} not supported (expected {CURRENT_CHECKPOINT_VERSION})"
                    ),
                ));
            }
            None => {
                return Err(RecipePullError::checkpoint_load(
                    &self.path,
                    "missing schema_version",
                ));
            }
        }

        let checkpoint: Checkpoint = serde_json::from_str(&content)
            .map_err(|e| RecipePullError::checkpoint_load(&self.path, e.to_string()))?;
        checkpoint
            .progress
            .validate()
            .map_err(|e| RecipePullError::checkpoint_load(&self.path, e.to_string()))?;

        debug!(
            path = %self.path.display(),
            saved_at = %checkpoint.saved_at,
            "checkpoint loaded"
        );

        Ok(Some(checkpoint))
    }

    /// Durably replace the checkpoint with `progress`.
    pub fn save(&self, progress: &TraversalProgress) -> Result<()> {
        let checkpoint = Checkpoint {
            schema_version: CURRENT_CHECKPOINT_VERSION,
            saved_at: Utc::now(),
            progress: progress.clone(),
        };

        let json = serde_json::to_vec_pretty(&checkpoint)
            .map_err(|e| RecipePullError::checkpoint_save(&self.path, std::io::Error::other(e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| RecipePullError::checkpoint_save(parent, e))?;
        }

        let temp = self.temp_path();
        write_synced(&temp, &json).map_err(|e| RecipePullError::checkpoint_save(&temp, e))?;

        // Atomic rename
        std::fs::rename(&temp, &self.path)
            .map_err(|e| RecipePullError::checkpoint_save(&self.path, e))?;
        let dir = self.parent_dir();
        sync_dir(dir).map_err(|e| RecipePullError::checkpoint_save(dir, e))?;

        debug!(path = %self.path.display(), bytes = json.len(), "checkpoint saved");
        Ok(())
    }

    /// Remove the checkpoint. Returns whether a file was actually removed.
    pub fn delete(&self) -> Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "checkpoint removed");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(RecipePullError::checkpoint_save(&self.path, e)),
        }
    }

    /// Directory holding the checkpoint; `.` for a bare file name.
    fn parent_dir(&self) -> &Path {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }

    /// `.{file_name}.tmp` next to the checkpoint, so the rename stays on one filesystem.
    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "checkpoint".into());
        self.path.with_file_name(format!(".{file_name}.tmp"))
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Flush the directory entry so the rename survives a power loss.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
