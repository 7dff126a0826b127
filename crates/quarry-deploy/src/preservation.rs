use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::error::DeployError;
use crate::fs_utils::{move_dir_or_copy, move_file_or_copy};

/// Decision hook for restore conflicts. `true` replaces the destination
/// with the backed-up copy; `false` keeps the destination (the backed-up
/// copy is lost when the backup directory is deleted).
pub trait OverwritePrompt: Send + Sync {
    fn should_replace(&self, destination: &Path) -> bool;
}

/// Moves the game's private data folder aside before a package removal
/// and merges it back after the fresh registration.
///
/// The backup location is a fixed, process-wide singleton: finding it
/// already occupied means an earlier backup was never restored, and the
/// only safe reaction is to stop.
pub struct DataPreservation {
    backup_dir: PathBuf,
    prompt: Arc<dyn OverwritePrompt>,
}

impl DataPreservation {
    pub fn new(backup_dir: PathBuf, prompt: Arc<dyn OverwritePrompt>) -> Self {
        Self { backup_dir, prompt }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn backup_before_removal(&self, data_dir: &Path) -> Result<(), DeployError> {
        if self.backup_dir.exists() {
            warn!(
                "data backup target {} already exists",
                self.backup_dir.display()
            );
            return Err(DeployError::BackupConflict(self.backup_dir.clone()));
        }
        if !data_dir.exists() {
            debug!(
                "no private data at {}; nothing to back up",
                data_dir.display()
            );
            return Ok(());
        }

        debug!(
            "moving private data {} to {}",
            data_dir.display(),
            self.backup_dir.display()
        );
        move_dir_or_copy(data_dir, &self.backup_dir).map_err(DeployError::Preservation)
    }

    /// Merge a pending backup into the (fresh) private data folder, then
    /// delete the backup. No-op when nothing was backed up.
    pub fn restore_after_reinstall(&self, data_dir: &Path) -> Result<(), DeployError> {
        if !self.backup_dir.exists() {
            return Ok(());
        }

        debug!(
            "restoring private data backup into {}",
            data_dir.display()
        );
        self.restore_into(data_dir).map_err(DeployError::Preservation)
    }

    fn restore_into(&self, data_dir: &Path) -> Result<()> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;
        self.restore_move(&self.backup_dir, data_dir)?;
        fs::remove_dir_all(&self.backup_dir).with_context(|| {
            format!(
                "failed to remove restored backup: {}",
                self.backup_dir.display()
            )
        })?;
        Ok(())
    }

    fn restore_move(&self, from: &Path, to: &Path) -> Result<()> {
        for entry in
            fs::read_dir(from).with_context(|| format!("failed to read {}", from.display()))?
        {
            let entry = entry?;
            let src = entry.path();
            let dst = to.join(entry.file_name());

            if entry.file_type()?.is_dir() {
                if !dst.is_dir() {
                    if dst.is_file() {
                        if !self.prompt.should_replace(&dst) {
                            continue;
                        }
                        fs::remove_file(&dst)
                            .with_context(|| format!("failed to remove {}", dst.display()))?;
                    }
                    fs::create_dir_all(&dst)
                        .with_context(|| format!("failed to create {}", dst.display()))?;
                }
                self.restore_move(&src, &dst)?;
                continue;
            }

            if dst.exists() {
                if !self.prompt.should_replace(&dst) {
                    continue;
                }
                fs::remove_file(&dst)
                    .with_context(|| format!("failed to remove {}", dst.display()))?;
            }
            move_file_or_copy(&src, &dst)?;
        }
        Ok(())
    }
}
