use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("package registration failed: {0}")]
    Registration(String),

    #[error("package removal failed: {0}")]
    Removal(String),

    /// A previous backup was never restored. The operation must stop
    /// without touching either copy; the operator resolves the conflict
    /// manually.
    #[error("a previous data backup already exists at {}; back it up manually before retrying", .0.display())]
    BackupConflict(PathBuf),

    #[error("data preservation failed: {0:#}")]
    Preservation(anyhow::Error),
}
