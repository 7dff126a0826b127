use std::path::PathBuf;

use thiserror::Error;

use quarry_deploy::{DeployError, ExtractError};
use quarry_downloader::DownloadError;

/// Everything a lifecycle operation can fail with. Each operation is an
/// error boundary: one of these is logged, surfaced once, and the entry
/// returns to idle.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("no download link is available for this version")]
    NoDownloadLink,

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("network failure: {0}")]
    Network(String),

    /// Logged, never shown as an error.
    #[error("download cancelled")]
    Cancelled,

    #[error("archive is corrupt or not a valid package: {0}")]
    ExtractionCorrupt(String),

    #[error("package re-registration failed: {0}")]
    Registration(String),

    #[error("package removal failed: {0}")]
    Removal(String),

    /// Halts without compensating cleanup; the operator resolves the
    /// conflict manually.
    #[error("a previous data backup already exists at {}; back it up manually before retrying", .0.display())]
    BackupConflict(PathBuf),

    #[error("launch failed: {0}")]
    Launch(String),

    #[error("{0:#}")]
    Other(#[from] anyhow::Error),
}

impl From<DownloadError> for LifecycleError {
    fn from(err: DownloadError) -> Self {
        match err {
            DownloadError::NoDownloadLink => Self::NoDownloadLink,
            DownloadError::Authentication(message) => Self::Authentication(message),
            DownloadError::Identity(message) => Self::Network(message),
            DownloadError::Network(err) => Self::Network(err.to_string()),
            DownloadError::Io(err) => Self::Network(err.to_string()),
            DownloadError::Cancelled => Self::Cancelled,
        }
    }
}

impl From<DeployError> for LifecycleError {
    fn from(err: DeployError) -> Self {
        match err {
            DeployError::Registration(message) => Self::Registration(message),
            DeployError::Removal(message) => Self::Removal(message),
            DeployError::BackupConflict(path) => Self::BackupConflict(path),
            DeployError::Preservation(err) => Self::Other(err),
        }
    }
}

impl From<ExtractError> for LifecycleError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::Corrupt(message) => Self::ExtractionCorrupt(message),
            ExtractError::Io(err) => {
                Self::Other(anyhow::Error::new(err).context("extraction failed"))
            }
        }
    }
}
