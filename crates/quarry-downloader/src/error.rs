use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    /// The catalog identifier resolved to no valid download link.
    #[error("no download link is available for this version")]
    NoDownloadLink,

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("failed to resolve update identity: {0}")]
    Identity(String),

    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Cooperative cancellation; never surfaced as an error dialog.
    #[error("download cancelled")]
    Cancelled,
}
