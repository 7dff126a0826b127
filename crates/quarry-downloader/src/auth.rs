use anyhow::Result;
use async_trait::async_trait;

/// Credential obtained by the authenticated downloader's login handshake.
#[derive(Debug, Clone)]
pub struct AuthToken {
    pub token: String,
}

/// Performs the account login the authenticated download tier requires.
/// The service calls this at most once per process (see
/// `DownloadService`); providers do not need to memoize.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn login(&self) -> Result<AuthToken>;
}
