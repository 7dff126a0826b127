use anyhow::Result;
use async_trait::async_trait;

use crate::auth::AuthToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadLink {
    pub url: String,
}

/// Maps a version's catalog identifier to a downloadable identity.
///
/// `Ok(None)` means the identifier yielded no valid download link — a
/// distinct outcome from a network failure, because the caller renders a
/// tier-specific hint for it (e.g. missing beta enrollment).
#[async_trait]
pub trait UpdateIdentityResolver: Send + Sync {
    async fn resolve(
        &self,
        uuid: &str,
        revision: &str,
        auth: Option<&AuthToken>,
    ) -> Result<Option<DownloadLink>>;
}
