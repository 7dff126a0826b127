use std::path::Path;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::DownloadError;
use crate::service::{DownloadService, DownloadTier, ProgressCallback};

/// The download contract as consumed by the lifecycle manager: fetch a
/// version's install archive to `destination`, reporting progress and
/// honoring cooperative cancellation.
#[async_trait]
pub trait VersionFetcher: Send + Sync {
    async fn download(
        &self,
        uuid: &str,
        tier: DownloadTier,
        destination: &Path,
        progress: ProgressCallback<'_>,
        cancel: &CancellationToken,
    ) -> Result<(), DownloadError>;
}

#[async_trait]
impl VersionFetcher for DownloadService {
    async fn download(
        &self,
        uuid: &str,
        tier: DownloadTier,
        destination: &Path,
        progress: ProgressCallback<'_>,
        cancel: &CancellationToken,
    ) -> Result<(), DownloadError> {
        DownloadService::download(self, uuid, tier, destination, progress, cancel).await
    }
}
