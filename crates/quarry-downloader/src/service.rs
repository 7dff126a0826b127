use std::path::Path;
use std::sync::Arc;

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::{AuthProvider, AuthToken};
use crate::error::DownloadError;
use crate::resolver::UpdateIdentityResolver;

/// Revision token passed to the update-identity resolver; the catalog
/// publishes exactly one revision per version.
pub const DOWNLOAD_REVISION: &str = "1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadTier {
    /// Release and preview builds; no credentials involved.
    Anonymous,
    /// Beta builds; requires the one-shot account login.
    Authenticated,
}

/// Invoked on every chunk boundary with (bytes so far, total if known).
pub type ProgressCallback<'a> = &'a (dyn Fn(u64, Option<u64>) + Send + Sync);

/// One download client. The service keeps two independent instances so
/// the anonymous tier never shares connection state with the
/// authenticated one.
struct VersionDownloader {
    client: reqwest::Client,
}

impl VersionDownloader {
    fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    async fn fetch_to_file(
        &self,
        url: &str,
        destination: &Path,
        auth: Option<&AuthToken>,
        progress: ProgressCallback<'_>,
        cancel: &CancellationToken,
    ) -> Result<(), DownloadError> {
        debug!("downloading {} to {}", url, destination.display());
        let mut request = self.client.get(url);
        if let Some(token) = auth {
            request = request.bearer_auth(&token.token);
        }
        let mut response = request.send().await?.error_for_status()?;
        let total = response.content_length();

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = fs::File::create(destination).await?;
        let mut downloaded: u64 = 0;
        loop {
            // Polled between chunks; the partial file is left in place.
            if cancel.is_cancelled() {
                file.flush().await?;
                warn!("download cancelled after {} bytes", downloaded);
                return Err(DownloadError::Cancelled);
            }
            let Some(chunk) = response.chunk().await? else {
                break;
            };
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            progress(downloaded, total);
        }
        file.flush().await?;
        debug!("download complete: {} bytes", downloaded);
        Ok(())
    }
}

/// Two-tier download orchestrator.
///
/// The authenticated tier's login runs at most once per process, lazily,
/// on first use: the first caller claims the init, concurrent callers
/// await the same completion, and callers arriving after it finished
/// observe the memoized outcome — including a failure, which is not
/// retried within this run.
pub struct DownloadService {
    anonymous: VersionDownloader,
    authenticated: VersionDownloader,
    resolver: Arc<dyn UpdateIdentityResolver>,
    auth_provider: Arc<dyn AuthProvider>,
    login: OnceCell<Result<AuthToken, String>>,
}

impl DownloadService {
    pub fn new(
        resolver: Arc<dyn UpdateIdentityResolver>,
        auth_provider: Arc<dyn AuthProvider>,
    ) -> Self {
        Self {
            anonymous: VersionDownloader::new(),
            authenticated: VersionDownloader::new(),
            resolver,
            auth_provider,
            login: OnceCell::new(),
        }
    }

    async fn login_once(&self) -> Result<AuthToken, DownloadError> {
        let outcome = self
            .login
            .get_or_init(|| async {
                info!("performing downloader login");
                match self.auth_provider.login().await {
                    Ok(token) => {
                        info!("downloader login succeeded");
                        Ok(token)
                    }
                    Err(err) => {
                        warn!("downloader login failed: {err:#}");
                        Err(format!("{err:#}"))
                    }
                }
            })
            .await;
        outcome.clone().map_err(DownloadError::Authentication)
    }

    pub async fn download(
        &self,
        uuid: &str,
        tier: DownloadTier,
        destination: &Path,
        progress: ProgressCallback<'_>,
        cancel: &CancellationToken,
    ) -> Result<(), DownloadError> {
        let (downloader, auth) = match tier {
            DownloadTier::Anonymous => (&self.anonymous, None),
            DownloadTier::Authenticated => (&self.authenticated, Some(self.login_once().await?)),
        };

        let link = self
            .resolver
            .resolve(uuid, DOWNLOAD_REVISION, auth.as_ref())
            .await
            .map_err(|err| DownloadError::Identity(format!("{err:#}")))?;
        let Some(link) = link else {
            return Err(DownloadError::NoDownloadLink);
        };

        downloader
            .fetch_to_file(&link.url, destination, auth.as_ref(), progress, cancel)
            .await
    }
}
