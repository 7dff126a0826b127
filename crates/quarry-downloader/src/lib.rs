mod auth;
mod error;
mod fetcher;
mod resolver;
mod service;

pub use auth::{AuthProvider, AuthToken};
pub use error::DownloadError;
pub use fetcher::VersionFetcher;
pub use resolver::{DownloadLink, UpdateIdentityResolver};
pub use service::{DownloadService, DownloadTier, ProgressCallback, DOWNLOAD_REVISION};

#[cfg(test)]
mod tests;
