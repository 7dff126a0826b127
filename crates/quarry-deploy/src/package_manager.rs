use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;

/// Package manifest file inside an install directory; registering this
/// manifest in development mode is how a version becomes launchable.
pub const MANIFEST_FILE: &str = "AppxManifest.xml";

/// One host package registered under a family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    pub full_name: String,
    pub family: String,
    /// `None` when the installed-location query failed (e.g. the package
    /// was partially uninstalled while being enumerated).
    pub location: Option<PathBuf>,
    pub development_mode: bool,
}

/// Progress event from a long-running host deployment operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentProgress {
    pub state: String,
    pub percent: u32,
}

pub type ProgressSink<'a> = &'a (dyn Fn(DeploymentProgress) + Send + Sync);

/// Host application-package manager, as consumed by the registrar.
///
/// Register/remove are long-running operations; implementations report
/// progress through the sink and surface the host's error text through
/// the returned error.
#[async_trait]
pub trait PackageManager: Send + Sync {
    async fn packages_by_family(&self, family: &str) -> Result<Vec<InstalledPackage>>;

    /// Register the package described by `manifest` in development
    /// (side-load) mode.
    async fn register(&self, manifest: &Path, progress: ProgressSink<'_>) -> Result<()>;

    /// Remove a package by full name. With `preserve_data`, the host keeps
    /// the package's private application data.
    async fn remove(
        &self,
        full_name: &str,
        preserve_data: bool,
        progress: ProgressSink<'_>,
    ) -> Result<()>;

    /// The package-scoped private data folder for a family (distinct from
    /// the install directory).
    fn private_data_dir(&self, family: &str) -> Result<PathBuf>;

    /// Resolve the family's launchable app entry and invoke it.
    async fn launch_app(&self, family: &str) -> Result<()>;
}
