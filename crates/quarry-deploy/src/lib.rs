mod appx;
mod archive;
mod error;
mod fs_utils;
mod package_manager;
mod preservation;
mod registrar;

pub use appx::AppxPackageManager;
pub use archive::{ArchiveExtractor, ExtractError, ZipExtractor};
pub use error::DeployError;
pub use package_manager::{
    DeploymentProgress, InstalledPackage, PackageManager, ProgressSink, MANIFEST_FILE,
};
pub use preservation::{DataPreservation, OverwritePrompt};
pub use registrar::PackageRegistrar;
