use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::error::DeployError;
use crate::package_manager::{DeploymentProgress, InstalledPackage, PackageManager, MANIFEST_FILE};
use crate::preservation::DataPreservation;

/// Drives the host package (re)registration protocol for one package
/// family, backing up and restoring the private data folder around it.
pub struct PackageRegistrar {
    manager: Arc<dyn PackageManager>,
    preservation: DataPreservation,
}

impl PackageRegistrar {
    pub fn new(manager: Arc<dyn PackageManager>, preservation: DataPreservation) -> Self {
        Self {
            manager,
            preservation,
        }
    }

    /// Make `install_dir` the registered install for `family`.
    ///
    /// If a package is already registered at exactly `install_dir` the
    /// whole operation is a no-op: removing and re-adding the same
    /// location would be destructive for nothing. Any other registration
    /// under the family (including ones whose location can no longer be
    /// queried) is removed first.
    pub async fn re_register(&self, family: &str, install_dir: &Path) -> Result<(), DeployError> {
        let packages = self
            .manager
            .packages_by_family(family)
            .await
            .map_err(|err| DeployError::Registration(format!("{err:#}")))?;

        for pkg in packages {
            match pkg.location.as_deref() {
                Some(location) if location == install_dir => {
                    debug!(
                        "skipping package removal, same path: {} {}",
                        pkg.full_name,
                        location.display()
                    );
                    return Ok(());
                }
                _ => self.remove_package(&pkg, family).await?,
            }
        }

        debug!("registering package from {}", install_dir.display());
        let manifest = install_dir.join(MANIFEST_FILE);
        self.manager
            .register(&manifest, &log_progress("register"))
            .await
            .map_err(|err| DeployError::Registration(format!("{err:#}")))?;
        debug!("package registration done");

        let data_dir = self
            .manager
            .private_data_dir(family)
            .map_err(|err| DeployError::Registration(format!("{err:#}")))?;
        match self.preservation.restore_after_reinstall(&data_dir) {
            Ok(()) => Ok(()),
            Err(DeployError::Preservation(err)) => {
                Err(DeployError::Registration(format!("{err:#}")))
            }
            Err(other) => Err(other),
        }
    }

    /// Remove every registration under `family` that points at
    /// `install_dir` or whose location is unknown (stale).
    pub async fn unregister(&self, family: &str, install_dir: &Path) -> Result<(), DeployError> {
        let packages = self
            .manager
            .packages_by_family(family)
            .await
            .map_err(|err| DeployError::Removal(format!("{err:#}")))?;

        for pkg in packages {
            let stale_or_matching = match pkg.location.as_deref() {
                None => true,
                Some(location) => location == install_dir,
            };
            if stale_or_matching {
                self.remove_package(&pkg, family).await?;
            }
        }
        Ok(())
    }

    async fn remove_package(
        &self,
        pkg: &InstalledPackage,
        family: &str,
    ) -> Result<(), DeployError> {
        debug!("removing package {}", pkg.full_name);
        if pkg.development_mode {
            // Side-loaded installs keep their data host-side; nothing to
            // relocate ourselves.
            debug!("package {} is in development mode", pkg.full_name);
            self.manager
                .remove(&pkg.full_name, true, &log_progress("remove"))
                .await
                .map_err(|err| DeployError::Removal(format!("{err:#}")))?;
        } else {
            let data_dir = self
                .manager
                .private_data_dir(family)
                .map_err(|err| DeployError::Removal(format!("{err:#}")))?;
            match self.preservation.backup_before_removal(&data_dir) {
                Ok(()) => {}
                // The conflict passes through untouched; it must halt the
                // whole operation without compensating cleanup.
                Err(conflict @ DeployError::BackupConflict(_)) => return Err(conflict),
                Err(DeployError::Preservation(err)) => {
                    return Err(DeployError::Removal(format!("{err:#}")))
                }
                Err(other) => return Err(other),
            }
            self.manager
                .remove(&pkg.full_name, false, &log_progress("remove"))
                .await
                .map_err(|err| DeployError::Removal(format!("{err:#}")))?;
        }
        debug!("finished removing package {}", pkg.full_name);
        Ok(())
    }
}

fn log_progress(label: &'static str) -> impl Fn(DeploymentProgress) + Send + Sync {
    move |progress| {
        debug!(
            "deployment {} progress: {} {}%",
            label, progress.state, progress.percent
        );
    }
}
