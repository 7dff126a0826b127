use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::entry::VersionType;

/// Every on-disk path the launcher touches, derived from a single root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherLayout {
    root: PathBuf,
}

impl LauncherLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Catalog version directories live directly under the versions root
    /// (`Minecraft-<name>` / `Minecraft-Preview-<name>`).
    pub fn versions_root(&self) -> PathBuf {
        self.root.join("versions")
    }

    pub fn imported_versions_dir(&self) -> PathBuf {
        self.root.join("imported_versions")
    }

    pub fn archives_dir(&self) -> PathBuf {
        self.root.join("cache").join("archives")
    }

    pub fn archive_path(&self, version_type: VersionType, name: &str) -> PathBuf {
        self.archives_dir().join(version_type.archive_file_name(name))
    }

    /// Fixed, process-wide backup location for the game's private data
    /// directory. Its pre-existence at backup time means a previous backup
    /// was never restored.
    pub fn backup_data_dir(&self) -> PathBuf {
        self.root.join("TmpMinecraftLocalState")
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.root.join("preferences.json")
    }

    pub fn catalog_cache_path(&self) -> PathBuf {
        self.root.join("versions.json")
    }

    pub fn ensure_base_dirs(&self) -> Result<()> {
        for dir in [
            self.versions_root(),
            self.imported_versions_dir(),
            self.archives_dir(),
        ] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}

pub fn default_user_root() -> Result<PathBuf> {
    if cfg!(windows) {
        let app_data = std::env::var("LOCALAPPDATA")
            .context("LOCALAPPDATA is not set; cannot resolve Windows user root")?;
        return Ok(PathBuf::from(app_data).join("Quarry"));
    }

    let home = std::env::var("HOME").context("HOME is not set; cannot resolve user root")?;
    Ok(PathBuf::from(home).join(".quarry"))
}
