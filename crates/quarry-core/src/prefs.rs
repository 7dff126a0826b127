use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Preferences {
    #[serde(default)]
    pub show_installed_only: bool,
    /// Delete the downloaded install archive after extraction to save
    /// disk space.
    #[serde(default)]
    pub delete_archive_after_install: bool,
}

impl Preferences {
    /// Missing file yields the defaults; a malformed file is an error so a
    /// damaged preference file is never silently clobbered.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read preferences: {}", path.display()));
            }
        };
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse preferences: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(self).context("failed to serialize preferences")?;
        fs::write(path, raw)
            .with_context(|| format!("failed to write preferences: {}", path.display()))
    }
}
