use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use tracing::debug;

use crate::entry::{VersionEntry, VersionType};

/// One catalog record, as handed over by the (external) catalog loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogVersion {
    pub uuid: String,
    pub name: String,
    pub version_type: VersionType,
    pub is_new: bool,
}

/// In-memory collection of every version the manager knows about.
///
/// Catalog-derived entries are replaced wholesale when the catalog is
/// (re)loaded; imported entries are only ever removed by a successful
/// remove operation.
#[derive(Debug, Default)]
pub struct VersionCatalog {
    entries: RwLock<Vec<Arc<VersionEntry>>>,
}

impl VersionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Arc<VersionEntry>> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Replace all catalog-derived entries, keeping imports untouched.
    pub fn set_catalog_versions(&self, versions: Vec<CatalogVersion>, versions_root: &Path) {
        let mut entries = self.entries.write();
        entries.retain(|entry| entry.is_imported());
        for version in versions {
            entries.push(Arc::new(VersionEntry::from_catalog(
                version.uuid,
                version.name,
                version.version_type,
                version.is_new,
                versions_root,
            )));
        }
    }

    pub fn add_imported(&self, name: impl Into<String>, directory: &Path) -> Arc<VersionEntry> {
        let entry = Arc::new(VersionEntry::imported(name, directory.to_path_buf()));
        self.entries.write().push(Arc::clone(&entry));
        entry
    }

    /// Remove the exact entry (identity, not name equality). Returns
    /// whether it was present.
    pub fn remove(&self, entry: &Arc<VersionEntry>) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|existing| !Arc::ptr_eq(existing, entry));
        entries.len() != before
    }

    pub fn find(&self, name: &str, version_type: VersionType) -> Option<Arc<VersionEntry>> {
        self.entries
            .read()
            .iter()
            .find(|entry| entry.version_type() == version_type && entry.name() == name)
            .cloned()
    }

    pub fn find_imported_by_directory(&self, directory: &Path) -> Option<Arc<VersionEntry>> {
        self.entries
            .read()
            .iter()
            .find(|entry| entry.is_imported() && entry.game_directory() == directory)
            .cloned()
    }

    /// Re-create imported entries from the directories left by previous
    /// runs. Directories already tracked are skipped.
    pub fn load_imported(&self, imported_dir: &Path) -> Result<usize> {
        if !imported_dir.exists() {
            return Ok(0);
        }

        let mut added = 0;
        for dir_entry in fs::read_dir(imported_dir).with_context(|| {
            format!(
                "failed to read imported versions directory: {}",
                imported_dir.display()
            )
        })? {
            let dir_entry = dir_entry?;
            if !dir_entry.file_type()?.is_dir() {
                continue;
            }
            let path = dir_entry.path();
            if self.find_imported_by_directory(&path).is_some() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|v| v.to_str()) else {
                continue;
            };
            debug!("found imported version {}", name);
            self.add_imported(name.to_string(), &path);
            added += 1;
        }
        Ok(added)
    }
}
