use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use parking_lot::Mutex;

use crate::state::{StateChangeInfo, VersionState};

/// Catalog identifier carried by entries that did not come from the
/// catalog (user imports have no update identity).
pub const UNKNOWN_UUID: &str = "unknown";

/// Host package families the game registers under. Preview builds ship
/// under a separate family so a preview install never displaces a retail
/// install.
pub mod package_family {
    pub const RETAIL: &str = "Microsoft.MinecraftUWP_8wekyb3d8bbwe";
    pub const PREVIEW: &str = "Microsoft.MinecraftWindowsBeta_8wekyb3d8bbwe";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionType {
    Release,
    Beta,
    Preview,
    Imported,
}

impl VersionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Release => "release",
            Self::Beta => "beta",
            Self::Preview => "preview",
            Self::Imported => "imported",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "release" => Ok(Self::Release),
            "beta" => Ok(Self::Beta),
            "preview" => Ok(Self::Preview),
            "imported" => Ok(Self::Imported),
            _ => Err(anyhow!("invalid version type: {value}")),
        }
    }

    /// Directory-name prefix for catalog versions. Imported versions carry
    /// an explicit directory and never go through this derivation.
    pub fn directory_prefix(self) -> &'static str {
        match self {
            Self::Preview => "Minecraft-Preview-",
            _ => "Minecraft-",
        }
    }

    pub fn package_family(self) -> &'static str {
        match self {
            Self::Preview => package_family::PREVIEW,
            _ => package_family::RETAIL,
        }
    }

    /// File name of the downloaded install archive for a catalog version.
    pub fn archive_file_name(self, name: &str) -> String {
        format!("{}{}.Appx", self.directory_prefix(), name)
    }
}

/// One installable/launchable version known to the manager.
///
/// The busy slot (`state_change`) is the single-flight guard: while it is
/// occupied, exactly one lifecycle operation owns this entry and its
/// on-disk directories.
#[derive(Debug)]
pub struct VersionEntry {
    uuid: String,
    name: String,
    version_type: VersionType,
    game_directory: PathBuf,
    is_new: AtomicBool,
    state_change: Mutex<Option<Arc<StateChangeInfo>>>,
}

impl VersionEntry {
    /// Entry backed by the remote catalog; its directory is derived from
    /// the type prefix and the version name under `versions_root`.
    pub fn from_catalog(
        uuid: impl Into<String>,
        name: impl Into<String>,
        version_type: VersionType,
        is_new: bool,
        versions_root: &Path,
    ) -> Self {
        let name = name.into();
        let game_directory =
            versions_root.join(format!("{}{}", version_type.directory_prefix(), name));
        Self {
            uuid: uuid.into(),
            name,
            version_type,
            game_directory,
            is_new: AtomicBool::new(is_new),
            state_change: Mutex::new(None),
        }
    }

    /// User-imported entry: no catalog identity, explicit directory.
    pub fn imported(name: impl Into<String>, directory: PathBuf) -> Self {
        Self {
            uuid: UNKNOWN_UUID.to_string(),
            name: name.into(),
            version_type: VersionType::Imported,
            game_directory: directory,
            is_new: AtomicBool::new(false),
            state_change: Mutex::new(None),
        }
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version_type(&self) -> VersionType {
        self.version_type
    }

    pub fn game_directory(&self) -> &Path {
        &self.game_directory
    }

    pub fn package_family(&self) -> &'static str {
        self.version_type.package_family()
    }

    pub fn is_imported(&self) -> bool {
        self.version_type == VersionType::Imported
    }

    /// Installed means the version's directory exists on disk; there is no
    /// separate status flag to fall out of sync.
    pub fn is_installed(&self) -> bool {
        self.game_directory.is_dir()
    }

    pub fn is_new(&self) -> bool {
        self.is_new.load(Ordering::Relaxed)
    }

    pub fn clear_new(&self) {
        self.is_new.store(false, Ordering::Relaxed);
    }

    pub fn display_name(&self) -> String {
        let tag = match self.version_type {
            VersionType::Beta => " (beta)",
            VersionType::Preview => " (preview)",
            _ => "",
        };
        let new_tag = if self.is_new() { " (new!)" } else { "" };
        format!("{}{}{}", self.name, tag, new_tag)
    }

    /// Claim the busy slot for a new operation. Returns the freshly
    /// created state-change info, or `None` if another operation already
    /// owns this entry.
    pub fn begin_operation(&self, state: VersionState) -> Option<Arc<StateChangeInfo>> {
        let mut slot = self.state_change.lock();
        if slot.is_some() {
            return None;
        }
        let info = Arc::new(StateChangeInfo::new(state));
        *slot = Some(Arc::clone(&info));
        Some(info)
    }

    pub fn is_busy(&self) -> bool {
        self.state_change.lock().is_some()
    }

    pub fn state_change(&self) -> Option<Arc<StateChangeInfo>> {
        self.state_change.lock().clone()
    }

    /// Release the busy slot. Called exactly once per operation, on every
    /// exit path.
    pub fn clear_state_change(&self) {
        *self.state_change.lock() = None;
    }
}
