mod catalog;
mod entry;
mod layout;
mod prefs;
mod state;

pub use catalog::{CatalogVersion, VersionCatalog};
pub use entry::{package_family, VersionEntry, VersionType, UNKNOWN_UUID};
pub use layout::{default_user_root, LauncherLayout};
pub use prefs::Preferences;
pub use state::{StateChangeInfo, VersionState};

#[cfg(test)]
mod tests;
