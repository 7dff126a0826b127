use std::path::Path;
use std::sync::Arc;

use super::*;

#[test]
fn catalog_entry_directory_derivation() {
    let root = Path::new("/data/versions");
    let release = VersionEntry::from_catalog("u-1", "1.20.0.1", VersionType::Release, false, root);
    assert_eq!(
        release.game_directory(),
        Path::new("/data/versions/Minecraft-1.20.0.1")
    );

    let beta = VersionEntry::from_catalog("u-2", "1.21.0.20", VersionType::Beta, false, root);
    assert_eq!(
        beta.game_directory(),
        Path::new("/data/versions/Minecraft-1.21.0.20")
    );

    let preview = VersionEntry::from_catalog("u-3", "1.21.0.21", VersionType::Preview, false, root);
    assert_eq!(
        preview.game_directory(),
        Path::new("/data/versions/Minecraft-Preview-1.21.0.21")
    );
}

#[test]
fn package_family_follows_version_type() {
    for version_type in [
        VersionType::Release,
        VersionType::Beta,
        VersionType::Imported,
    ] {
        assert_eq!(version_type.package_family(), package_family::RETAIL);
    }
    assert_eq!(
        VersionType::Preview.package_family(),
        package_family::PREVIEW
    );
}

#[test]
fn archive_file_name_uses_type_prefix() {
    assert_eq!(
        VersionType::Release.archive_file_name("1.20.0.1"),
        "Minecraft-1.20.0.1.Appx"
    );
    assert_eq!(
        VersionType::Preview.archive_file_name("1.21.0.21"),
        "Minecraft-Preview-1.21.0.21.Appx"
    );
}

#[test]
fn imported_entry_has_unknown_uuid_and_explicit_directory() {
    let entry = VersionEntry::imported("custom.appx", "/imports/custom.appx".into());
    assert_eq!(entry.uuid(), UNKNOWN_UUID);
    assert!(entry.is_imported());
    assert_eq!(entry.game_directory(), Path::new("/imports/custom.appx"));
}

#[test]
fn version_type_round_trips_through_str() {
    for version_type in [
        VersionType::Release,
        VersionType::Beta,
        VersionType::Preview,
        VersionType::Imported,
    ] {
        assert_eq!(
            VersionType::parse(version_type.as_str()).expect("must parse"),
            version_type
        );
    }
    assert!(VersionType::parse("nightly").is_err());
}

#[test]
fn busy_slot_admits_one_operation_at_a_time() {
    let entry = VersionEntry::from_catalog(
        "u-1",
        "1.20.0.1",
        VersionType::Release,
        false,
        Path::new("/tmp"),
    );
    assert!(!entry.is_busy());

    let info = entry
        .begin_operation(VersionState::Initializing)
        .expect("first claim must succeed");
    assert!(entry.is_busy());
    assert!(entry.begin_operation(VersionState::Uninstalling).is_none());

    entry.clear_state_change();
    assert!(!entry.is_busy());
    assert_eq!(info.state(), VersionState::Initializing);
    assert!(entry.begin_operation(VersionState::Registering).is_some());
}

#[test]
fn state_change_progress_and_cancel_slot() {
    let info = StateChangeInfo::new(VersionState::Initializing);
    assert!(info.is_progress_indeterminate());
    assert!(!info.request_cancel());

    let token = tokio_util::sync::CancellationToken::new();
    info.attach_cancel(token.clone());
    assert!(info.can_cancel());

    info.set_state(VersionState::Downloading);
    info.set_total_size(20 * 1024 * 1024);
    info.set_downloaded_bytes(5 * 1024 * 1024);
    assert!(!info.is_progress_indeterminate());
    assert_eq!(info.display_status(), "Downloading... 5MiB/20MiB");

    assert!(info.request_cancel());
    assert!(token.is_cancelled());

    info.clear_cancel();
    assert!(!info.can_cancel());
    assert!(!info.request_cancel());
}

#[test]
fn display_name_tags() {
    let root = Path::new("/tmp");
    let beta = VersionEntry::from_catalog("u", "1.21.0.20", VersionType::Beta, true, root);
    assert_eq!(beta.display_name(), "1.21.0.20 (beta) (new!)");
    beta.clear_new();
    assert_eq!(beta.display_name(), "1.21.0.20 (beta)");

    let release = VersionEntry::from_catalog("u", "1.20.0.1", VersionType::Release, false, root);
    assert_eq!(release.display_name(), "1.20.0.1");
}

#[test]
fn catalog_reload_keeps_imports() {
    let catalog = VersionCatalog::new();
    let root = Path::new("/data/versions");
    catalog.add_imported("mine.appx", Path::new("/imports/mine.appx"));
    catalog.set_catalog_versions(
        vec![
            CatalogVersion {
                uuid: "u-1".to_string(),
                name: "1.20.0.1".to_string(),
                version_type: VersionType::Release,
                is_new: false,
            },
            CatalogVersion {
                uuid: "u-2".to_string(),
                name: "1.21.0.20".to_string(),
                version_type: VersionType::Beta,
                is_new: true,
            },
        ],
        root,
    );
    assert_eq!(catalog.len(), 3);

    // Reload replaces catalog entries but never the import.
    catalog.set_catalog_versions(
        vec![CatalogVersion {
            uuid: "u-1".to_string(),
            name: "1.20.0.1".to_string(),
            version_type: VersionType::Release,
            is_new: false,
        }],
        root,
    );
    assert_eq!(catalog.len(), 2);
    assert!(catalog
        .find_imported_by_directory(Path::new("/imports/mine.appx"))
        .is_some());
    assert!(catalog.find("1.21.0.20", VersionType::Beta).is_none());
}

#[test]
fn catalog_remove_is_by_identity() {
    let catalog = VersionCatalog::new();
    let first = catalog.add_imported("a.appx", Path::new("/imports/a.appx"));
    let second = catalog.add_imported("b.appx", Path::new("/imports/b.appx"));

    assert!(catalog.remove(&first));
    assert!(!catalog.remove(&first));
    assert_eq!(catalog.len(), 1);
    assert!(Arc::ptr_eq(&catalog.entries()[0], &second));
}

#[test]
fn load_imported_scans_directories_once() {
    let tmp = tempfile::tempdir().expect("must create tempdir");
    let imported_dir = tmp.path().join("imported_versions");
    std::fs::create_dir_all(imported_dir.join("one.appx")).expect("must create");
    std::fs::create_dir_all(imported_dir.join("two.appx")).expect("must create");
    std::fs::write(imported_dir.join("stray.txt"), b"not a version").expect("must write");

    let catalog = VersionCatalog::new();
    let added = catalog.load_imported(&imported_dir).expect("must scan");
    assert_eq!(added, 2);

    // A second scan adds nothing.
    let added = catalog.load_imported(&imported_dir).expect("must scan");
    assert_eq!(added, 0);
    assert_eq!(catalog.len(), 2);
}

#[test]
fn load_imported_missing_directory_is_empty() {
    let catalog = VersionCatalog::new();
    let added = catalog
        .load_imported(Path::new("/nonexistent/imported_versions"))
        .expect("missing dir is not an error");
    assert_eq!(added, 0);
}

#[test]
fn layout_paths_derive_from_root() {
    let layout = LauncherLayout::new("/data/quarry");
    assert_eq!(layout.versions_root(), Path::new("/data/quarry/versions"));
    assert_eq!(
        layout.imported_versions_dir(),
        Path::new("/data/quarry/imported_versions")
    );
    assert_eq!(
        layout.archive_path(VersionType::Preview, "1.21.0.21"),
        Path::new("/data/quarry/cache/archives/Minecraft-Preview-1.21.0.21.Appx")
    );
    assert_eq!(
        layout.backup_data_dir(),
        Path::new("/data/quarry/TmpMinecraftLocalState")
    );
    assert_eq!(
        layout.preferences_path(),
        Path::new("/data/quarry/preferences.json")
    );
}

#[test]
fn preferences_round_trip_and_defaults() {
    let tmp = tempfile::tempdir().expect("must create tempdir");
    let path = tmp.path().join("preferences.json");

    let loaded = Preferences::load(&path).expect("missing file loads defaults");
    assert_eq!(loaded, Preferences::default());

    let prefs = Preferences {
        show_installed_only: true,
        delete_archive_after_install: true,
    };
    prefs.save(&path).expect("must save");
    let loaded = Preferences::load(&path).expect("must load");
    assert_eq!(loaded, prefs);

    std::fs::write(&path, b"{not json").expect("must write");
    assert!(Preferences::load(&path).is_err());
}
