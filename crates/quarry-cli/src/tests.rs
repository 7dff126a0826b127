use clap::Parser;

use quarry_core::VersionType;
use quarry_downloader::UpdateIdentityResolver;

use super::sources::{load_catalog_cache, LinkFileResolver};
use super::{Channel, Cli, Commands};

#[test]
fn cli_definition_is_consistent() {
    use clap::CommandFactory;
    Cli::command().debug_assert();
}

#[test]
fn parse_download_with_channel() {
    let cli = Cli::try_parse_from(["quarry", "download", "1.21.0.20", "--channel", "beta"])
        .expect("must parse");
    match cli.command {
        Commands::Download { name, channel } => {
            assert_eq!(name, "1.21.0.20");
            assert_eq!(channel, Channel::Beta);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn parse_defaults_to_release_channel() {
    let cli = Cli::try_parse_from(["quarry", "launch", "1.20.0.1"]).expect("must parse");
    match cli.command {
        Commands::Launch { name, channel } => {
            assert_eq!(name, "1.20.0.1");
            assert_eq!(channel, Channel::Release);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn parse_global_yes_flag() {
    let cli = Cli::try_parse_from(["quarry", "purge", "--yes"]).expect("must parse");
    assert!(cli.yes);
    assert!(matches!(cli.command, Commands::Purge));
}

#[test]
fn channel_maps_to_version_type() {
    assert_eq!(VersionType::from(Channel::Release), VersionType::Release);
    assert_eq!(VersionType::from(Channel::Beta), VersionType::Beta);
    assert_eq!(VersionType::from(Channel::Preview), VersionType::Preview);
    assert_eq!(VersionType::from(Channel::Imported), VersionType::Imported);
}

#[test]
fn catalog_cache_parses_triplets_and_skips_unknown_tags() {
    let tmp = tempfile::tempdir().expect("must create tempdir");
    let path = tmp.path().join("versions.json");
    std::fs::write(
        &path,
        r#"[["uuid-a","1.20.0.1",0],["uuid-b","1.21.0.20",1],["uuid-c","1.21.0.21",2],["uuid-d","9.9.9.9",7]]"#,
    )
    .expect("must write");

    let versions = load_catalog_cache(&path).expect("must parse");
    assert_eq!(versions.len(), 3);
    assert_eq!(versions[0].uuid, "uuid-a");
    assert_eq!(versions[0].version_type, VersionType::Release);
    assert_eq!(versions[1].version_type, VersionType::Beta);
    assert_eq!(versions[2].version_type, VersionType::Preview);
    assert!(!versions[0].is_new);
}

#[test]
fn catalog_cache_missing_file_is_empty() {
    let tmp = tempfile::tempdir().expect("must create tempdir");
    let versions = load_catalog_cache(&tmp.path().join("versions.json")).expect("must load");
    assert!(versions.is_empty());
}

#[tokio::test]
async fn link_file_resolver_maps_uuid_to_url() {
    let tmp = tempfile::tempdir().expect("must create tempdir");
    let path = tmp.path().join("download_links.json");
    std::fs::write(
        &path,
        r#"{"uuid-a":"https://example.test/Minecraft-1.20.0.1.Appx"}"#,
    )
    .expect("must write");

    let resolver = LinkFileResolver::new(path);
    let link = resolver
        .resolve("uuid-a", "1", None)
        .await
        .expect("must resolve")
        .expect("link must exist");
    assert_eq!(link.url, "https://example.test/Minecraft-1.20.0.1.Appx");

    assert!(resolver
        .resolve("uuid-unknown", "1", None)
        .await
        .expect("must resolve")
        .is_none());
}

#[tokio::test]
async fn link_file_resolver_missing_file_means_no_link() {
    let tmp = tempfile::tempdir().expect("must create tempdir");
    let resolver = LinkFileResolver::new(tmp.path().join("download_links.json"));
    assert!(resolver
        .resolve("uuid-a", "1", None)
        .await
        .expect("must resolve")
        .is_none());
}
