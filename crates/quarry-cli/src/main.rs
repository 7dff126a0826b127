mod render;
mod sources;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use quarry_core::{
    default_user_root, LauncherLayout, Preferences, VersionCatalog, VersionEntry, VersionType,
};
use quarry_deploy::{
    AppxPackageManager, DataPreservation, OverwritePrompt, PackageManager, PackageRegistrar,
    ZipExtractor,
};
use quarry_downloader::DownloadService;
use quarry_lifecycle::{EventSink, ImportOutcome, LifecycleManager};

use render::{print_status, print_version_list, StdinPrompt, TerminalEvents};
use sources::{load_catalog_cache, EnvTokenProvider, LinkFileResolver};

#[derive(Parser, Debug)]
#[command(name = "quarry")]
#[command(about = "Version manager for sideloaded game installs", long_about = None)]
struct Cli {
    /// Root directory for versions, caches and state.
    #[arg(long)]
    root: Option<PathBuf>,
    /// Assume "yes" for every replace/overwrite question.
    #[arg(long, global = true)]
    yes: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Channel {
    Release,
    Beta,
    Preview,
    Imported,
}

impl From<Channel> for VersionType {
    fn from(channel: Channel) -> Self {
        match channel {
            Channel::Release => VersionType::Release,
            Channel::Beta => VersionType::Beta,
            Channel::Preview => VersionType::Preview,
            Channel::Imported => VersionType::Imported,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List known versions and their install status.
    List,
    /// Download and install a version.
    Download {
        name: String,
        #[arg(long, value_enum, default_value_t = Channel::Release)]
        channel: Channel,
    },
    /// (Re)register a version and launch it.
    Launch {
        name: String,
        #[arg(long, value_enum, default_value_t = Channel::Release)]
        channel: Channel,
    },
    /// Unregister a version and delete its files.
    Remove {
        name: String,
        #[arg(long, value_enum, default_value_t = Channel::Release)]
        channel: Channel,
    },
    /// Import a local install archive as a new version.
    Import { file: PathBuf },
    /// Remove every installed version.
    Purge,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let root = match cli.root.clone() {
        Some(root) => root,
        None => default_user_root()?,
    };
    let layout = LauncherLayout::new(root);
    layout.ensure_base_dirs()?;

    let prefs = Preferences::load(&layout.preferences_path())?;
    let catalog = Arc::new(VersionCatalog::new());
    catalog.set_catalog_versions(
        load_catalog_cache(&layout.catalog_cache_path())?,
        &layout.versions_root(),
    );
    catalog.load_imported(&layout.imported_versions_dir())?;

    let events = Arc::new(TerminalEvents::new());
    let prompt = Arc::new(StdinPrompt::new(cli.yes));
    let package_manager: Arc<dyn PackageManager> = Arc::new(AppxPackageManager::new());
    let registrar = Arc::new(PackageRegistrar::new(
        Arc::clone(&package_manager),
        DataPreservation::new(
            layout.backup_data_dir(),
            Arc::clone(&prompt) as Arc<dyn OverwritePrompt>,
        ),
    ));
    let fetcher = Arc::new(DownloadService::new(
        Arc::new(LinkFileResolver::new(
            layout.root().join("download_links.json"),
        )),
        Arc::new(EnvTokenProvider::new()),
    ));
    let manager = Arc::new(LifecycleManager::new(
        catalog,
        layout,
        prefs,
        fetcher,
        registrar,
        package_manager,
        Arc::new(ZipExtractor::new()),
        Arc::clone(&events) as Arc<dyn EventSink>,
    ));

    run_command(cli.command, &manager, &prompt).await?;

    if events.any_failure() {
        return Err(anyhow!("operation failed; see output above"));
    }
    Ok(())
}

async fn run_command(
    command: Commands,
    manager: &Arc<LifecycleManager>,
    prompt: &Arc<StdinPrompt>,
) -> Result<()> {
    match command {
        Commands::List => print_version_list(manager.catalog()),
        Commands::Download { name, channel } => {
            let entry = find_entry(manager, &name, channel)?;
            let handle = manager
                .invoke_download(entry)
                .ok_or_else(|| anyhow!("an operation is already in progress for {name}"))?;
            handle.await.context("download task failed")?;
        }
        Commands::Launch { name, channel } => {
            let entry = find_entry(manager, &name, channel)?;
            let handle = manager
                .invoke_launch(entry)
                .ok_or_else(|| anyhow!("a launch is already in progress"))?;
            handle.await.context("launch task failed")?;
        }
        Commands::Remove { name, channel } => {
            let entry = find_entry(manager, &name, channel)?;
            if manager.remove(entry).await {
                print_status("ok", &format!("removed {name}"));
            }
        }
        Commands::Import { file } => {
            let prompt = Arc::clone(prompt);
            let confirm = move || {
                prompt.confirm("A version with the same name is already imported. Remove it first?")
            };
            match manager.import(&file, &confirm).await? {
                ImportOutcome::Imported(entry) => {
                    print_status("ok", &format!("imported {}", entry.display_name()));
                }
                ImportOutcome::RefusedBusy => {
                    print_status(
                        "error",
                        "a version with the same name is being modified; try again later",
                    );
                }
                ImportOutcome::RefusedUnknownDirectory => {
                    print_status(
                        "error",
                        "the import target directory already exists and is not a known import; \
                         delete it manually to proceed",
                    );
                }
                ImportOutcome::Declined => {
                    print_status("ok", "import aborted");
                }
                ImportOutcome::ReplaceFailed | ImportOutcome::ExtractionFailed => {}
            }
        }
        Commands::Purge => {
            let scheduled = manager.purge_installed();
            let count = scheduled.len();
            for handle in scheduled {
                handle.await.context("removal task failed")?;
            }
            print_status("ok", &format!("removed {count} installed versions"));
        }
    }
    Ok(())
}

fn find_entry(
    manager: &LifecycleManager,
    name: &str,
    channel: Channel,
) -> Result<Arc<VersionEntry>> {
    manager
        .catalog()
        .find(name, channel.into())
        .ok_or_else(|| anyhow!("unknown version '{name}' on channel {channel:?}"))
}

#[cfg(test)]
mod tests;
