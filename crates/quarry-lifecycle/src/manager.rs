use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context};
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use quarry_core::{
    LauncherLayout, Preferences, StateChangeInfo, VersionCatalog, VersionEntry, VersionState,
    VersionType,
};
use quarry_deploy::{ArchiveExtractor, PackageManager, PackageRegistrar};
use quarry_downloader::{DownloadError, DownloadTier, VersionFetcher};

use crate::error::LifecycleError;
use crate::events::EventSink;

/// Store signature embedded in the install archive; meaningless once the
/// package is extracted for development registration.
const SIGNATURE_FILE: &str = "AppxSignature.p7x";

/// Outcome of an import attempt. Refusals are ordinary outcomes, not
/// errors: the caller decides how to phrase them.
#[derive(Debug)]
pub enum ImportOutcome {
    Imported(Arc<VersionEntry>),
    /// The target directory belongs to an import that is mid-operation;
    /// try again later.
    RefusedBusy,
    /// The target directory exists but is not a known import; nothing is
    /// deleted.
    RefusedUnknownDirectory,
    /// The caller declined to replace the existing import.
    Declined,
    /// Removing the existing import failed (already reported).
    ReplaceFailed,
    /// The archive did not extract (already reported); the entry stays in
    /// the catalog for retry or manual removal.
    ExtractionFailed,
}

/// Coordinates every lifecycle operation over the catalog entries.
///
/// One background task per invoked operation; the busy slot on each entry
/// serializes operations per version, and a process-wide flag serializes
/// launches. Every operation path ends by releasing the busy slot, so a
/// reported failure always leaves the entry idle and retryable.
pub struct LifecycleManager {
    catalog: Arc<VersionCatalog>,
    layout: LauncherLayout,
    prefs: RwLock<Preferences>,
    fetcher: Arc<dyn VersionFetcher>,
    registrar: Arc<PackageRegistrar>,
    package_manager: Arc<dyn PackageManager>,
    extractor: Arc<dyn ArchiveExtractor>,
    events: Arc<dyn EventSink>,
    launch_in_flight: AtomicBool,
}

impl LifecycleManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        catalog: Arc<VersionCatalog>,
        layout: LauncherLayout,
        prefs: Preferences,
        fetcher: Arc<dyn VersionFetcher>,
        registrar: Arc<PackageRegistrar>,
        package_manager: Arc<dyn PackageManager>,
        extractor: Arc<dyn ArchiveExtractor>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            catalog,
            layout,
            prefs: RwLock::new(prefs),
            fetcher,
            registrar,
            package_manager,
            extractor,
            events,
            launch_in_flight: AtomicBool::new(false),
        }
    }

    pub fn catalog(&self) -> &Arc<VersionCatalog> {
        &self.catalog
    }

    pub fn preferences(&self) -> Preferences {
        self.prefs.read().clone()
    }

    pub fn set_preferences(&self, prefs: Preferences) {
        *self.prefs.write() = prefs;
    }

    /// Launch `entry`, re-registering its package first. At most one
    /// launch runs process-wide; a second request while one is active is
    /// silently dropped.
    pub fn invoke_launch(self: &Arc<Self>, entry: Arc<VersionEntry>) -> Option<JoinHandle<()>> {
        if self
            .launch_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("a launch is already in progress; ignoring");
            return None;
        }

        let Some(info) = entry.begin_operation(VersionState::Registering) else {
            warn!(
                "an operation is already in progress for {}; ignoring launch",
                entry.display_name()
            );
            self.launch_in_flight.store(false, Ordering::SeqCst);
            return None;
        };

        let manager = Arc::clone(self);
        Some(tokio::spawn(async move {
            manager.run_launch(&entry, &info).await;
            manager.launch_in_flight.store(false, Ordering::SeqCst);
        }))
    }

    async fn run_launch(&self, entry: &Arc<VersionEntry>, info: &StateChangeInfo) {
        let _guard = OperationGuard::new(Arc::clone(entry), Arc::clone(&self.events));
        self.events.entry_updated(entry);

        // Always re-register before launching; the registrar's same-path
        // fast path makes this a no-op when nothing changed.
        if let Err(err) = self
            .registrar
            .re_register(entry.package_family(), entry.game_directory())
            .await
        {
            self.report(entry, err.into());
            return;
        }

        info.set_state(VersionState::Launching);
        self.events.entry_updated(entry);
        match self.package_manager.launch_app(entry.package_family()).await {
            Ok(()) => info!("launch complete for {}", entry.display_name()),
            Err(err) => self.report(entry, LifecycleError::Launch(format!("{err:#}"))),
        }
    }

    /// Download and install `entry`. Rejected (returns `None`) when an
    /// operation is already in flight for it.
    pub fn invoke_download(self: &Arc<Self>, entry: Arc<VersionEntry>) -> Option<JoinHandle<()>> {
        let Some(info) = entry.begin_operation(VersionState::Initializing) else {
            warn!(
                "an operation is already in progress for {}; ignoring download",
                entry.display_name()
            );
            return None;
        };
        entry.clear_new();

        let cancel = CancellationToken::new();
        info.attach_cancel(cancel.clone());
        self.events.entry_updated(&entry);

        debug!("starting download of {}", entry.display_name());
        let manager = Arc::clone(self);
        Some(tokio::spawn(async move {
            manager.run_download(entry, info, cancel).await;
        }))
    }

    async fn run_download(
        &self,
        entry: Arc<VersionEntry>,
        info: Arc<StateChangeInfo>,
        cancel: CancellationToken,
    ) {
        let _guard = OperationGuard::new(Arc::clone(&entry), Arc::clone(&self.events));

        let tier = match entry.version_type() {
            VersionType::Beta => DownloadTier::Authenticated,
            _ => DownloadTier::Anonymous,
        };
        let archive_path = self.layout.archive_path(entry.version_type(), entry.name());

        let progress_info = Arc::clone(&info);
        let progress_entry = Arc::clone(&entry);
        let progress_events = Arc::clone(&self.events);
        let progress = move |current: u64, total: Option<u64>| {
            // The first bytes on the wire flip the visible state from
            // "preparing" to "downloading" and fix the total if known.
            if progress_info.state() != VersionState::Downloading {
                debug!("download transfer started");
                progress_info.set_state(VersionState::Downloading);
                if let Some(total) = total {
                    progress_info.set_total_size(total);
                }
            }
            progress_info.set_downloaded_bytes(current);
            progress_events.entry_updated(&progress_entry);
        };

        match self
            .fetcher
            .download(entry.uuid(), tier, &archive_path, &progress, &cancel)
            .await
        {
            Ok(()) => debug!("download complete"),
            Err(DownloadError::Cancelled) => {
                info!("download cancelled for {}", entry.display_name());
                return;
            }
            Err(err) => {
                self.report(&entry, err.into());
                return;
            }
        }

        // Extraction and beyond run to completion; drop the token.
        info.clear_cancel();
        info.set_state(VersionState::Extracting);
        self.events.entry_updated(&entry);

        let extractor = Arc::clone(&self.extractor);
        let archive = archive_path.clone();
        let game_dir = entry.game_directory().to_path_buf();
        let extracted = tokio::task::spawn_blocking(move || {
            replace_and_extract(&*extractor, &archive, &game_dir)
        })
        .await
        .unwrap_or_else(|err| Err(anyhow!("extraction task failed: {err}").into()));
        if let Err(err) = extracted {
            self.report(&entry, err);
            return;
        }

        if self.prefs.read().delete_archive_after_install {
            debug!("deleting downloaded archive to save disk space");
            if let Err(err) = std::fs::remove_file(&archive_path) {
                warn!(
                    "failed to delete archive {}: {}",
                    archive_path.display(),
                    err
                );
            }
        } else {
            debug!("keeping downloaded archive per user preference");
        }

        info!("installed {}", entry.display_name());
    }

    pub fn invoke_remove(self: &Arc<Self>, entry: Arc<VersionEntry>) -> JoinHandle<bool> {
        let manager = Arc::clone(self);
        tokio::spawn(async move { manager.remove(entry).await })
    }

    /// Unregister and delete `entry`'s install. Imported entries leave
    /// the catalog entirely; catalog entries persist as not-installed.
    /// Returns whether the removal went through.
    pub async fn remove(&self, entry: Arc<VersionEntry>) -> bool {
        let Some(_info) = entry.begin_operation(VersionState::Uninstalling) else {
            warn!(
                "an operation is already in progress for {}; ignoring remove",
                entry.display_name()
            );
            return false;
        };
        let _guard = OperationGuard::new(Arc::clone(&entry), Arc::clone(&self.events));
        self.events.entry_updated(&entry);

        if let Err(err) = self
            .registrar
            .unregister(entry.package_family(), entry.game_directory())
            .await
        {
            self.report(&entry, err.into());
            return false;
        }

        let game_dir = entry.game_directory().to_path_buf();
        if game_dir.exists() {
            let removed = tokio::task::spawn_blocking(move || {
                std::fs::remove_dir_all(&game_dir)
                    .with_context(|| format!("failed to delete install: {}", game_dir.display()))
            })
            .await
            .unwrap_or_else(|err| Err(anyhow!("removal task failed: {err}")));
            if let Err(err) = removed {
                self.report(&entry, LifecycleError::Removal(format!("{err:#}")));
                return false;
            }
        }

        if entry.is_imported() {
            self.catalog.remove(&entry);
            debug!("removed imported version {}", entry.display_name());
        } else {
            debug!("removed catalog version {}", entry.display_name());
        }
        true
    }

    /// Import a local install archive. The target directory name is the
    /// archive's file name under the imported-versions directory.
    ///
    /// `confirm_replace` is consulted when the target belongs to an
    /// existing idle import; an existing directory the catalog does not
    /// know is never deleted.
    pub async fn import(
        &self,
        archive_path: &Path,
        confirm_replace: &(dyn Fn() -> bool + Send + Sync),
    ) -> Result<ImportOutcome, LifecycleError> {
        let file_name = archive_path
            .file_name()
            .and_then(|v| v.to_str())
            .ok_or_else(|| {
                LifecycleError::Other(anyhow!(
                    "archive path has no usable file name: {}",
                    archive_path.display()
                ))
            })?
            .to_string();
        let directory = self.layout.imported_versions_dir().join(&file_name);

        if directory.exists() {
            match self.catalog.find_imported_by_directory(&directory) {
                Some(existing) => {
                    if existing.is_busy() {
                        warn!(
                            "import {} is currently being modified; try again later",
                            existing.display_name()
                        );
                        return Ok(ImportOutcome::RefusedBusy);
                    }
                    if !confirm_replace() {
                        return Ok(ImportOutcome::Declined);
                    }
                    if !self.remove(existing).await {
                        return Ok(ImportOutcome::ReplaceFailed);
                    }
                }
                None => {
                    warn!(
                        "import target {} exists and is not a known import; aborting to avoid data loss",
                        directory.display()
                    );
                    return Ok(ImportOutcome::RefusedUnknownDirectory);
                }
            }
        }

        let entry = self.catalog.add_imported(file_name, &directory);
        let Some(_info) = entry.begin_operation(VersionState::Extracting) else {
            return Ok(ImportOutcome::RefusedBusy);
        };
        let _guard = OperationGuard::new(Arc::clone(&entry), Arc::clone(&self.events));
        self.events.entry_updated(&entry);

        let extractor = Arc::clone(&self.extractor);
        let archive = archive_path.to_path_buf();
        let destination = directory.clone();
        let extracted =
            tokio::task::spawn_blocking(move || extractor.extract(&archive, &destination))
                .await
                .map_err(|err| anyhow!("extraction task failed: {err}"));
        match extracted {
            Ok(Ok(())) => {
                info!("imported {}", entry.display_name());
                Ok(ImportOutcome::Imported(Arc::clone(&entry)))
            }
            Ok(Err(err)) => {
                self.report(&entry, err.into());
                Ok(ImportOutcome::ExtractionFailed)
            }
            Err(err) => {
                self.report(&entry, err.into());
                Ok(ImportOutcome::ExtractionFailed)
            }
        }
    }

    /// Schedule removal of every installed version (the "clean up for a
    /// store reinstall" flow). Busy entries are skipped.
    pub fn purge_installed(self: &Arc<Self>) -> Vec<JoinHandle<bool>> {
        let mut scheduled = Vec::new();
        for entry in self.catalog.entries() {
            if entry.is_installed() && !entry.is_busy() {
                scheduled.push(self.invoke_remove(entry));
            }
        }
        info!("scheduled removal of {} installed versions", scheduled.len());
        scheduled
    }

    fn report(&self, entry: &VersionEntry, error: LifecycleError) {
        warn!("operation failed for {}: {error}", entry.display_name());
        self.events.operation_failed(entry, &error);
    }
}

/// Releases the entry's busy slot on every exit path of an operation,
/// then notifies observers of the final state.
struct OperationGuard {
    entry: Arc<VersionEntry>,
    events: Arc<dyn EventSink>,
}

impl OperationGuard {
    fn new(entry: Arc<VersionEntry>, events: Arc<dyn EventSink>) -> Self {
        Self { entry, events }
    }
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        self.entry.clear_state_change();
        self.events.entry_updated(&self.entry);
    }
}

fn replace_and_extract(
    extractor: &dyn ArchiveExtractor,
    archive: &Path,
    game_dir: &Path,
) -> Result<(), LifecycleError> {
    // Full replace, never a merge.
    if game_dir.exists() {
        std::fs::remove_dir_all(game_dir).with_context(|| {
            format!("failed to remove existing install: {}", game_dir.display())
        })?;
    }
    extractor.extract(archive, game_dir)?;

    let signature = game_dir.join(SIGNATURE_FILE);
    if signature.exists() {
        std::fs::remove_file(&signature)
            .with_context(|| format!("failed to remove {}", signature.display()))?;
    }
    Ok(())
}
