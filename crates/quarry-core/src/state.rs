use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionState {
    Initializing,
    Downloading,
    Extracting,
    Registering,
    Launching,
    Uninstalling,
}

/// Ephemeral per-operation state. Created when an operation claims an
/// entry, dropped when the busy slot is cleared.
///
/// Progress fields are only meaningful while `Downloading`; the
/// cancellation slot is only occupied while the download phase can still
/// be cancelled.
#[derive(Debug)]
pub struct StateChangeInfo {
    state: Mutex<VersionState>,
    downloaded_bytes: AtomicU64,
    total_size: AtomicU64,
    cancel: Mutex<Option<CancellationToken>>,
}

impl StateChangeInfo {
    pub fn new(state: VersionState) -> Self {
        Self {
            state: Mutex::new(state),
            downloaded_bytes: AtomicU64::new(0),
            total_size: AtomicU64::new(0),
            cancel: Mutex::new(None),
        }
    }

    pub fn state(&self) -> VersionState {
        *self.state.lock()
    }

    pub fn set_state(&self, state: VersionState) {
        *self.state.lock() = state;
    }

    pub fn downloaded_bytes(&self) -> u64 {
        self.downloaded_bytes.load(Ordering::Relaxed)
    }

    pub fn set_downloaded_bytes(&self, bytes: u64) {
        self.downloaded_bytes.store(bytes, Ordering::Relaxed);
    }

    pub fn total_size(&self) -> u64 {
        self.total_size.load(Ordering::Relaxed)
    }

    pub fn set_total_size(&self, bytes: u64) {
        self.total_size.store(bytes, Ordering::Relaxed);
    }

    pub fn attach_cancel(&self, token: CancellationToken) {
        *self.cancel.lock() = Some(token);
    }

    /// Drop the token once the download phase is over; later phases run to
    /// completion or failure.
    pub fn clear_cancel(&self) {
        *self.cancel.lock() = None;
    }

    pub fn can_cancel(&self) -> bool {
        self.cancel.lock().is_some()
    }

    /// The cancel command: requests cooperative cancellation of the
    /// in-flight download, if one is still cancellable.
    pub fn request_cancel(&self) -> bool {
        match &*self.cancel.lock() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_progress_indeterminate(&self) -> bool {
        !matches!(self.state(), VersionState::Downloading)
    }

    pub fn display_status(&self) -> String {
        match self.state() {
            VersionState::Initializing => "Preparing...".to_string(),
            VersionState::Downloading => format!(
                "Downloading... {}MiB/{}MiB",
                self.downloaded_bytes() / 1024 / 1024,
                self.total_size() / 1024 / 1024
            ),
            VersionState::Extracting => "Extracting...".to_string(),
            VersionState::Registering => "Registering package...".to_string(),
            VersionState::Launching => "Launching...".to_string(),
            VersionState::Uninstalling => "Uninstalling...".to_string(),
        }
    }
}
