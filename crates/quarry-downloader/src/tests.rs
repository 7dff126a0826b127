use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use super::*;

const ARCHIVE_SIZE: usize = 256 * 1024;

struct CountingAuth {
    succeed: bool,
    calls: AtomicU32,
}

impl CountingAuth {
    fn new(succeed: bool) -> Arc<Self> {
        Arc::new(Self {
            succeed,
            calls: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl AuthProvider for CountingAuth {
    async fn login(&self) -> Result<AuthToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.succeed {
            Ok(AuthToken {
                token: "tok".to_string(),
            })
        } else {
            Err(anyhow!("account is not enrolled in the beta program"))
        }
    }
}

struct ScriptedResolver {
    url: Option<String>,
    seen: Mutex<Vec<(String, String, bool)>>,
}

impl ScriptedResolver {
    fn new(url: Option<String>) -> Arc<Self> {
        Arc::new(Self {
            url,
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl UpdateIdentityResolver for ScriptedResolver {
    async fn resolve(
        &self,
        uuid: &str,
        revision: &str,
        auth: Option<&AuthToken>,
    ) -> Result<Option<DownloadLink>> {
        self.seen
            .lock()
            .push((uuid.to_string(), revision.to_string(), auth.is_some()));
        Ok(self.url.clone().map(|url| DownloadLink { url }))
    }
}

fn archive_body() -> Vec<u8> {
    (0..ARCHIVE_SIZE).map(|i| (i % 256) as u8).collect()
}

async fn serve_archive() -> Vec<u8> {
    archive_body()
}

async fn start_server() -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let app = Router::new().route("/archive", get(serve_archive));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, handle)
}

fn no_progress() -> impl Fn(u64, Option<u64>) + Send + Sync {
    |_, _| {}
}

#[tokio::test]
async fn missing_link_fails_with_no_download_link() {
    let resolver = ScriptedResolver::new(None);
    let service = DownloadService::new(
        Arc::clone(&resolver) as Arc<dyn UpdateIdentityResolver>,
        CountingAuth::new(true),
    );

    let tmp = tempfile::tempdir().unwrap();
    let err = service
        .download(
            "uuid-1",
            DownloadTier::Anonymous,
            &tmp.path().join("out.Appx"),
            &no_progress(),
            &CancellationToken::new(),
        )
        .await
        .expect_err("must fail");

    assert!(matches!(err, DownloadError::NoDownloadLink));
    assert_eq!(
        resolver.seen.lock().clone(),
        vec![("uuid-1".to_string(), DOWNLOAD_REVISION.to_string(), false)]
    );
}

#[tokio::test]
async fn login_runs_once_across_concurrent_authenticated_downloads() {
    let auth = CountingAuth::new(true);
    let resolver = ScriptedResolver::new(None);
    let service = Arc::new(DownloadService::new(
        Arc::clone(&resolver) as Arc<dyn UpdateIdentityResolver>,
        Arc::clone(&auth) as Arc<dyn AuthProvider>,
    ));

    let tmp = tempfile::tempdir().unwrap();
    let mut tasks = Vec::new();
    for i in 0..8 {
        let service = Arc::clone(&service);
        let destination = tmp.path().join(format!("out-{i}.Appx"));
        tasks.push(tokio::spawn(async move {
            service
                .download(
                    "uuid-beta",
                    DownloadTier::Authenticated,
                    &destination,
                    &no_progress(),
                    &CancellationToken::new(),
                )
                .await
        }));
    }
    for task in tasks {
        let result = task.await.unwrap();
        assert!(matches!(result, Err(DownloadError::NoDownloadLink)));
    }

    assert_eq!(auth.calls.load(Ordering::SeqCst), 1);
    assert!(resolver.seen.lock().iter().all(|(_, _, authed)| *authed));

    // A later caller reuses the memoized login as well.
    let result = service
        .download(
            "uuid-beta",
            DownloadTier::Authenticated,
            &tmp.path().join("late.Appx"),
            &no_progress(),
            &CancellationToken::new(),
        )
        .await;
    assert!(matches!(result, Err(DownloadError::NoDownloadLink)));
    assert_eq!(auth.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_login_is_memoized_and_not_retried() {
    let auth = CountingAuth::new(false);
    let service = DownloadService::new(
        ScriptedResolver::new(None),
        Arc::clone(&auth) as Arc<dyn AuthProvider>,
    );

    let tmp = tempfile::tempdir().unwrap();
    for _ in 0..2 {
        let err = service
            .download(
                "uuid-beta",
                DownloadTier::Authenticated,
                &tmp.path().join("out.Appx"),
                &no_progress(),
                &CancellationToken::new(),
            )
            .await
            .expect_err("must fail");
        assert!(matches!(err, DownloadError::Authentication(_)));
    }
    assert_eq!(auth.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn anonymous_tier_never_logs_in() {
    let auth = CountingAuth::new(true);
    let (addr, _server) = start_server().await;
    let service = DownloadService::new(
        ScriptedResolver::new(Some(format!("http://{addr}/archive"))),
        Arc::clone(&auth) as Arc<dyn AuthProvider>,
    );

    let tmp = tempfile::tempdir().unwrap();
    service
        .download(
            "uuid-1",
            DownloadTier::Anonymous,
            &tmp.path().join("out.Appx"),
            &no_progress(),
            &CancellationToken::new(),
        )
        .await
        .expect("must download");

    assert_eq!(auth.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn download_streams_to_file_with_progress() {
    let (addr, _server) = start_server().await;
    let service = DownloadService::new(
        ScriptedResolver::new(Some(format!("http://{addr}/archive"))),
        CountingAuth::new(true),
    );

    let tmp = tempfile::tempdir().unwrap();
    let destination = tmp.path().join("cache/Minecraft-1.20.0.1.Appx");
    let progress: Mutex<Vec<(u64, Option<u64>)>> = Mutex::new(Vec::new());
    service
        .download(
            "uuid-1",
            DownloadTier::Anonymous,
            &destination,
            &|current, total| progress.lock().push((current, total)),
            &CancellationToken::new(),
        )
        .await
        .expect("must download");

    assert_eq!(std::fs::read(&destination).expect("must read"), archive_body());

    let progress = progress.lock();
    assert!(!progress.is_empty());
    let (current, total) = *progress.last().unwrap();
    assert_eq!(current, ARCHIVE_SIZE as u64);
    assert_eq!(total, Some(ARCHIVE_SIZE as u64));
}

#[tokio::test]
async fn cancelled_download_leaves_partial_file() {
    let (addr, _server) = start_server().await;
    let service = DownloadService::new(
        ScriptedResolver::new(Some(format!("http://{addr}/archive"))),
        CountingAuth::new(true),
    );

    let tmp = tempfile::tempdir().unwrap();
    let destination = tmp.path().join("out.Appx");
    let cancel = CancellationToken::new();
    // Request cancellation as soon as the first bytes arrive.
    let cancel_on_progress = cancel.clone();
    let err = service
        .download(
            "uuid-1",
            DownloadTier::Anonymous,
            &destination,
            &move |_, _| cancel_on_progress.cancel(),
            &cancel,
        )
        .await
        .expect_err("must be cancelled");

    assert!(matches!(err, DownloadError::Cancelled));
    // The partial file stays on disk.
    assert!(destination.exists());
    let size = std::fs::metadata(&destination).expect("must stat").len();
    assert!(size > 0);
}

#[tokio::test]
async fn http_error_is_a_network_failure() {
    let (addr, _server) = start_server().await;
    let service = DownloadService::new(
        ScriptedResolver::new(Some(format!("http://{addr}/missing"))),
        CountingAuth::new(true),
    );

    let tmp = tempfile::tempdir().unwrap();
    let err = service
        .download(
            "uuid-1",
            DownloadTier::Anonymous,
            &tmp.path().join("out.Appx"),
            &no_progress(),
            &CancellationToken::new(),
        )
        .await
        .expect_err("must fail");
    assert!(matches!(err, DownloadError::Network(_)));
}
