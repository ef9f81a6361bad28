//! HTTP control plane for the dispatcher.
//!
//! Exposes the work-queue core to workers over four JSON endpoints and
//! runs the two background loops the core needs: the timeout sweeper and
//! the drain watcher that shuts the process down once every input line
//! has been persisted.

pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::dispatch::WorkTracker;
use crate::error::DispatchError;

/// Seconds between drain-watcher polls.
const DRAIN_POLL_SECS: u64 = 1;

/// Seconds between drain detection and listener shutdown, so late workers
/// still receive `ALL_WORK_COMPLETE` instead of a refused connection.
const DRAIN_GRACE_SECS: u64 = 2;

/// Server bind configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Shared application state.
///
/// The tracker is the authoritative dispatch state of the process; it is
/// threaded into every handler behind one exclusive lock rather than
/// hidden in a global. Tracker operations do file I/O under that lock,
/// so all access goes through [`AppState::with_core`].
#[derive(Clone)]
pub struct AppState {
    core: Arc<Mutex<WorkTracker>>,
    /// Cancelled when the process should stop serving.
    pub shutdown: CancellationToken,
    /// Wakes the sweeper early, e.g. after a runtime timeout change.
    pub(crate) sweep_wake: Arc<Notify>,
    /// First fatal I/O error observed by any handler or background loop.
    fatal: Arc<Mutex<Option<String>>>,
}

impl AppState {
    pub fn new(tracker: WorkTracker) -> Self {
        Self {
            core: Arc::new(Mutex::new(tracker)),
            shutdown: CancellationToken::new(),
            sweep_wake: Arc::new(Notify::new()),
            fatal: Arc::new(Mutex::new(None)),
        }
    }

    /// Runs `f` against the locked tracker on the blocking thread pool.
    ///
    /// Tracker operations read and write the authoritative files, with an
    /// fsync per drain, while the lock is held; routing the whole critical
    /// section through `spawn_blocking` keeps those stalls off the async
    /// worker threads.
    pub(crate) async fn with_core<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&mut WorkTracker) -> T + Send + 'static,
        T: Send + 'static,
    {
        let core = Arc::clone(&self.core);
        tokio::task::spawn_blocking(move || {
            let mut tracker = core.lock();
            f(&mut *tracker)
        })
        .await
        .expect("tracker task panicked")
    }

    /// Records a fatal error and begins shutdown. The first error wins.
    pub(crate) fn record_fatal(&self, err: &DispatchError) {
        error!(error = %err, "fatal I/O error, shutting down");
        let mut fatal = self.fatal.lock();
        if fatal.is_none() {
            *fatal = Some(err.to_string());
        }
        drop(fatal);
        self.shutdown.cancel();
    }

    fn take_fatal(&self) -> Option<String> {
        self.fatal.lock().take()
    }
}

/// The dispatcher HTTP server.
pub struct DispatchServer {
    config: ServerConfig,
    state: AppState,
}

impl DispatchServer {
    /// Creates a server around an initialized tracker.
    pub fn new(config: ServerConfig, tracker: WorkTracker) -> Self {
        Self {
            config,
            state: AppState::new(tracker),
        }
    }

    /// Returns a handle to the shared state, mainly for tests.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Binds and serves until all work drains or a fatal error occurs.
    ///
    /// Returns `Ok(())` only when every input line has been persisted;
    /// fatal I/O surfaces as an error so the process exits non-zero.
    pub async fn run(&self) -> anyhow::Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;
        let listener = TcpListener::bind(addr).await?;
        serve(listener, self.state.clone()).await
    }
}

/// Serves on an already-bound listener.
///
/// Split out from [`DispatchServer::run`] so callers (and tests) can bind
/// to an ephemeral port first and learn the address.
pub async fn serve(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    info!("dispatcher listening on http://{}", listener.local_addr()?);

    let router = routes::create_router(state.clone()).layer(TraceLayer::new_for_http());

    let sweeper = tokio::spawn(run_sweeper(state.clone()));
    let watcher = tokio::spawn(run_drain_watcher(state.clone()));

    let shutdown = state.shutdown.clone();
    let served = axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
        })
        .await;

    sweeper.abort();
    watcher.abort();
    served?;

    if let Some(message) = state.take_fatal() {
        anyhow::bail!("fatal I/O error: {message}");
    }
    info!("all work persisted, exiting");
    Ok(())
}

/// Periodically reclaims expired issuances.
///
/// The cadence is recomputed from the configured timeout every tick, and
/// a runtime timeout change wakes the loop immediately so stale work is
/// reassessed against the new value without waiting out the old interval.
async fn run_sweeper(state: AppState) {
    loop {
        let interval = state.with_core(|tracker| tracker.sweep_interval()).await;
        tokio::select! {
            _ = state.shutdown.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
            _ = state.sweep_wake.notified() => {}
        }
        let swept = state
            .with_core(|tracker| tracker.sweep_timeouts(Instant::now()))
            .await;
        if let Err(err) = swept {
            state.record_fatal(&err);
            break;
        }
    }
}

/// Shuts the listener down once every line has been persisted.
async fn run_drain_watcher(state: AppState) {
    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => return,
            _ = tokio::time::sleep(Duration::from_secs(DRAIN_POLL_SECS)) => {}
        }
        let complete = match state.with_core(|tracker| tracker.all_work_complete()).await {
            Ok(complete) => complete,
            Err(err) => {
                state.record_fatal(&err);
                return;
            }
        };
        if complete {
            info!(
                grace_secs = DRAIN_GRACE_SECS,
                "all work complete, shutting down after grace period"
            );
            tokio::time::sleep(Duration::from_secs(DRAIN_GRACE_SECS)).await;
            state.shutdown.cancel();
            return;
        }
    }
}
