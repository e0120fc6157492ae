//! Reloader orchestrator.
//!
//! Wires up and owns the sidecar: the watch primitive, the broadcast
//! endpoint, the actor runtime, and the shutdown signal. This is the only
//! module a host application talks to.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::{ConstructionError, WatchError};
use crate::logger::{Logger, log};
use crate::messages::WsMsg;
use crate::script::ReloadScript;
use crate::watch::filter::ReloadPolicy;
use crate::watch::{DEFAULT_DEBOUNCE_MS, RebuildCallback, WatchActor, WatchSet};
use crate::ws::{Registry, WsActor, server};

const CHANNEL_BUFFER: usize = 32;

/// Interval at which the runtime loop checks for the shutdown signal.
const SHUTDOWN_POLL_MS: u64 = 100;

/// Grace period for the WebSocket actor to close its clients on shutdown.
const WS_DRAIN_TIMEOUT_MS: u64 = 500;

// =============================================================================
// Options
// =============================================================================

/// Configuration for [`Reloader::new`].
///
/// An open option set: fields are private and reached through `with_*`
/// builders, so new knobs never break existing callers.
#[derive(Debug, Clone)]
pub struct ReloadOptions {
    logging: bool,
    policy: ReloadPolicy,
    debounce_ms: u64,
}

impl Default for ReloadOptions {
    fn default() -> Self {
        Self {
            logging: false,
            policy: ReloadPolicy::default(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl ReloadOptions {
    /// Toggle diagnostic output for watch events, errors, and connection
    /// lifecycle transitions. Default: off.
    #[must_use]
    pub fn with_logging(mut self, logging: bool) -> Self {
        self.logging = logging;
        self
    }

    /// Which changed files warrant a rebuild and a notification.
    /// Default: [`ReloadPolicy::Markup`].
    #[must_use]
    pub fn with_policy(mut self, policy: ReloadPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Quiet window before a burst of changes is released, in milliseconds.
    /// Default: 300.
    #[must_use]
    pub fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }
}

// =============================================================================
// Reloader
// =============================================================================

/// The live-reload sidecar.
///
/// Construction spawns the background loops; [`Reloader::close`] (or drop)
/// tears them down. One instance per host server; instances own their
/// endpoint and never collide.
pub struct Reloader {
    watch_set: WatchSet,
    registry: Arc<Registry>,
    script: ReloadScript,
    port: u16,
    shutdown: Arc<AtomicBool>,
    shutdown_tx: channel::Sender<()>,
    runtime_thread: Mutex<Option<JoinHandle<()>>>,
    log: Logger,
}

impl Reloader {
    /// Build the sidecar and start its background loops.
    ///
    /// `callback` is the rebuild hook, invoked from the watch-event loop
    /// after each debounced batch of changes. `ws_port` selects the loopback
    /// TCP port for the broadcast endpoint (`127.0.0.1` only); if it is in
    /// use the next nine ports are tried, and `0` asks the OS for any free
    /// port. The reload script is rendered against the port actually bound.
    ///
    /// # Errors
    ///
    /// Fails if the watch primitive cannot be created, no port could be
    /// bound, or the script template fails to render. Nothing keeps running
    /// after an error.
    pub fn new<F>(
        callback: F,
        ws_port: u16,
        options: ReloadOptions,
    ) -> Result<Self, ConstructionError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let log = Logger::new(options.logging);

        // Watch primitive first: events buffer in the channel while the
        // rest of the construction runs
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();
        let watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })
        .map_err(ConstructionError::Watcher)?;
        let watch_set = WatchSet::new(watcher);

        let (listener, port) = server::bind(ws_port)?;
        let script = ReloadScript::render(port)?;
        log!(log; "ws"; "listening on ws://127.0.0.1:{}", port);

        let shutdown = Arc::new(AtomicBool::new(false));
        let (shutdown_tx, shutdown_rx) = channel::unbounded::<()>();
        let (ws_tx, ws_rx) = mpsc::channel::<WsMsg>(CHANNEL_BUFFER);
        let registry = Arc::new(Registry::new(log));

        server::start_accept_loop(listener, ws_tx.clone(), Arc::clone(&shutdown), log);

        let callback: RebuildCallback = Arc::new(callback);
        let watch_actor = WatchActor::new(
            notify_rx,
            watch_set.clone(),
            ws_tx.clone(),
            Duration::from_millis(options.debounce_ms),
            options.policy.clone(),
            callback,
            Arc::clone(&shutdown),
            log,
        );
        let ws_actor = WsActor::new(ws_rx, Arc::clone(&registry), Arc::clone(&shutdown), log);

        let runtime_thread = std::thread::spawn(move || {
            run_actor_system(watch_actor, ws_actor, ws_tx, shutdown_rx, log);
        });

        Ok(Self {
            watch_set,
            registry,
            script,
            port,
            shutdown,
            shutdown_tx,
            runtime_thread: Mutex::new(Some(runtime_thread)),
            log,
        })
    }

    /// Register a path (file or directory, watched recursively).
    ///
    /// Safe to call while the event loop is running. Re-adding a registered
    /// path is a no-op.
    ///
    /// # Errors
    ///
    /// [`WatchError::NotFound`] for a nonexistent path (previously
    /// registered targets are unaffected), [`WatchError::Closed`] after
    /// [`Reloader::close`].
    pub fn add(&self, path: impl AsRef<Path>) -> Result<(), WatchError> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(WatchError::Closed);
        }

        let path = path.as_ref();
        self.watch_set.add(path)?;
        log!(self.log; "watch"; "watching {} ({} target(s))",
            path.display(), self.watch_set.target_count());
        Ok(())
    }

    /// Un-register a path. Unknown paths are a no-op; other targets keep
    /// their watches.
    ///
    /// # Errors
    ///
    /// [`WatchError::Closed`] after [`Reloader::close`]; watch-primitive
    /// failures as [`WatchError::Notify`].
    pub fn remove(&self, path: impl AsRef<Path>) -> Result<(), WatchError> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(WatchError::Closed);
        }

        let path = path.as_ref();
        self.watch_set.remove(path)?;
        log!(self.log; "watch"; "unwatching {}", path.display());
        Ok(())
    }

    /// The pre-rendered script for the host to embed in served pages.
    pub fn reload_script(&self) -> &ReloadScript {
        &self.script
    }

    /// The loopback port the broadcast endpoint is bound to.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Number of currently connected clients.
    pub fn client_count(&self) -> usize {
        self.registry.len()
    }

    /// Stop the event loop, release the watch primitive, and close every
    /// connection. Idempotent; a second call returns immediately.
    ///
    /// May block briefly if the rebuild callback is mid-flight; the loop is
    /// never interrupted inside the callback.
    pub fn close(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }

        log!(self.log; "reload"; "shutting down");
        self.watch_set.close();
        let _ = self.shutdown_tx.send(());

        if let Some(handle) = self.runtime_thread.lock().take() {
            wait_for_shutdown(handle, self.log);
        }
    }
}

impl Drop for Reloader {
    fn drop(&mut self) {
        self.close();
    }
}

// =============================================================================
// Actor runtime
// =============================================================================

fn run_actor_system(
    watch_actor: WatchActor,
    ws_actor: WsActor,
    ws_tx: mpsc::Sender<WsMsg>,
    shutdown_rx: channel::Receiver<()>,
    log: Logger,
) {
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            log!(log; "error"; "failed to create actor runtime: {}", e);
            return;
        }
    };

    rt.block_on(run_actors(watch_actor, ws_actor, ws_tx, shutdown_rx, log));
    // Dropping the runtime cancels the watch task at its next suspension
    // point, never inside the rebuild callback
}

async fn run_actors(
    watch_actor: WatchActor,
    ws_actor: WsActor,
    ws_tx: mpsc::Sender<WsMsg>,
    shutdown_rx: channel::Receiver<()>,
    log: Logger,
) {
    let watch_handle = tokio::spawn(watch_actor.run());
    let ws_handle = tokio::spawn(ws_actor.run());

    loop {
        if shutdown_rx.try_recv().is_ok() {
            log!(log; "reload"; "shutdown signal received");
            break;
        }
        if watch_handle.is_finished() && ws_handle.is_finished() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(SHUTDOWN_POLL_MS)).await;
    }

    // Drain the client pool before the runtime goes away
    let _ = ws_tx.send(WsMsg::Shutdown).await;
    let _ = tokio::time::timeout(Duration::from_millis(WS_DRAIN_TIMEOUT_MS), ws_handle).await;
}

/// Wait for the actor runtime to drain (max 2 seconds).
fn wait_for_shutdown(handle: JoinHandle<()>, log: Logger) {
    for _ in 0..40 {
        if handle.is_finished() {
            let _ = handle.join();
            return;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    log!(log; "reload"; "actor runtime still draining, detaching");
}

// =============================================================================
// Tests
// =============================================================================
