//! Watch Actor
//!
//! Drains the filesystem event stream and error stream on a single loop,
//! debounces bursts, applies the reload policy, drives the rebuild callback,
//! and forwards one notification per surviving path to the WebSocket actor.
//!
//! Architecture:
//! ```text
//! Watcher → Debouncer (pure timing) → ReloadPolicy (suffix filter) → callback + broadcast
//! ```

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use notify::RecommendedWatcher;
use parking_lot::Mutex;
use tokio::sync::mpsc;

// Reload-worthiness policy (suffix filter).
pub(crate) mod filter;
// Shared change event types.
pub(crate) mod types;
// Pure timing and deduplication.
mod debouncer;
// Watch root add/remove/re-attach lifecycle.
mod roots;

#[cfg(test)]
mod tests;

use crate::error::WatchError;
use crate::logger::{Logger, log};
use crate::messages::WsMsg;
use crate::protocol::ReloadMessage;

use debouncer::Debouncer;
use filter::ReloadPolicy;
use roots::WatchRoots;
use types::ChangeEvent;

pub(crate) use debouncer::DEFAULT_DEBOUNCE_MS;

/// Rebuild hook supplied by the host; runs on the watch-event loop.
pub(crate) type RebuildCallback = Arc<dyn Fn() + Send + Sync + 'static>;

/// Buffer between the notify bridge thread and the event loop. A slow
/// callback backpressures the bridge rather than dropping events.
const EVENT_CHANNEL_BUFFER: usize = 64;

/// The watch primitive plus its root bookkeeping, shared between the
/// orchestrator (add/remove/close) and the event loop (maintain).
///
/// Lock order is watcher, then roots; both sides keep to it.
#[derive(Clone)]
pub(crate) struct WatchSet {
    watcher: Arc<Mutex<Option<RecommendedWatcher>>>,
    roots: Arc<Mutex<WatchRoots>>,
}

impl WatchSet {
    pub(crate) fn new(watcher: RecommendedWatcher) -> Self {
        Self {
            watcher: Arc::new(Mutex::new(Some(watcher))),
            roots: Arc::new(Mutex::new(WatchRoots::new())),
        }
    }

    /// Register a path for observation.
    pub(crate) fn add(&self, path: &Path) -> Result<(), WatchError> {
        let mut watcher = self.watcher.lock();
        let Some(watcher) = watcher.as_mut() else {
            return Err(WatchError::Closed);
        };
        self.roots.lock().add(watcher, path)
    }

    /// Un-register a path; other targets keep their watches.
    pub(crate) fn remove(&self, path: &Path) -> Result<(), WatchError> {
        let mut watcher = self.watcher.lock();
        let Some(watcher) = watcher.as_mut() else {
            return Err(WatchError::Closed);
        };
        self.roots.lock().remove(watcher, path)
    }

    /// Drop the watch primitive, releasing every OS watch handle.
    pub(crate) fn close(&self) {
        *self.watcher.lock() = None;
    }

    pub(crate) fn target_count(&self) -> usize {
        self.roots.lock().desired_len()
    }

    /// Re-attach roots that were deleted and recreated.
    fn maintain(&self, log: Logger) {
        let mut watcher = self.watcher.lock();
        let Some(watcher) = watcher.as_mut() else {
            return;
        };
        let reattached = self.roots.lock().maintain(watcher);
        if reattached > 0 {
            log!(log; "watch"; "re-attached {} watch root(s)", reattached);
        }
    }
}

/// Watch actor - owns the event loop.
pub(crate) struct WatchActor {
    /// Channel carrying notify results (sync -> async bridge)
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    watch_set: WatchSet,
    /// Channel to the WebSocket actor
    ws_tx: mpsc::Sender<WsMsg>,
    debounce: Duration,
    policy: ReloadPolicy,
    callback: RebuildCallback,
    shutdown: Arc<AtomicBool>,
    log: Logger,
}

impl WatchActor {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
        watch_set: WatchSet,
        ws_tx: mpsc::Sender<WsMsg>,
        debounce: Duration,
        policy: ReloadPolicy,
        callback: RebuildCallback,
        shutdown: Arc<AtomicBool>,
        log: Logger,
    ) -> Self {
        Self {
            notify_rx,
            watch_set,
            ws_tx,
            debounce,
            policy,
            callback,
            shutdown,
            log,
        }
    }

    /// Run the actor event loop
    pub(crate) async fn run(self) {
        let WatchActor {
            notify_rx,
            watch_set,
            ws_tx,
            debounce,
            policy,
            callback,
            shutdown,
            log,
        } = self;

        let (async_tx, mut async_rx) = mpsc::channel::<notify::Event>(EVENT_CHANNEL_BUFFER);

        // Bridge thread: notify delivers on its own thread, the loop is
        // async. Watch errors are non-fatal; log and keep draining.
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break; // Receiver dropped
                        }
                    }
                    Err(e) => log!(log; "watch"; "notify error: {}", e),
                }
            }
        });

        let mut debouncer = Debouncer::new(debounce);

        loop {
            tokio::select! {
                biased;
                Some(event) = async_rx.recv() => {
                    log!(log; "watch"; "raw notify: {:?} {:?}", event.kind, event.paths);
                    debouncer.add_event(&event);
                }
                _ = tokio::time::sleep(debouncer.sleep_duration()) => {
                    if shutdown.load(Ordering::SeqCst) {
                        break;
                    }

                    // Ensure watch roots remain attached.
                    watch_set.maintain(log);

                    let Some(changes) = debouncer.take_if_ready() else {
                        continue;
                    };

                    let mut events: Vec<ChangeEvent> = changes
                        .into_iter()
                        .filter(|(path, _)| policy.accepts(path))
                        .map(|(path, kind)| ChangeEvent { path, kind })
                        .collect();
                    if events.is_empty() {
                        continue;
                    }
                    events.sort_by(|a, b| a.path.cmp(&b.path));

                    for event in &events {
                        log!(log; "watch"; "event {}: {}", event.kind.label(), event.path.display());
                    }

                    invoke_callback(&callback, log);

                    let mut disconnected = false;
                    for event in events {
                        if shutdown.load(Ordering::SeqCst) {
                            return;
                        }
                        let notification = WsMsg::Broadcast(ReloadMessage::reload(&event));
                        if ws_tx.send(notification).await.is_err() {
                            disconnected = true;
                            break;
                        }
                    }
                    if disconnected {
                        break; // WebSocket actor shut down
                    }
                }
            }
        }
    }
}

/// Run the rebuild callback, containing a panic so the loop survives.
fn invoke_callback(callback: &RebuildCallback, log: Logger) {
    if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(|| callback())) {
        log!(log; "error"; "rebuild callback panicked: {}", panic_message(&*panic));
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "opaque panic payload"
    }
}
