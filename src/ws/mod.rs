//! WebSocket Actor - Broadcast Endpoint
//!
//! This actor is responsible for:
//! - Completing upgrade handshakes for incoming client streams
//! - Managing the pool of connected browser clients
//! - Broadcasting reload notifications to every client
//!
//! # Architecture
//!
//! ```text
//! accept loop --AddClient--> WsActor --broadcast--> clients
//! WatchActor --Broadcast-->    |
//!                         reader sweep (liveness, prune on close)
//! ```
//!
//! The actor is the single owner of the message loop; the registry mutex
//! serializes the pool against the reader sweep.

mod client_io;
mod registry;
pub(crate) mod server;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tokio::sync::mpsc;

use crate::logger::{Logger, log};
use crate::messages::WsMsg;

pub(crate) use registry::Registry;

/// WebSocket actor - manages client connections and broadcasts.
pub(crate) struct WsActor {
    /// Channel to receive messages
    rx: mpsc::Receiver<WsMsg>,
    /// Connected clients (shared with the reader sweep)
    registry: Arc<Registry>,
    /// Cancellation signal shared with the reader sweep
    shutdown: Arc<AtomicBool>,
    log: Logger,
}

impl WsActor {
    pub(crate) fn new(
        rx: mpsc::Receiver<WsMsg>,
        registry: Arc<Registry>,
        shutdown: Arc<AtomicBool>,
        log: Logger,
    ) -> Self {
        Self {
            rx,
            registry,
            shutdown,
            log,
        }
    }

    /// Run the actor event loop
    pub(crate) async fn run(mut self) {
        // Background sweep for inbound frames and closed peers
        let registry = Arc::clone(&self.registry);
        let shutdown = Arc::clone(&self.shutdown);
        std::thread::spawn(move || {
            Self::client_reader_loop(&registry, &shutdown);
        });

        while let Some(msg) = self.rx.recv().await {
            match msg {
                WsMsg::AddClient(stream) => self.add_client(stream),

                WsMsg::Broadcast(message) => {
                    self.registry.broadcast(&message.to_json());
                }

                WsMsg::Shutdown => {
                    log!(self.log; "ws"; "shutting down");
                    self.registry.close_all();
                    break;
                }
            }
        }
    }
}
