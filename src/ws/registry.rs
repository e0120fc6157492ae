//! Connection registry and broadcaster.
//!
//! Keyed map from connection identity to its socket, guarded by a single
//! mutex. Mutated from three places: the actor loop (insert after upgrade),
//! the reader sweep (remove on close/error), and broadcast (remove on send
//! failure); every path goes through this one lock.

use std::net::TcpStream;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tungstenite::WebSocket;
use tungstenite::protocol::Message;

use crate::logger::{Logger, log};

/// Identity of a registered client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ClientId(u64);

/// Live client pool. One per reloader instance.
pub(crate) struct Registry {
    clients: Mutex<FxHashMap<ClientId, WebSocket<TcpStream>>>,
    next_id: AtomicU64,
    log: Logger,
}

impl Registry {
    pub(crate) fn new(log: Logger) -> Self {
        Self {
            clients: Mutex::new(FxHashMap::default()),
            next_id: AtomicU64::new(0),
            log,
        }
    }

    /// Add a connection after a successful upgrade.
    pub(crate) fn register(&self, ws: WebSocket<TcpStream>) -> ClientId {
        let id = ClientId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut clients = self.clients.lock();
        clients.insert(id, ws);
        log!(self.log; "ws"; "client {:?} connected (total: {})", id, clients.len());
        id
    }

    /// Remove a connection by identity, releasing its transport.
    /// Safe to call for an already-removed id.
    pub(crate) fn unregister(&self, id: ClientId) -> bool {
        let mut clients = self.clients.lock();
        match clients.remove(&id) {
            Some(_) => {
                log!(self.log; "ws"; "client {:?} removed (total: {})", id, clients.len());
                true
            }
            None => false,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.clients.lock().len()
    }

    /// Send `text` to every registered client.
    ///
    /// Each connection gets an independent delivery attempt; a failed send is
    /// a disconnect (the client is dropped from the pool and its transport
    /// released). Never fails, never panics.
    pub(crate) fn broadcast(&self, text: &str) {
        let msg = Message::Text(text.into());

        let mut clients = self.clients.lock();
        if clients.is_empty() {
            log!(self.log; "ws"; "no clients connected");
            return;
        }

        let count = clients.len();
        clients.retain(|id, ws| match ws.send(msg.clone()) {
            Ok(()) => true,
            Err(e) => {
                log!(self.log; "ws"; "client {:?} disconnected: {}", id, e);
                false
            }
        });
        log!(self.log; "ws"; "broadcast to {} clients", count);
    }

    /// Poll every client for inbound frames once, pruning closed peers.
    ///
    /// Inbound messages carry no meaning; reading them only detects liveness.
    /// Sockets are non-blocking, so a quiet client costs one `WouldBlock`.
    pub(crate) fn sweep(&self) {
        let mut dead = Vec::new();

        {
            let mut clients = self.clients.lock();
            for (id, ws) in clients.iter_mut() {
                match ws.read() {
                    Ok(Message::Close(_)) => {
                        log!(self.log; "ws"; "client {:?} closed", id);
                        dead.push(*id);
                    }
                    Ok(_) => {}
                    Err(tungstenite::Error::Io(ref e))
                        if e.kind() == std::io::ErrorKind::WouldBlock => {}
                    Err(e) => {
                        log!(self.log; "ws"; "client {:?} read failed: {}", id, e);
                        dead.push(*id);
                    }
                }
            }
        }

        for id in dead {
            self.unregister(id);
        }
    }

    /// Close every connection and empty the pool.
    pub(crate) fn close_all(&self) {
        let mut clients = self.clients.lock();
        for (_, mut ws) in clients.drain() {
            let _ = ws.close(None);
            let _ = ws.flush();
        }
    }
}
