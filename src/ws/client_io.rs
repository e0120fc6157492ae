use std::net::TcpStream;
use std::sync::atomic::Ordering;

use tungstenite::protocol::Message;

use super::{Registry, WsActor};
use crate::logger::log;
use crate::protocol::ReloadMessage;

/// Sweep interval for the client reader loop.
const READ_POLL_MS: u64 = 100;

impl WsActor {
    /// Complete the upgrade handshake and register the connection.
    ///
    /// A handshake failure is logged and the stream dropped; nothing reaches
    /// the registry.
    pub(super) fn add_client(&self, stream: TcpStream) {
        // Keep blocking mode during handshake, switch to non-blocking after
        match tungstenite::accept(stream) {
            Ok(mut ws) => {
                // Now set non-blocking for polling reads
                let _ = ws.get_ref().set_nonblocking(true);

                // Send connected greeting
                let greeting = ReloadMessage::connected();
                if let Err(e) = ws.send(Message::Text(greeting.to_json().into())) {
                    log!(self.log; "ws"; "failed to send connected message: {}", e);
                    return;
                }

                self.registry.register(ws);
            }
            Err(e) => {
                log!(self.log; "ws"; "handshake failed: {}", e);
            }
        }
    }

    /// Background thread polling clients for inbound frames.
    ///
    /// Inbound messages exist only for liveness detection; a close frame or
    /// read error unregisters the peer. Exits when the reloader shuts down.
    pub(super) fn client_reader_loop(
        registry: &Registry,
        shutdown: &std::sync::atomic::AtomicBool,
    ) {
        while !shutdown.load(Ordering::SeqCst) {
            std::thread::sleep(std::time::Duration::from_millis(READ_POLL_MS));
            registry.sweep();
        }
    }
}
