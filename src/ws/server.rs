//! Broadcast endpoint listener.
//!
//! Binds an instance-owned loopback `TcpListener` and feeds accepted streams
//! to the WebSocket actor via its channel. Any HTTP request hitting the
//! listener is treated as an upgrade attempt; there is no other route.

use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;

use crate::error::ConstructionError;
use crate::logger::{Logger, log};
use crate::messages::WsMsg;

/// Maximum port retry attempts
const MAX_PORT_RETRIES: u16 = 10;

/// Idle backoff for the non-blocking accept loop.
const ACCEPT_POLL_MS: u64 = 100;

/// Bind the endpoint on loopback, retrying consecutive ports if in use.
///
/// Port `0` asks the OS for an ephemeral port. Returns the listener and the
/// port actually bound (which the reload script is rendered against).
pub(crate) fn bind(base_port: u16) -> Result<(TcpListener, u16), ConstructionError> {
    let mut last_error = None;

    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind(format!("127.0.0.1:{port}")) {
            Ok(listener) => {
                let bound = listener
                    .local_addr()
                    .and_then(|addr| listener.set_nonblocking(true).map(|()| addr.port()));
                match bound {
                    Ok(actual_port) => return Ok((listener, actual_port)),
                    Err(e) => {
                        last_error = Some(e);
                        continue;
                    }
                }
            }
            Err(e) => {
                last_error = Some(e);
                continue;
            }
        }
    }

    Err(ConstructionError::Bind {
        base_port,
        attempts: MAX_PORT_RETRIES,
        source: last_error
            .unwrap_or_else(|| std::io::Error::other("no bind attempt was made")),
    })
}

/// Spawn the accept loop thread.
///
/// Accepted streams are handed to the actor for the handshake. The loop
/// exits when the shutdown flag trips or the actor goes away.
pub(crate) fn start_accept_loop(
    listener: TcpListener,
    ws_tx: mpsc::Sender<WsMsg>,
    shutdown: Arc<AtomicBool>,
    log: Logger,
) {
    std::thread::spawn(move || {
        loop {
            if shutdown.load(Ordering::SeqCst) {
                break;
            }

            match listener.accept() {
                Ok((stream, addr)) => {
                    log!(log; "ws"; "incoming connection: {}", addr);

                    // Restore blocking mode for the handshake
                    let _ = stream.set_nonblocking(false);

                    if ws_tx.blocking_send(WsMsg::AddClient(stream)).is_err() {
                        break;
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(std::time::Duration::from_millis(ACCEPT_POLL_MS));
                }
                Err(e) => {
                    log!(log; "error"; "accept error: {}", e);
                    std::thread::sleep(std::time::Duration::from_millis(ACCEPT_POLL_MS));
                }
            }
        }
    });
}
