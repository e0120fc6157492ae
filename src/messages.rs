//! Actor Message Definitions
//!
//! ```text
//! WatchActor --Broadcast--> WsActor <--AddClient-- accept loop
//! ```

use std::net::TcpStream;

use crate::protocol::ReloadMessage;

/// Messages to the WebSocket actor.
///
/// All registry mutations funnel through this channel or the registry mutex;
/// no other path touches the client pool.
pub(crate) enum WsMsg {
    /// Send a notification to every registered client
    Broadcast(ReloadMessage),
    /// Add client (raw stream, handshake still pending)
    AddClient(TcpStream),
    /// Close all clients and stop
    Shutdown,
}
