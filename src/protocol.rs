//! Wire protocol for the broadcast endpoint.
//!
//! Defines the JSON message format pushed to browser clients. Presence of a
//! `reload` message is itself the trigger; the embedded client performs a
//! full page reload, while richer clients may inspect `path`/`kind` to patch
//! instead.
//!
//! # Message Types
//!
//! - `connected`: greeting sent once after the upgrade handshake
//! - `reload`: a watched file changed; carries the path and change kind

use serde::{Deserialize, Serialize};

use crate::watch::types::{ChangeEvent, ChangeKind};

/// Message sent to browser clients over the WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReloadMessage {
    /// Connection established
    Connected {
        /// Server version for compatibility check
        version: String,
    },

    /// A watched file changed; the client should refresh
    Reload {
        /// Path of the changed file
        path: String,
        /// What happened to it
        kind: ChangeKind,
    },
}

impl ReloadMessage {
    /// Create a connected greeting.
    pub fn connected() -> Self {
        Self::Connected {
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Create a reload message for a change event.
    pub fn reload(event: &ChangeEvent) -> Self {
        Self::Reload {
            path: event.path.to_string_lossy().into_owned(),
            kind: event.kind,
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"type":"reload","path":"","kind":"modified"}"#.to_string())
    }

    /// Parse from JSON string
    pub fn from_json(s: &str) -> Option<Self> {
        serde_json::from_str(s).ok()
    }
}
