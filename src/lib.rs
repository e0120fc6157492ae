//! Rekindle - a development-time live reload sidecar.
//!
//! Watches a set of directories or files, drives a user-supplied rebuild
//! callback when something changes, and pushes a reload notification over a
//! WebSocket to every connected browser client. It rides alongside a host
//! web server; it is not a web framework.
//!
//! # Architecture
//!
//! ```text
//! notify -> WatchActor -> WsActor -> Browser
//!  (fs)     (debounce,   (registry,
//!            callback)    broadcast)
//! ```
//!
//! The [`Reloader`] orchestrator spawns both actors on a background runtime
//! at construction and tears them down on [`Reloader::close`].
//!
//! # Example
//!
//! ```no_run
//! use rekindle::{ReloadOptions, Reloader};
//!
//! let reloader = Reloader::new(
//!     || println!("rebuilding templates"),
//!     35729,
//!     ReloadOptions::default().with_logging(true),
//! )?;
//! reloader.add("templates")?;
//!
//! // Host embeds the script in served pages:
//! let page = reloader.reload_script().inject_into("<html><body>hi</body></html>");
//! # let _ = page;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod logger;
mod messages;
mod protocol;
mod reloader;
mod script;
mod watch;
mod ws;

pub use error::{ConstructionError, WatchError};
pub use protocol::ReloadMessage;
pub use reloader::{ReloadOptions, Reloader};
pub use script::ReloadScript;
pub use watch::filter::ReloadPolicy;
pub use watch::types::{ChangeEvent, ChangeKind};
