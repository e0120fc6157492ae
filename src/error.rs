//! Public error types.
//!
//! Construction-time failures are returned to the caller (fail loudly, fail
//! fast). Steady-state runtime failures (watcher errors, connection errors,
//! callback panics) are logged and absorbed so the long-running sidecar
//! keeps functioning; none of them surface here.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// ConstructionError
// ============================================================================

/// Failure while building a [`Reloader`](crate::Reloader).
///
/// The returned object must not be used; nothing keeps running after any of
/// these.
#[derive(Debug, Error)]
pub enum ConstructionError {
    /// The OS watch primitive could not be created.
    #[error("failed to create filesystem watcher")]
    Watcher(#[source] notify::Error),

    /// No port in the retry window could be bound for the broadcast endpoint.
    #[error("failed to bind websocket endpoint after {attempts} attempts (ports {base_port}-)")]
    Bind {
        base_port: u16,
        attempts: u16,
        #[source]
        source: std::io::Error,
    },

    /// The embedded reload script template could not be rendered.
    #[error("reload script template is malformed: {0}")]
    Script(String),
}

// ============================================================================
// WatchError
// ============================================================================

/// Failure while registering or un-registering a watch target.
///
/// Does not affect previously registered targets or the running loops.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The path does not exist; nothing was registered.
    #[error("watch target does not exist: {0}")]
    NotFound(PathBuf),

    /// The reloader was already closed.
    #[error("reloader is closed")]
    Closed,

    /// The underlying watch primitive rejected the path.
    #[error("failed to update watch target `{path}`")]
    Notify {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display_names_path() {
        let err = WatchError::NotFound(PathBuf::from("/does/not/exist"));
        assert!(format!("{err}").contains("/does/not/exist"));
    }

    #[test]
    fn test_bind_error_display() {
        let err = ConstructionError::Bind {
            base_port: 35729,
            attempts: 10,
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"),
        };
        let display = format!("{err}");
        assert!(display.contains("35729"));
        assert!(display.contains("10"));
    }
}
