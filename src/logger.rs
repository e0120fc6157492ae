//! Diagnostic output with colored module prefixes.
//!
//! Every component holds a [`Logger`] handle; the handle carries the
//! per-reloader `logging` toggle so two reloaders in one process can run at
//! different verbosity. Output goes through the `log!` macro:
//!
//! ```ignore
//! log!(self.log; "watch"; "event {}: {}", kind, path.display());
//! ```

use owo_colors::OwoColorize;
use std::io::{Write, stdout};

/// Per-instance diagnostics gate.
///
/// Cheap to copy; components capture one at construction. All output is
/// suppressed when the owning reloader was built without logging.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Logger {
    enabled: bool,
}

impl Logger {
    pub(crate) const fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub(crate) const fn enabled(&self) -> bool {
        self.enabled
    }
}

/// Log a message with a colored module prefix, gated by a [`Logger`].
///
/// # Usage
/// ```ignore
/// log!(log; "module"; "message with {} formatting", args);
/// ```
macro_rules! log {
    ($log:expr; $module:expr; $($arg:tt)*) => {{
        if $log.enabled() {
            $crate::logger::emit($module, &format!($($arg)*));
        }
    }};
}

pub(crate) use log;

/// Write one prefixed line to stdout.
#[inline]
pub(crate) fn emit(module: &str, message: &str) {
    let prefix = colorize_prefix(module);

    let mut stdout = stdout().lock();
    writeln!(stdout, "{prefix} {message}").ok();
    stdout.flush().ok();
}

/// Apply color to a module prefix based on module type
#[inline]
fn colorize_prefix(module: &str) -> String {
    let prefix = format!("[{module}]");
    match module {
        "ws" => prefix.bright_blue().bold().to_string(),
        "watch" => prefix.bright_green().bold().to_string(),
        "error" => prefix.bright_red().bold().to_string(),
        _ => prefix.bright_yellow().bold().to_string(),
    }
}
