//! Reporter trait for dependency injection
//!
//! Core logic reports progress and diagnostics through this port so that it
//! is not coupled to a particular logging backend.

use std::error::Error as StdError;

pub trait Reporter: Send + Sync {
    /// Log a debug message.
    fn debug(&self, msg: &str);

    /// Log a debug message together with the error that caused it.
    fn debug_with(&self, msg: &str, cause: &dyn StdError);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a warning message.
    fn warn(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);

    /// Log an error message together with its cause.
    fn error_with(&self, msg: &str, cause: &dyn StdError);

    /// Whether debug output is going anywhere (lets callers skip building
    /// expensive debug strings).
    fn is_debug_enabled(&self) -> bool;
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn debug(&self, msg: &str) {
        (**self).debug(msg);
    }
    fn debug_with(&self, msg: &str, cause: &dyn StdError) {
        (**self).debug_with(msg, cause);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn warn(&self, msg: &str) {
        (**self).warn(msg);
    }
    fn error(&self, msg: &str) {
        (**self).error(msg);
    }
    fn error_with(&self, msg: &str, cause: &dyn StdError) {
        (**self).error_with(msg, cause);
    }
    fn is_debug_enabled(&self) -> bool {
        (**self).is_debug_enabled()
    }
}

/// A no-op reporter for silent operations (e.g., testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn debug(&self, _: &str) {}
    fn debug_with(&self, _: &str, _: &dyn StdError) {}
    fn info(&self, _: &str) {}
    fn warn(&self, _: &str) {}
    fn error(&self, _: &str) {}
    fn error_with(&self, _: &str, _: &dyn StdError) {}
    fn is_debug_enabled(&self) -> bool {
        false
    }
}

/// Forwards every report to `tracing` under the `liberty` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn debug(&self, msg: &str) {
        tracing::debug!(target: "liberty", "{msg}");
    }
    fn debug_with(&self, msg: &str, cause: &dyn StdError) {
        tracing::debug!(target: "liberty", cause = %cause, "{msg}");
    }
    fn info(&self, msg: &str) {
        tracing::info!(target: "liberty", "{msg}");
    }
    fn warn(&self, msg: &str) {
        tracing::warn!(target: "liberty", "{msg}");
    }
    fn error(&self, msg: &str) {
        tracing::error!(target: "liberty", "{msg}");
    }
    fn error_with(&self, msg: &str, cause: &dyn StdError) {
        tracing::error!(target: "liberty", cause = %cause, "{msg}");
    }
    fn is_debug_enabled(&self) -> bool {
        tracing::enabled!(target: "liberty", tracing::Level::DEBUG)
    }
}

/// Captures reports in memory so tests can assert on diagnostics.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct MemoryReporter {
    lines: std::sync::Mutex<Vec<(&'static str, String)>>,
}

#[cfg(test)]
impl MemoryReporter {
    fn push(&self, level: &'static str, msg: String) {
        self.lines.lock().unwrap().push((level, msg));
    }

    pub(crate) fn contains(&self, level: &str, needle: &str) -> bool {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }
}

#[cfg(test)]
impl Reporter for MemoryReporter {
    fn debug(&self, msg: &str) {
        self.push("debug", msg.to_string());
    }
    fn debug_with(&self, msg: &str, cause: &dyn StdError) {
        self.push("debug", format!("{msg}: {cause}"));
    }
    fn info(&self, msg: &str) {
        self.push("info", msg.to_string());
    }
    fn warn(&self, msg: &str) {
        self.push("warn", msg.to_string());
    }
    fn error(&self, msg: &str) {
        self.push("error", msg.to_string());
    }
    fn error_with(&self, msg: &str, cause: &dyn StdError) {
        self.push("error", format!("{msg}: {cause}"));
    }
    fn is_debug_enabled(&self) -> bool {
        true
    }
}
