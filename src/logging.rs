//! Diagnostic logging port for the scanner.
//!
//! The scanner never reaches for a global logger; it is handed a
//! [`ScanLogger`] at construction. [`TracingLogger`] is the default and
//! forwards to `tracing`, so the host application decides where lines go by
//! installing a subscriber.

use std::fmt;

/// Target used for every event emitted by [`TracingLogger`].
pub const LOG_TARGET: &str = "sigma_scanner";

/// Sink for scanner diagnostics. Logging never affects match results.
pub trait ScanLogger: Send + Sync {
    fn debug(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards to `tracing::debug!` / `tracing::error!`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl ScanLogger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(target: LOG_TARGET, "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: LOG_TARGET, "{}", message);
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl ScanLogger for NoopLogger {
    fn debug(&self, _message: &str) {}

    fn error(&self, _message: &str) {}
}

impl fmt::Debug for dyn ScanLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ScanLogger")
    }
}
