//! Diagnostic notices emitted by the search and fetch clients
//!
//! Clients never write to a terminal. They report progress and non-fatal
//! conditions (such as a search that returned nothing) through a
//! [`Notifier`] supplied at construction.

use std::sync::Arc;

/// Sink for informational and error notices
pub trait Notifier: Send + Sync {
    /// Report an informational notice
    fn notify_info(&self, message: &str);

    /// Report a failure notice
    fn notify_error(&self, message: &str);
}

/// Forwards notices to `tracing` at INFO and ERROR level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify_info(&self, message: &str) {
        tracing::info!(target: "searchkit::notify", "{}", message);
    }

    fn notify_error(&self, message: &str) {
        tracing::error!(target: "searchkit::notify", "{}", message);
    }
}

/// Discards every notice
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify_info(&self, _message: &str) {}

    fn notify_error(&self, _message: &str) {}
}

pub(crate) fn default_notifier() -> Arc<dyn Notifier> {
    Arc::new(TracingNotifier)
}
