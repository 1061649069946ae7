//! Build-scoped advisory collection.
//!
//! Advisories are deduplicated by text and kept in insertion order. The sink
//! is reset when a build starts and flushed into the host's warnings when it
//! completes.

use crate::version::PACKAGE_NAME;
use indexmap::IndexSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Prefix an advisory with the package name, as every recorded message is.
#[must_use]
pub fn prefixed(text: &str) -> String {
    format!("{PACKAGE_NAME} {text}")
}

/// Deduplicated, insertion-ordered advisory messages for one build cycle.
#[derive(Debug, Default)]
pub struct AdvisorySink {
    messages: Mutex<IndexSet<String>>,
}

impl AdvisorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message. Returns `false` if it was already recorded this cycle.
    pub fn record(&self, message: impl Into<String>) -> bool {
        self.lock().insert(message.into())
    }

    /// Append every recorded message to `warnings`, in recording order.
    ///
    /// The sink keeps its contents; call [`AdvisorySink::reset`] to start a new cycle.
    pub fn flush_to(&self, warnings: &mut Vec<String>) {
        warnings.extend(self.lock().iter().cloned());
    }

    /// Drop all recorded messages.
    pub fn reset(&self) {
        self.lock().clear();
    }

    /// Number of recorded messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been recorded this cycle.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, IndexSet<String>> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
