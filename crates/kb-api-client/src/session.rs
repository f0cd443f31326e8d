//! Hook invoked when the session ends involuntarily.
//!
//! A browser front end would navigate to its login view here; the CLI prints a
//! hint. Library users inject whatever fits.

use std::sync::atomic::{AtomicUsize, Ordering};

pub trait SessionExpiredHandler: Send + Sync {
    /// Called after the token store has been cleared because of a failed refresh or
    /// a 401/403 response.
    fn on_session_expired(&self);
}

/// Logs and does nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSessionExpired;

impl SessionExpiredHandler for LogSessionExpired {
    fn on_session_expired(&self) {
        tracing::warn!("Session expired; login required");
    }
}

/// Counts expirations. Useful in tests and for callers that poll instead of react.
#[derive(Debug, Default)]
pub struct SessionExpiryCounter {
    count: AtomicUsize,
}

impl SessionExpiryCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl SessionExpiredHandler for SessionExpiryCounter {
    fn on_session_expired(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}
