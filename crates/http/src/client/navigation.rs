//! Hook for sending the user back to the login entry point

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Invoked by the gateway after a refresh failure has forced a logout
///
/// Whatever the user was doing is abandoned; the front end decides what the
/// login entry point looks like (a route, a prompt, a message).
pub trait Navigator: Send + Sync {
    fn to_login(&self);
}

/// Navigator that does nothing, for headless callers
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn to_login(&self) {}
}

/// Navigator that counts redirects
#[derive(Debug, Default, Clone)]
pub struct RecordingNavigator {
    redirects: Arc<AtomicUsize>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times the login entry point was requested
    pub fn redirects(&self) -> usize {
        self.redirects.load(Ordering::SeqCst)
    }
}

impl Navigator for RecordingNavigator {
    fn to_login(&self) {
        self.redirects.fetch_add(1, Ordering::SeqCst);
    }
}

impl<F> Navigator for F
where
    F: Fn() + Send + Sync,
{
    fn to_login(&self) {
        self();
    }
}
