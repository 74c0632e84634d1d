//! Login Navigation
//!
//! What happens to the user when the backend rejects the session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Capability to send the user to the login view
pub trait Navigator: Send + Sync {
    fn navigate_to_login(&self, login_url: &str);
}

/// Terminal navigator: tells the operator where to sign in again
#[derive(Debug, Default)]
pub struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate_to_login(&self, login_url: &str) {
        tracing::warn!("Session ended, sign in again at {}", login_url);
        eprintln!("Session expired. Sign in again at {}", login_url);
    }
}

/// Navigates at most once per expired session
///
/// Several in-flight requests can all come back 401; only the first one
/// navigates. The latch re-arms once a request is answered with anything
/// other than 401.
pub struct LoginRedirect {
    navigator: Arc<dyn Navigator>,
    pending: AtomicBool,
}

impl LoginRedirect {
    pub fn new(navigator: Arc<dyn Navigator>) -> Self {
        Self {
            navigator,
            pending: AtomicBool::new(false),
        }
    }

    /// Navigate unless a redirect is already pending. Returns true if this
    /// call navigated.
    pub fn redirect(&self, login_url: &str) -> bool {
        if self
            .pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.navigator.navigate_to_login(login_url);
        true
    }

    /// Allow the next 401 to navigate again
    pub fn rearm(&self) {
        self.pending.store(false, Ordering::Release);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}
