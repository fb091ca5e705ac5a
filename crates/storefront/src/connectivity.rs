//! Process-wide "are we offline?" flag.
//!
//! One [`Connectivity`] is created at startup and handed to both the catalog
//! cache and the cart store, so a failed catalog fetch also pauses cart sync
//! and a successful one resumes it.

use std::fmt::Display;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared offline flag. Cloning shares the same flag.
#[derive(Debug, Clone, Default)]
pub struct Connectivity {
    offline: Arc<AtomicBool>,
}

impl Connectivity {
    /// Create a flag in the online state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the last remote call failed.
    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::Acquire)
    }

    /// Record a remote failure.
    pub fn mark_offline(&self, reason: &dyn Display) {
        if !self.offline.swap(true, Ordering::AcqRel) {
            tracing::warn!(reason = %reason, "Backend unreachable, switching to offline mode");
        }
    }

    /// Record a remote success.
    pub fn mark_online(&self) {
        if self.offline.swap(false, Ordering::AcqRel) {
            tracing::info!("Backend reachable again, leaving offline mode");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_online() {
        assert!(!Connectivity::new().is_offline());
    }

    #[test]
    fn test_clones_share_state() {
        let a = Connectivity::new();
        let b = a.clone();
        a.mark_offline(&"connection refused");
        assert!(b.is_offline());
        b.mark_online();
        assert!(!a.is_offline());
    }
}
