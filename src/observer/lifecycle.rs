//! Navigation and tab-close cleanup.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::debug;

use crate::identifiers::TabId;
use crate::registry::ManifestRegistry;

// ============================================================================
// Constants
// ============================================================================

/// Tab status reported when a navigation starts.
const LOADING_STATUS: &str = "loading";

// ============================================================================
// LifecycleCoordinator
// ============================================================================

/// Keeps registry state tied to tab lifecycle.
///
/// A navigation to a new top-level document clears the tab (badge reset);
/// a closed tab is dropped without a badge update since the badge is gone.
#[derive(Debug, Clone)]
pub struct LifecycleCoordinator {
    /// Target registry.
    registry: Arc<ManifestRegistry>,
}

impl LifecycleCoordinator {
    /// Creates a coordinator pruning `registry`.
    #[must_use]
    pub fn new(registry: Arc<ManifestRegistry>) -> Self {
        Self { registry }
    }

    /// Handles a tab status update.
    ///
    /// Only a `loading` status that carries a new URL counts as a navigation
    /// start. Returns `true` if the tab was cleared.
    pub fn on_tab_updated(&self, tab_id: TabId, status: &str, url: Option<&str>) -> bool {
        match url {
            Some(url) if status == LOADING_STATUS && !url.is_empty() => {
                self.on_navigation_started(tab_id, url);
                true
            }
            _ => false,
        }
    }

    /// Clears the tab on navigation start.
    pub fn on_navigation_started(&self, tab_id: TabId, url: &str) {
        debug!(tab_id = %tab_id, url, "Navigation started, clearing manifests");
        self.registry.clear(tab_id);
    }

    /// Drops the tab's records after it closed.
    pub fn on_tab_removed(&self, tab_id: TabId) {
        self.registry.remove(tab_id);
    }
}

// ============================================================================
// Tests
// ============================================================================
