//! Registry storage and operations.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::config::SnifferConfig;
use crate::host::{BadgeSink, BadgeUpdate};
use crate::identifiers::TabId;
use crate::matcher;

use super::ManifestRecord;

// ============================================================================
// Types
// ============================================================================

/// Ordered manifests of one tab, oldest first.
type ContextManifestSet = VecDeque<ManifestRecord>;

// ============================================================================
// ManifestRegistry
// ============================================================================

/// In-memory table of discovered manifests keyed by tab.
///
/// # Invariants
///
/// - Within one tab, `url` is unique (exact string match).
/// - A tab never holds more than `retention_cap` records; the oldest are
///   evicted first.
/// - A tab's set exists only after its first detection.
///
/// # Thread Safety
///
/// The dedup check and the append happen under a single lock acquisition, so
/// concurrent `record` calls for the same URL insert it once.
pub struct ManifestRegistry {
    /// Per-tab manifest sets.
    sets: Mutex<FxHashMap<TabId, ContextManifestSet>>,
    /// Maximum records per tab.
    retention_cap: usize,
    /// Badge capability.
    badge: Arc<dyn BadgeSink>,
    /// Badge background color.
    badge_color: String,
    /// Badge text color.
    badge_text_color: String,
}

impl fmt::Debug for ManifestRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManifestRegistry")
            .field("retention_cap", &self.retention_cap)
            .field("tabs", &self.sets.lock().len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ManifestRegistry - Constructor
// ============================================================================

impl ManifestRegistry {
    /// Creates an empty registry.
    ///
    /// A zero retention cap in `config` is treated as 1.
    #[must_use]
    pub fn new(config: &SnifferConfig, badge: Arc<dyn BadgeSink>) -> Self {
        Self {
            sets: Mutex::new(FxHashMap::default()),
            retention_cap: config.retention_cap.max(1),
            badge,
            badge_color: config.badge_color.clone(),
            badge_text_color: config.badge_text_color.clone(),
        }
    }

    /// Returns the per-tab retention cap.
    #[inline]
    #[must_use]
    pub fn retention_cap(&self) -> usize {
        self.retention_cap
    }
}

// ============================================================================
// ManifestRegistry - Mutations
// ============================================================================

impl ManifestRegistry {
    /// Records the manifest referenced by `source_url` for `tab_id`.
    ///
    /// Runs the matcher on `source_url`; does nothing if no manifest URL is
    /// found or the tab already holds it. Returns the inserted record.
    pub fn record(&self, tab_id: TabId, source_url: &str) -> Option<ManifestRecord> {
        let Some(manifest_url) = matcher::extract_manifest_url(source_url) else {
            trace!(tab_id = %tab_id, url = source_url, "No manifest URL in candidate");
            return None;
        };

        self.record_manifest(tab_id, &manifest_url, source_url)
    }

    /// Records `manifest_url` as a manifest without running the matcher.
    ///
    /// Used when the response itself identifies as a manifest (content-type),
    /// whatever the URL looks like.
    pub fn record_manifest(
        &self,
        tab_id: TabId,
        manifest_url: &str,
        source_url: &str,
    ) -> Option<ManifestRecord> {
        let mut sets = self.sets.lock();

        if sets
            .get(&tab_id)
            .is_some_and(|set| set.iter().any(|r| r.url == manifest_url))
        {
            trace!(tab_id = %tab_id, url = manifest_url, "Manifest already recorded");
            return None;
        }

        let record = match ManifestRecord::new(manifest_url, source_url) {
            Some(record) => record,
            None => {
                debug!(tab_id = %tab_id, url = manifest_url, "Manifest URL is not absolute");
                return None;
            }
        };

        let set = sets.entry(tab_id).or_default();
        set.push_back(record.clone());
        while set.len() > self.retention_cap {
            set.pop_front();
        }

        debug!(tab_id = %tab_id, url = manifest_url, count = set.len(), "New manifest detected");

        // Sent under the lock so badge order matches mutation order.
        self.update_badge(tab_id, set.len());
        Some(record)
    }

    /// Removes every record of `tab_id` and resets its badge.
    pub fn clear(&self, tab_id: TabId) {
        let mut sets = self.sets.lock();
        let removed = sets.remove(&tab_id);
        debug!(
            tab_id = %tab_id,
            removed = removed.as_ref().map_or(0, VecDeque::len),
            "Cleared manifests"
        );
        self.update_badge(tab_id, 0);
    }

    /// Removes every record of `tab_id` without touching the badge.
    ///
    /// For destroyed tabs, whose badge no longer exists.
    pub fn remove(&self, tab_id: TabId) {
        if self.sets.lock().remove(&tab_id).is_some() {
            debug!(tab_id = %tab_id, "Dropped manifests of closed tab");
        }
    }
}

// ============================================================================
// ManifestRegistry - Queries
// ============================================================================

impl ManifestRegistry {
    /// Returns the manifests of `tab_id`, oldest first, or an empty list.
    #[must_use]
    pub fn query(&self, tab_id: TabId) -> Vec<ManifestRecord> {
        self.sets
            .lock()
            .get(&tab_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the number of manifests held for `tab_id`.
    #[inline]
    #[must_use]
    pub fn len(&self, tab_id: TabId) -> usize {
        self.sets.lock().get(&tab_id).map_or(0, VecDeque::len)
    }

    /// Returns the number of tabs holding at least one manifest.
    #[inline]
    #[must_use]
    pub fn tab_count(&self) -> usize {
        self.sets.lock().len()
    }
}

// ============================================================================
// ManifestRegistry - Internal
// ============================================================================

impl ManifestRegistry {
    /// Pushes the current count to the badge.
    fn update_badge(&self, tab_id: TabId, count: usize) {
        self.badge.update(BadgeUpdate::for_count(
            tab_id,
            count,
            &self.badge_color,
            &self.badge_text_color,
        ));
    }
}

// ============================================================================
// Tests
// ============================================================================
