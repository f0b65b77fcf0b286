//! Passive network observation.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::debug;

use crate::config::SnifferConfig;
use crate::identifiers::TabId;
use crate::protocol::ResponseHeader;
use crate::registry::{ManifestRecord, ManifestRegistry};

// ============================================================================
// NetworkObserver
// ============================================================================

/// Feeds host network events into the registry.
///
/// Two paths record manifests:
///
/// - completed requests whose URL the matcher recognizes
/// - responses whose `content-type` names an HLS playlist, whatever the URL
///   looks like (the request URL is stored as the manifest URL)
#[derive(Debug, Clone)]
pub struct NetworkObserver {
    /// Target registry.
    registry: Arc<ManifestRegistry>,
    /// Content-type substrings, matched case-sensitively.
    manifest_content_types: Vec<String>,
}

impl NetworkObserver {
    /// Creates an observer recording into `registry`.
    #[must_use]
    pub fn new(registry: Arc<ManifestRegistry>, config: &SnifferConfig) -> Self {
        Self {
            registry,
            manifest_content_types: config.manifest_content_types.clone(),
        }
    }

    /// Handles a completed request.
    pub fn on_request_completed(&self, tab_id: TabId, url: &str) -> Option<ManifestRecord> {
        self.registry.record(tab_id, url)
    }

    /// Handles received response headers.
    pub fn on_headers_received(
        &self,
        tab_id: TabId,
        url: &str,
        headers: &[ResponseHeader],
    ) -> Option<ManifestRecord> {
        let content_type = headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case("content-type"))?;

        if !self.is_manifest_content_type(&content_type.value) {
            return None;
        }

        debug!(tab_id = %tab_id, url, content_type = %content_type.value, "Manifest content type");
        self.registry.record_manifest(tab_id, url, url)
    }

    /// Returns `true` if a content-type value names an HLS playlist.
    #[must_use]
    pub fn is_manifest_content_type(&self, value: &str) -> bool {
        self.manifest_content_types
            .iter()
            .any(|needle| value.contains(needle.as_str()))
    }
}

// ============================================================================
// Tests
// ============================================================================
