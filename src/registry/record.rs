//! Manifest record type.

// ============================================================================
// Imports
// ============================================================================

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::matcher;

// ============================================================================
// ManifestRecord
// ============================================================================

/// One discovered manifest.
///
/// # Format
///
/// ```json
/// {
///   "url": "https://edge.example.com/stream.m3u8",
///   "discoveredAt": 1718000000000,
///   "originLabel": "edge.example",
///   "sourceUrl": "https://cdn.example.com/play?video=..."
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestRecord {
    /// Canonical manifest URL, unique within its tab.
    pub url: String,

    /// First detection, milliseconds since the Unix epoch.
    pub discovered_at: u64,

    /// Host of `url` without a trailing `.com`, for display grouping.
    pub origin_label: String,

    /// URL the manifest was discovered from (wrapper, page or request URL).
    pub source_url: String,
}

impl ManifestRecord {
    /// Creates a record stamped with the current time.
    ///
    /// Returns `None` if `url` is not absolute. Hostless URLs get an empty label.
    #[must_use]
    pub fn new(url: impl Into<String>, source_url: impl Into<String>) -> Option<Self> {
        let url = url.into();
        let origin_label = matcher::origin_label(&url)?;

        Some(Self {
            url,
            discovered_at: now_millis(),
            origin_label,
            source_url: source_url.into(),
        })
    }

    /// Quality hint embedded in the URL (`720p`, `1920x1080`), if any.
    #[inline]
    #[must_use]
    pub fn quality(&self) -> Option<&str> {
        matcher::quality_hint(&self.url)
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record() {
        let record = ManifestRecord::new(
            "https://edge.example.com/1080p/stream.m3u8",
            "https://cdn.example.com/play?video=x",
        )
        .expect("absolute url");

        assert_eq!(record.origin_label, "edge.example");
        assert_eq!(record.source_url, "https://cdn.example.com/play?video=x");
        assert_eq!(record.quality(), Some("1080p"));
        assert!(record.discovered_at > 0);
    }

    #[test]
    fn test_relative_url_rejected() {
        assert!(ManifestRecord::new("/stream.m3u8", "https://a.example.com/").is_none());
    }

    #[test]
    fn test_serializes_camel_case() {
        let record =
            ManifestRecord::new("https://a.example.net/x.m3u8", "https://a.example.net/x.m3u8")
                .expect("absolute url");
        let json = serde_json::to_value(&record).expect("serialize");

        assert_eq!(json["originLabel"], "a.example.net");
        assert!(json.get("discoveredAt").is_some());
        assert!(json.get("sourceUrl").is_some());
    }
}
