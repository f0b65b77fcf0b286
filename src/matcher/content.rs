//! Free-text manifest scanning.
//!
//! Used on script bodies, response bodies and rendered page markup.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

// ============================================================================
// Patterns
// ============================================================================

/// Manifest URL patterns, each applied independently over the whole text.
///
/// When a pattern has a capture group the group is the URL, otherwise the
/// whole match is.
static MANIFEST_PATTERNS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        // Bare URL with a .m3u8 segment
        r#"(?i)https?://[^\s"']+\.m3u8[^\s"']*"#,
        // m3u8 somewhere after the query separator
        r#"(?i)https?://[^\s"']*[?&].*m3u8[^\s"']*"#,
        r#"(?i)"(https?://[^"]*\.m3u8[^"]*)""#,
        r#"(?i)'(https?://[^']*\.m3u8[^']*)'"#,
    ]
    .map(|pattern| Regex::new(pattern).expect("valid manifest pattern"))
});

// ============================================================================
// Scanning
// ============================================================================

/// Scans free-form text for absolute manifest URLs.
///
/// Every match must parse as an absolute URL on its own. Duplicates found by
/// different patterns (for example the same URL in double and single quotes)
/// collapse into one entry.
#[must_use]
pub fn extract_manifest_urls_from_text(content: &str) -> BTreeSet<String> {
    let mut found = BTreeSet::new();

    if content.is_empty() {
        return found;
    }

    for pattern in MANIFEST_PATTERNS.iter() {
        for captures in pattern.captures_iter(content) {
            let Some(matched) = captures.get(1).or_else(|| captures.get(0)) else {
                continue;
            };

            let candidate = matched.as_str();
            if Url::parse(candidate).is_ok() {
                found.insert(candidate.to_string());
            }
        }
    }

    found
}

// ============================================================================
// Tests
// ============================================================================
