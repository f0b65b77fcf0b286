//! Single-URL manifest extraction.

// ============================================================================
// Imports
// ============================================================================

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

// ============================================================================
// Constants
// ============================================================================

/// Manifest file suffix, compared case-insensitively.
const MANIFEST_SUFFIX: &str = ".m3u8";

/// Query parameters that commonly carry a wrapped manifest URL, in priority order.
pub const MANIFEST_QUERY_PARAMS: [&str; 7] =
    ["url", "src", "source", "stream", "video", "link", "file"];

/// Resolution or frame-size hint inside a URL (`720p`, `1280x720`).
static QUALITY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+p|\d+x\d+)").expect("valid quality pattern"));

// ============================================================================
// Extraction
// ============================================================================

/// Extracts the manifest URL referenced by an absolute `candidate` URL.
///
/// Returns `candidate` unchanged when its path ends in `.m3u8`, otherwise the
/// percent-decoded value of the first [`MANIFEST_QUERY_PARAMS`] entry whose
/// value contains `.m3u8`. Returns `None` if `candidate` is not a URL or no
/// rule matches.
#[must_use]
pub fn extract_manifest_url(candidate: &str) -> Option<String> {
    let parsed = Url::parse(candidate).ok()?;
    extract_from_parsed(candidate, &parsed)
}

/// Extracts the manifest URL referenced by `candidate`, resolved against `base`.
///
/// This is the page-context variant: relative references such as
/// `/live/index.m3u8` are resolved against the page URL. Absolute candidates
/// behave exactly like [`extract_manifest_url`]; relative candidates that hit
/// the suffix rule are returned in resolved absolute form.
#[must_use]
pub fn extract_manifest_url_in(candidate: &str, base: &Url) -> Option<String> {
    if Url::parse(candidate).is_ok() {
        return extract_manifest_url(candidate);
    }

    let resolved = base.join(candidate).ok()?;
    extract_from_parsed(resolved.as_str(), &resolved)
}

/// Returns `true` if [`extract_manifest_url`] recognizes the candidate.
#[inline]
#[must_use]
pub fn is_manifest_url(candidate: &str) -> bool {
    extract_manifest_url(candidate).is_some()
}

/// Applies the suffix and query-parameter rules to an already parsed URL.
fn extract_from_parsed(original: &str, parsed: &Url) -> Option<String> {
    if parsed.path().to_ascii_lowercase().ends_with(MANIFEST_SUFFIX) {
        return Some(original.to_string());
    }

    for name in MANIFEST_QUERY_PARAMS {
        // First occurrence wins, like URLSearchParams::get
        let Some(value) = parsed
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
        else {
            continue;
        };

        if value.is_empty() {
            continue;
        }

        // Query pairs are already form-decoded; wrappers often double-encode.
        // A malformed escape in the value rejects the whole candidate.
        if has_malformed_escape(&value) {
            return None;
        }
        let decoded = urlencoding::decode(&value).ok()?;
        if decoded.to_ascii_lowercase().contains(MANIFEST_SUFFIX) {
            return Some(decoded.into_owned());
        }
    }

    None
}

/// Returns `true` if a `%` is not followed by two hex digits.
fn has_malformed_escape(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.iter().enumerate().any(|(i, &b)| {
        b == b'%'
            && !bytes
                .get(i + 1..i + 3)
                .is_some_and(|pair| pair.iter().all(u8::is_ascii_hexdigit))
    })
}

// ============================================================================
// Labels
// ============================================================================

/// Short display label for a manifest URL: its host with a trailing `.com` removed.
///
/// Returns `None` when `manifest_url` is not an absolute URL. Hostless URLs
/// (`file:`, `data:`) get an empty label.
#[must_use]
pub fn origin_label(manifest_url: &str) -> Option<String> {
    let parsed = Url::parse(manifest_url).ok()?;
    let host = parsed.host_str().unwrap_or_default();
    Some(host.strip_suffix(".com").unwrap_or(host).to_string())
}

/// Quality hint embedded in a URL (`720p`, `1920x1080`), if any.
#[must_use]
pub fn quality_hint(manifest_url: &str) -> Option<&str> {
    QUALITY_PATTERN.find(manifest_url).map(|m| m.as_str())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn test_direct_manifest_returned_unchanged() {
        let url = "https://cdn.example.com/live/Index.M3U8?token=1";
        assert_eq!(extract_manifest_url(url).as_deref(), Some(url));
    }

    #[test]
    fn test_wrapped_manifest_scenario() {
        let url = "https://cdn.example.com/play?video=https%3A%2F%2Fedge.example.com%2Fstream.m3u8%3Ftoken%3Dabc";
        assert_eq!(
            extract_manifest_url(url).as_deref(),
            Some("https://edge.example.com/stream.m3u8?token=abc")
        );
    }

    #[test]
    fn test_parameter_priority() {
        let url = "https://embed.example.com/p?file=https%3A%2F%2Fb.example.com%2Fb.m3u8&src=https%3A%2F%2Fa.example.com%2Fa.m3u8";
        assert_eq!(
            extract_manifest_url(url).as_deref(),
            Some("https://a.example.com/a.m3u8")
        );
    }

    #[test]
    fn test_non_manifest_parameter_skipped() {
        let url = "https://embed.example.com/p?url=https%3A%2F%2Fa.example.com%2Fpage&link=https%3A%2F%2Fb.example.com%2Fb.m3u8";
        assert_eq!(
            extract_manifest_url(url).as_deref(),
            Some("https://b.example.com/b.m3u8")
        );
    }

    #[test]
    fn test_double_encoded_parameter() {
        let url = "https://embed.example.com/p?src=https%253A%252F%252Fa.example.com%252Fa.m3u8";
        assert_eq!(
            extract_manifest_url(url).as_deref(),
            Some("https://a.example.com/a.m3u8")
        );
    }

    #[test]
    fn test_malformed_escape_rejects_candidate() {
        // Decodes once to `...x.m3u8?p=100%`, whose lone `%` is not an escape.
        let url = "https://embed.example.com/p?url=https%3A%2F%2Fa.example.com%2Fx.m3u8%3Fp%3D100%25&src=https%3A%2F%2Fb.example.com%2Fb.m3u8";
        assert!(extract_manifest_url(url).is_none());

        assert!(has_malformed_escape("100%"));
        assert!(has_malformed_escape("%zz"));
        assert!(!has_malformed_escape("a%2Fb.m3u8"));
    }

    #[test]
    fn test_no_match() {
        assert!(extract_manifest_url("https://example.com/video.mp4").is_none());
        assert!(extract_manifest_url("https://example.com/?q=stream.m3u8").is_none());
        assert!(extract_manifest_url("not a url").is_none());
        assert!(extract_manifest_url("").is_none());
        assert!(extract_manifest_url("/relative/index.m3u8").is_none());
    }

    #[test]
    fn test_relative_candidate_resolved_against_page() {
        let base = Url::parse("https://www.example.com/watch/42").expect("base");
        assert_eq!(
            extract_manifest_url_in("/hls/master.m3u8", &base).as_deref(),
            Some("https://www.example.com/hls/master.m3u8")
        );
        assert_eq!(
            extract_manifest_url_in("player?stream=https%3A%2F%2Fcdn.example.net%2Fa.m3u8", &base)
                .as_deref(),
            Some("https://cdn.example.net/a.m3u8")
        );
        assert!(extract_manifest_url_in("/img/logo.png", &base).is_none());
    }

    #[test]
    fn test_absolute_candidate_in_page_context_unchanged() {
        let base = Url::parse("https://www.example.com/").expect("base");
        let url = "HTTPS://CDN.EXAMPLE.COM/a.m3u8";
        assert_eq!(extract_manifest_url_in(url, &base).as_deref(), Some(url));
    }

    #[test]
    fn test_origin_label() {
        assert_eq!(
            origin_label("https://edge.example.com/a.m3u8").as_deref(),
            Some("edge.example")
        );
        assert_eq!(
            origin_label("https://cdn.example.net/a.m3u8").as_deref(),
            Some("cdn.example.net")
        );
        assert!(origin_label("/a.m3u8").is_none());
        assert_eq!(origin_label("file:///media/a.m3u8").as_deref(), Some(""));
    }

    #[test]
    fn test_quality_hint() {
        assert_eq!(quality_hint("https://a.com/720p/index.m3u8"), Some("720p"));
        assert_eq!(
            quality_hint("https://a.com/v/1280x720.m3u8"),
            Some("1280x720")
        );
        assert_eq!(quality_hint("https://a.com/index.m3u8"), None);
    }

    proptest! {
        #[test]
        fn prop_suffix_urls_unchanged(
            host in "[a-z]{1,12}\\.(com|net|org)",
            path in "[a-zA-Z0-9_/-]{0,24}",
            ext in "\\.[mM]3[uU]8",
        ) {
            let url = format!("https://{host}/{path}{ext}");
            prop_assert_eq!(extract_manifest_url(&url), Some(url.clone()));
        }

        #[test]
        fn prop_recognized_parameter_decoded(
            idx in 0usize..MANIFEST_QUERY_PARAMS.len(),
            path in "[a-z0-9]{1,16}",
        ) {
            let inner = format!("https://edge.example.com/{path}.m3u8?token=abc");
            let url = format!(
                "https://wrapper.example.org/embed?{}={}",
                MANIFEST_QUERY_PARAMS[idx],
                urlencoding::encode(&inner),
            );
            prop_assert_eq!(extract_manifest_url(&url), Some(inner));
        }

        #[test]
        fn prop_malformed_never_matches(s in "[^:/]{0,40}") {
            prop_assert!(extract_manifest_url(&s).is_none());
        }
    }
}
