//! URL heuristic matcher.
//!
//! Pure functions that decide whether a URL or a blob of text references an
//! HLS manifest, and that unwrap the real manifest URL from embed/player
//! wrapper URLs.
//!
//! Nothing in this module returns an error: malformed input is simply
//! "no match".
//!
//! # Rules
//!
//! | Input | Rule |
//! |-------|------|
//! | URL path ends in `.m3u8` | candidate returned unchanged |
//! | Query parameter `url`, `src`, `source`, `stream`, `video`, `link`, `file` | decoded value returned if it contains `.m3u8` |
//! | Free text | four `http(s)://…m3u8…` patterns, quoted and bare |
//!
//! # Example
//!
//! ```
//! use hls_sniffer::matcher::extract_manifest_url;
//!
//! let wrapped = "https://cdn.example.com/play?video=https%3A%2F%2Fedge.example.com%2Fstream.m3u8";
//! assert_eq!(
//!     extract_manifest_url(wrapped).as_deref(),
//!     Some("https://edge.example.com/stream.m3u8"),
//! );
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Free-text scanning.
pub mod content;

/// Single-URL extraction and labelling.
pub mod url;

// ============================================================================
// Re-exports
// ============================================================================

pub use content::extract_manifest_urls_from_text;
pub use url::{
    MANIFEST_QUERY_PARAMS, extract_manifest_url, extract_manifest_url_in, is_manifest_url,
    origin_label, quality_hint,
};
