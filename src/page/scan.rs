//! Page scanning rules.
//!
//! Pure functions from page material to the URLs worth reporting. A URL
//! found by candidate extraction is reported in its original (absolutized)
//! form so the receiving side derives the manifest and keeps the wrapper as
//! source; a URL found in text is reported as matched.
//!
//! | Material | Rule |
//! |----------|------|
//! | response `(url, body)` | candidate check on url, else text scan of body |
//! | `<script>` | content check with `src` (or page URL) and the body |
//! | `<video>`, `<source>` | candidate check on `src` |
//! | `data-src` / `data-video` / `data-stream` | candidate check on the first present |
//! | full markup | text scan |

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashSet;
use url::Url;

use crate::matcher;

use super::dom::{DomNode, MutationBatch, PageSnapshot};

// ============================================================================
// Constants
// ============================================================================

/// Data attributes that commonly carry player sources, in lookup order.
const DATA_SOURCE_ATTRIBUTES: [&str; 3] = ["data-src", "data-video", "data-stream"];

// ============================================================================
// Findings
// ============================================================================

/// Ordered, duplicate-free list of URLs to report.
#[derive(Debug, Default)]
pub struct Findings {
    urls: Vec<String>,
    seen: FxHashSet<String>,
}

impl Findings {
    /// Adds a URL unless already present.
    fn push(&mut self, url: String) {
        if self.seen.insert(url.clone()) {
            self.urls.push(url);
        }
    }

    /// Returns the URLs in discovery order.
    #[must_use]
    pub fn into_urls(self) -> Vec<String> {
        self.urls
    }
}

// ============================================================================
// Rules
// ============================================================================

/// Checks one candidate URL (possibly relative to `page_url`).
///
/// Returns the absolutized candidate if it is, or wraps, a manifest URL.
#[must_use]
pub fn check_candidate(page_url: &Url, candidate: &str) -> Option<String> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return None;
    }

    matcher::extract_manifest_url_in(candidate, page_url)?;
    page_url.join(candidate).ok().map(String::from)
}

/// Checks a URL and the content fetched from it.
///
/// The URL wins: the body is only scanned when the URL is not a manifest.
#[must_use]
pub fn check_content(page_url: &Url, url: &str, content: &str) -> Vec<String> {
    if let Some(found) = check_candidate(page_url, url) {
        return vec![found];
    }

    matcher::extract_manifest_urls_from_text(content)
        .into_iter()
        .collect()
}

/// Scans the document once it is ready.
#[must_use]
pub fn scan_page(page_url: &Url, snapshot: &PageSnapshot) -> Vec<String> {
    let mut findings = Findings::default();

    for node in snapshot.root.descendants() {
        if node.is("script") {
            scan_script(page_url, node, &mut findings);
        }
        scan_media(page_url, node, &mut findings);

        if let Some(found) = DATA_SOURCE_ATTRIBUTES
            .iter()
            .find_map(|name| node.attr(name).filter(|v| !v.is_empty()))
            .and_then(|value| check_candidate(page_url, value))
        {
            findings.push(found);
        }
    }

    for url in matcher::extract_manifest_urls_from_text(&snapshot.markup) {
        findings.push(url);
    }

    findings.into_urls()
}

/// Scans subtrees inserted after the page became ready.
#[must_use]
pub fn scan_mutations(page_url: &Url, batch: &MutationBatch) -> Vec<String> {
    let mut findings = Findings::default();

    for node in batch.added.iter().flat_map(DomNode::descendants) {
        scan_media(page_url, node, &mut findings);
        if node.is("script") {
            scan_script(page_url, node, &mut findings);
        }
    }

    findings.into_urls()
}

/// `<script>` rule.
fn scan_script(page_url: &Url, node: &DomNode, findings: &mut Findings) {
    if node.text().is_empty() {
        return;
    }

    let url = node
        .attr("src")
        .filter(|src| !src.is_empty())
        .unwrap_or(page_url.as_str());

    for found in check_content(page_url, url, node.text()) {
        findings.push(found);
    }
}

/// `<video>` / `<source>` rule.
fn scan_media(page_url: &Url, node: &DomNode, findings: &mut Findings) {
    if !(node.is("video") || node.is("source")) {
        return;
    }

    if let Some(found) = node
        .attr("src")
        .and_then(|src| check_candidate(page_url, src))
    {
        findings.push(found);
    }
}

// ============================================================================
// Tests
// ============================================================================
