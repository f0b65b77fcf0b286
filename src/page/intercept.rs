//! Transparent interception of page request primitives.
//!
//! [`Intercepted`] wraps a fetch-style or XHR-style primitive and behaves
//! exactly like it: same response, same error. Successful responses are
//! additionally handed to a [`ResponseObserver`], which reads a clone of the
//! body buffer.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

// ============================================================================
// Types
// ============================================================================

/// Flavor of a request primitive; decides what counts as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    /// Promise-returning fetch: 2xx with a response URL.
    Fetch,
    /// Callback-based XHR: done with status 200.
    Xhr,
}

/// A request issued by page script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// HTTP method.
    pub method: String,
    /// Request URL as given by the page.
    pub url: String,
    /// Request body, if any.
    pub body: Option<Bytes>,
}

impl PageRequest {
    /// Creates a `GET` request.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            body: None,
        }
    }
}

/// A completed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResponse {
    /// Final URL after redirects; empty for opaque responses.
    pub url: String,
    /// HTTP status.
    pub status: u16,
    /// Response body.
    pub body: Bytes,
}

impl PageResponse {
    /// Returns `true` if a primitive of `kind` reports this as success.
    #[must_use]
    pub fn is_success_for(&self, kind: PrimitiveKind) -> bool {
        match kind {
            PrimitiveKind::Fetch => (200..300).contains(&self.status) && !self.url.is_empty(),
            PrimitiveKind::Xhr => self.status == 200,
        }
    }
}

// ============================================================================
// Traits
// ============================================================================

/// A request-issuing primitive available to page script.
#[async_trait]
pub trait RequestPrimitive: Send + Sync {
    /// Error surfaced to the page.
    type Error: Send;

    /// Returns the primitive's flavor.
    fn kind(&self) -> PrimitiveKind;

    /// Issues a request.
    async fn issue(&self, request: PageRequest) -> Result<PageResponse, Self::Error>;
}

/// Receives successful responses seen through an [`Intercepted`] primitive.
pub trait ResponseObserver: Send + Sync {
    /// Observes a response URL and its body text.
    fn observe(&self, url: &str, body: &str);
}

// ============================================================================
// Intercepted
// ============================================================================

/// A primitive wrapped so successful responses are observed.
pub struct Intercepted<P> {
    inner: P,
    observer: Arc<dyn ResponseObserver>,
}

impl<P: RequestPrimitive> Intercepted<P> {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: P, observer: Arc<dyn ResponseObserver>) -> Self {
        Self { inner, observer }
    }

    /// Returns the wrapped primitive.
    #[must_use]
    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P: fmt::Debug> fmt::Debug for Intercepted<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Intercepted")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<P: RequestPrimitive> RequestPrimitive for Intercepted<P> {
    type Error = P::Error;

    fn kind(&self) -> PrimitiveKind {
        self.inner.kind()
    }

    async fn issue(&self, request: PageRequest) -> Result<PageResponse, Self::Error> {
        let kind = self.inner.kind();
        let request_url = request.url.clone();
        let response = self.inner.issue(request).await?;

        if response.is_success_for(kind) {
            // XHR observes the URL the page opened, fetch the final one.
            let url = match kind {
                PrimitiveKind::Fetch => response.url.as_str(),
                PrimitiveKind::Xhr => request_url.as_str(),
            };
            let body = response.body.clone();
            self.observer.observe(url, &String::from_utf8_lossy(&body));
        }

        Ok(response)
    }
}

// ============================================================================
// Tests
// ============================================================================
