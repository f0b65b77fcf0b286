//! Per-page observer.
//!
//! One observer runs per loaded page. It scans the ready document, follows
//! inserted nodes until the page unloads and inspects intercepted responses,
//! reporting each finding through a [`ManifestReporter`].

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use tokio::sync::oneshot;
use tracing::{debug, trace};
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::{CONTENT_SCRIPT_SOURCE, Message};
use crate::registry::now_millis;
use crate::transport::ChannelClient;

use super::dom::{MutationBatch, PageSnapshot};
use super::intercept::{Intercepted, RequestPrimitive, ResponseObserver};
use super::scan;

// ============================================================================
// ManifestReporter
// ============================================================================

/// Delivers findings to the registry owner, fire-and-forget.
pub trait ManifestReporter: Send + Sync {
    /// Reports one URL; delivery failures are swallowed.
    fn report(&self, url: &str);
}

impl ManifestReporter for ChannelClient {
    fn report(&self, url: &str) {
        self.notify(&Message::ContentScriptManifestFound {
            url: url.to_string(),
            source: CONTENT_SCRIPT_SOURCE.to_string(),
            timestamp: now_millis(),
        });
    }
}

impl<F> ManifestReporter for F
where
    F: Fn(&str) + Send + Sync,
{
    fn report(&self, url: &str) {
        self(url);
    }
}

// ============================================================================
// ObserverExit
// ============================================================================

/// Why [`PageObserver::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverExit {
    /// The page began unloading.
    Unloaded,
    /// The mutation stream ended on its own.
    MutationsEnded,
}

// ============================================================================
// PageObserver
// ============================================================================

/// Scans one page and reports what it finds.
#[derive(Clone)]
pub struct PageObserver {
    /// Page URL, base for relative candidates.
    page_url: Url,
    /// Finding sink.
    reporter: Arc<dyn ManifestReporter>,
}

impl fmt::Debug for PageObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageObserver")
            .field("page_url", &self.page_url.as_str())
            .finish_non_exhaustive()
    }
}

impl PageObserver {
    /// Creates an observer for the page at `page_url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `page_url` is not absolute.
    pub fn new(page_url: &str, reporter: Arc<dyn ManifestReporter>) -> Result<Self> {
        let page_url = Url::parse(page_url)
            .map_err(|e| Error::invalid_argument(format!("invalid page URL '{page_url}': {e}")))?;

        Ok(Self { page_url, reporter })
    }

    /// Returns the page URL.
    #[inline]
    #[must_use]
    pub fn page_url(&self) -> &Url {
        &self.page_url
    }

    /// Checks a URL and content; returns the number of reports.
    pub fn check_content(&self, url: &str, content: &str) -> usize {
        self.report_all(scan::check_content(&self.page_url, url, content))
    }

    /// Scans the ready document; returns the number of reports.
    pub fn scan_page(&self, snapshot: &PageSnapshot) -> usize {
        self.report_all(scan::scan_page(&self.page_url, snapshot))
    }

    /// Scans inserted nodes; returns the number of reports.
    pub fn scan_mutations(&self, batch: &MutationBatch) -> usize {
        self.report_all(scan::scan_mutations(&self.page_url, batch))
    }

    /// Wraps a request primitive so its responses are checked.
    #[must_use]
    pub fn intercept<P: RequestPrimitive>(self: &Arc<Self>, primitive: P) -> Intercepted<P> {
        Intercepted::new(primitive, Arc::clone(self) as Arc<dyn ResponseObserver>)
    }

    /// Runs the page lifecycle.
    ///
    /// Scans `snapshot`, then scans each mutation batch until `unload` fires
    /// (or its sender is dropped) or the stream ends. The mutation stream is
    /// dropped exactly once, on return.
    pub async fn run<S>(
        &self,
        snapshot: &PageSnapshot,
        mut mutations: S,
        mut unload: oneshot::Receiver<()>,
    ) -> ObserverExit
    where
        S: Stream<Item = MutationBatch> + Unpin,
    {
        let initial = self.scan_page(snapshot);
        debug!(page = %self.page_url, reported = initial, "Initial page scan done");

        let exit = loop {
            tokio::select! {
                biased;

                _ = &mut unload => break ObserverExit::Unloaded,

                batch = mutations.next() => match batch {
                    Some(batch) => {
                        self.scan_mutations(&batch);
                    }
                    None => break ObserverExit::MutationsEnded,
                },
            }
        };

        drop(mutations);
        debug!(page = %self.page_url, ?exit, "Mutation subscription cancelled");
        exit
    }

    /// Reports every URL.
    fn report_all(&self, urls: Vec<String>) -> usize {
        for url in &urls {
            trace!(page = %self.page_url, url = %url, "Manifest candidate found");
            self.reporter.report(url);
        }
        urls.len()
    }
}

impl ResponseObserver for PageObserver {
    fn observe(&self, url: &str, body: &str) {
        self.check_content(url, body);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use bytes::Bytes;
    use futures_util::stream;
    use parking_lot::Mutex;
    use tokio::sync::mpsc;

    use crate::identifiers::TabId;
    use crate::page::dom::DomNode;
    use crate::page::intercept::{PageRequest, PageResponse, PrimitiveKind};
    use crate::transport::channel;

    fn recording() -> (Arc<dyn ManifestReporter>, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let reporter = {
            let seen = Arc::clone(&seen);
            move |url: &str| seen.lock().push(url.to_string())
        };
        (Arc::new(reporter), seen)
    }

    fn video(src: &str) -> DomNode {
        DomNode::element("video").with_attr("src", src)
    }

    #[test]
    fn test_invalid_page_url() {
        let (reporter, _) = recording();
        let err = PageObserver::new("not a url", reporter).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_run_until_unload() {
        let (reporter, seen) = recording();
        let observer = PageObserver::new("https://site.example.com/", reporter).expect("observer");

        let (batch_tx, mut batch_rx) = mpsc::unbounded_channel::<MutationBatch>();
        let mutations = stream::poll_fn(move |cx| batch_rx.poll_recv(cx));
        let (unload_tx, unload_rx) = oneshot::channel();

        let snapshot = PageSnapshot::new(
            DomNode::element("html").with_child(video("https://edge.example.com/first.m3u8")),
            "",
        );

        batch_tx
            .send(MutationBatch::added([video("/late.m3u8")]))
            .expect("send batch");

        let run = tokio::spawn(async move { observer.run(&snapshot, mutations, unload_rx).await });

        // Give the observer a chance to drain the queued batch.
        tokio::task::yield_now().await;
        while seen.lock().len() < 2 {
            tokio::task::yield_now().await;
        }
        unload_tx.send(()).expect("observer alive");

        assert_eq!(run.await.expect("run task"), ObserverExit::Unloaded);
        assert!(batch_tx.is_closed());
        assert_eq!(
            seen.lock().as_slice(),
            [
                "https://edge.example.com/first.m3u8",
                "https://site.example.com/late.m3u8"
            ]
        );
    }

    #[tokio::test]
    async fn test_run_stream_end() {
        let (reporter, seen) = recording();
        let observer = PageObserver::new("https://site.example.com/", reporter).expect("observer");
        let (_unload_tx, unload_rx) = oneshot::channel();

        let exit = observer
            .run(
                &PageSnapshot::default(),
                stream::iter([MutationBatch::default()]),
                unload_rx,
            )
            .await;

        assert_eq!(exit, ObserverExit::MutationsEnded);
        assert!(seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_unload_wins_over_pending_mutations() {
        let (reporter, seen) = recording();
        let observer = PageObserver::new("https://site.example.com/", reporter).expect("observer");
        let (unload_tx, unload_rx) = oneshot::channel();
        unload_tx.send(()).expect("send unload");

        let exit = observer
            .run(
                &PageSnapshot::default(),
                stream::iter([MutationBatch::added([video("/x.m3u8")])]),
                unload_rx,
            )
            .await;

        assert_eq!(exit, ObserverExit::Unloaded);
        assert!(seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_intercepted_fetch_reports() {
        struct Fixed;

        #[async_trait::async_trait]
        impl RequestPrimitive for Fixed {
            type Error = std::convert::Infallible;

            fn kind(&self) -> PrimitiveKind {
                PrimitiveKind::Fetch
            }

            async fn issue(&self, _request: PageRequest) -> std::result::Result<PageResponse, Self::Error> {
                Ok(PageResponse {
                    url: "https://api.example.com/source.json".to_string(),
                    status: 200,
                    body: Bytes::from_static(br#"{"src":"https://edge.example.com/v.m3u8"}"#),
                })
            }
        }

        let (reporter, seen) = recording();
        let observer = Arc::new(
            PageObserver::new("https://site.example.com/", reporter).expect("observer"),
        );
        let fetch = observer.intercept(Fixed);

        let response = fetch
            .issue(PageRequest::get("/source.json"))
            .await
            .expect("infallible");
        assert_eq!(response.status, 200);
        assert_eq!(seen.lock().as_slice(), ["https://edge.example.com/v.m3u8"]);
    }

    #[tokio::test]
    async fn test_channel_reporter_message_shape() {
        let (client, mut receiver) = channel();
        let reporter: Arc<dyn ManifestReporter> = Arc::new(client.for_tab(TabId::from(4)));
        let observer = PageObserver::new("https://site.example.com/", reporter).expect("observer");

        assert_eq!(observer.check_content("https://edge.example.com/a.m3u8", ""), 1);

        let envelope = receiver.recv().await.expect("envelope");
        assert_eq!(envelope.sender(), Some(TabId::from(4)));
        assert_eq!(envelope.message()["type"], "contentScriptManifestFound");
        assert_eq!(envelope.message()["source"], "content_script");
        assert_eq!(envelope.message()["url"], "https://edge.example.com/a.m3u8");
        assert!(envelope.message()["timestamp"].as_u64().is_some_and(|t| t > 0));
    }
}
