//! URL reachability probing.
//!
//! Backs the `testUrlReachable` message. Probes are opaque: any HTTP
//! response counts as reachable, whatever its status, mirroring a no-cors
//! request from an extension page.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::{Error, Result};

// ============================================================================
// ReachabilityProbe
// ============================================================================

/// Checks whether a URL answers at all.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// Returns `true` if the URL produced any response.
    ///
    /// Never fails: transport errors and timeouts are `false`.
    async fn is_reachable(&self, url: &str) -> bool;
}

// ============================================================================
// HttpProbe
// ============================================================================

/// HEAD-request probe backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    /// Creates a probe with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("failed to build probe client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ReachabilityProbe for HttpProbe {
    async fn is_reachable(&self, url: &str) -> bool {
        match self.client.head(url).send().await {
            Ok(response) => {
                debug!(url, status = response.status().as_u16(), "Probe answered");
                true
            }
            Err(e) => {
                debug!(url, error = %e, "Probe failed");
                false
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn probe() -> HttpProbe {
        HttpProbe::new(Duration::from_secs(5)).expect("probe client")
    }

    #[tokio::test]
    async fn test_unparseable_url_is_unreachable() {
        assert!(!probe().is_reachable("not a url").await);
    }

    #[tokio::test]
    async fn test_error_status_still_reachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");

        tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf).await;
                let _ = stream
                    .write_all(b"HTTP/1.1 403 Forbidden\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                    .await;
            }
        });

        let url = format!("http://{addr}/live/index.m3u8");
        assert!(probe().is_reachable(&url).await);
    }

    #[tokio::test]
    async fn test_closed_port_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let url = format!("http://{addr}/index.m3u8");
        assert!(!probe().is_reachable(&url).await);
    }
}
