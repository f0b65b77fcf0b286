//! Sniffer configuration.
//!
//! Provides a type-safe, builder-style interface for the knobs of the
//! detection engine and the host bridge.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use hls_sniffer::SnifferConfig;
//!
//! let config = SnifferConfig::new()
//!     .with_retention_cap(20)
//!     .with_badge_color("#3366FF")
//!     .with_probe_timeout(Duration::from_secs(5));
//!
//! assert!(config.validate().is_ok());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Manifests retained per tab.
pub const DEFAULT_RETENTION_CAP: usize = 10;

/// Badge background accent color.
pub const DEFAULT_BADGE_COLOR: &str = "#FF6B6B";

/// Badge text color.
pub const DEFAULT_BADGE_TEXT_COLOR: &str = "#FFFFFF";

/// Content types that mark a response as an HLS manifest.
///
/// Matched as case-sensitive substrings of the `content-type` value.
pub const DEFAULT_MANIFEST_CONTENT_TYPES: [&str; 2] =
    ["application/vnd.apple.mpegurl", "application/x-mpegURL"];

/// Reachability probe timeout.
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for the host shim to connect to the bridge.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// SnifferConfig
// ============================================================================

/// Configuration of the sniffer service and host bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnifferConfig {
    /// Maximum manifest records kept per tab (FIFO eviction).
    pub retention_cap: usize,

    /// Badge background color (`#RRGGBB`).
    pub badge_color: String,

    /// Badge text color (`#RRGGBB`).
    pub badge_text_color: String,

    /// Content-type substrings that trigger the header fallback.
    pub manifest_content_types: Vec<String>,

    /// Timeout for `testUrlReachable` probes.
    pub probe_timeout: Duration,

    /// Bridge bind address.
    pub bind_ip: IpAddr,

    /// Bridge port (0 = OS-assigned).
    pub port: u16,

    /// Time to wait for the host shim to connect.
    pub connect_timeout: Duration,
}

impl Default for SnifferConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl SnifferConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            retention_cap: DEFAULT_RETENTION_CAP,
            badge_color: DEFAULT_BADGE_COLOR.to_string(),
            badge_text_color: DEFAULT_BADGE_TEXT_COLOR.to_string(),
            manifest_content_types: DEFAULT_MANIFEST_CONTENT_TYPES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            bind_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl SnifferConfig {
    /// Sets the per-tab retention cap.
    #[inline]
    #[must_use]
    pub fn with_retention_cap(mut self, cap: usize) -> Self {
        self.retention_cap = cap;
        self
    }

    /// Sets the badge background color.
    #[inline]
    #[must_use]
    pub fn with_badge_color(mut self, color: impl Into<String>) -> Self {
        self.badge_color = color.into();
        self
    }

    /// Sets the badge text color.
    #[inline]
    #[must_use]
    pub fn with_badge_text_color(mut self, color: impl Into<String>) -> Self {
        self.badge_text_color = color.into();
        self
    }

    /// Adds a content-type substring for the header fallback.
    #[inline]
    #[must_use]
    pub fn with_manifest_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.manifest_content_types.push(content_type.into());
        self
    }

    /// Sets the reachability probe timeout.
    #[inline]
    #[must_use]
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Sets the bridge bind address and port.
    #[inline]
    #[must_use]
    pub fn with_bind(mut self, ip: IpAddr, port: u16) -> Self {
        self.bind_ip = ip;
        self.port = port;
        self
    }

    /// Sets the time to wait for the host shim to connect.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl SnifferConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the retention cap is zero, a color is
    /// not `#RRGGBB`, or no manifest content types are configured.
    pub fn validate(&self) -> Result<()> {
        if self.retention_cap == 0 {
            return Err(Error::config("retention cap must be at least 1"));
        }

        for color in [&self.badge_color, &self.badge_text_color] {
            if !is_hex_color(color) {
                return Err(Error::config(format!(
                    "invalid badge color '{color}', expected #RRGGBB"
                )));
            }
        }

        if self.manifest_content_types.is_empty() {
            return Err(Error::config("at least one manifest content type is required"));
        }

        Ok(())
    }
}

/// Checks for `#RRGGBB`.
fn is_hex_color(value: &str) -> bool {
    value
        .strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

// ============================================================================
// Tests
// ============================================================================
