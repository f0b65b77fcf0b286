//! Toolbar badge capability.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;

use crate::identifiers::TabId;

// ============================================================================
// BadgeUpdate
// ============================================================================

/// New badge state for one tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeUpdate {
    /// Tab whose badge changes.
    pub tab_id: TabId,

    /// Badge text: the manifest count, empty when zero.
    pub text: String,

    /// Background color (`#RRGGBB`).
    pub color: String,

    /// Text color (`#RRGGBB`).
    pub text_color: String,
}

impl BadgeUpdate {
    /// Builds the update for a tab holding `count` manifests.
    #[must_use]
    pub fn for_count(
        tab_id: TabId,
        count: usize,
        color: impl Into<String>,
        text_color: impl Into<String>,
    ) -> Self {
        Self {
            tab_id,
            text: if count > 0 {
                count.to_string()
            } else {
                String::new()
            },
            color: color.into(),
            text_color: text_color.into(),
        }
    }
}

// ============================================================================
// BadgeSink
// ============================================================================

/// Receives badge updates produced by registry mutations.
///
/// Implementations must not block or call back into the registry: the
/// registry calls this while holding its lock.
pub trait BadgeSink: Send + Sync {
    /// Applies a badge update.
    fn update(&self, update: BadgeUpdate);
}

impl<F> BadgeSink for F
where
    F: Fn(BadgeUpdate) + Send + Sync,
{
    fn update(&self, update: BadgeUpdate) {
        self(update);
    }
}

/// Badge sink that discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBadge;

impl BadgeSink for NoopBadge {
    fn update(&self, _update: BadgeUpdate) {}
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use parking_lot::Mutex;

    #[test]
    fn test_badge_text_for_count() {
        let tab = TabId::from(1);
        assert_eq!(BadgeUpdate::for_count(tab, 3, "#FF6B6B", "#FFFFFF").text, "3");
        assert_eq!(BadgeUpdate::for_count(tab, 0, "#FF6B6B", "#FFFFFF").text, "");
    }

    #[test]
    fn test_closure_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = Arc::clone(&seen);
            move |update: BadgeUpdate| seen.lock().push(update)
        };

        sink.update(BadgeUpdate::for_count(TabId::from(4), 2, "#000000", "#FFFFFF"));
        assert_eq!(seen.lock().len(), 1);
        assert_eq!(seen.lock()[0].tab_id, TabId::from(4));
    }

    #[test]
    fn test_serializes_camel_case() {
        let update = BadgeUpdate::for_count(TabId::from(9), 1, "#FF6B6B", "#FFFFFF");
        let json = serde_json::to_value(&update).expect("serialize");
        assert_eq!(json["tabId"], 9);
        assert_eq!(json["textColor"], "#FFFFFF");
    }
}
