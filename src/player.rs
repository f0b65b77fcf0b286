//! Player resolution and preferences.
//!
//! Turns a manifest URL into the URL that opens it in the user's player.
//!
//! | Player | Template |
//! |--------|----------|
//! | `ct0u0` | `https://m3u8.ct0u0.dpdns.org/m3u8-player.html?url={url}` |
//! | `potplayer` | `potplayer://{url}` |
//! | `vlc` | `vlc://{url}` |
//! | `custom` | user-configured |
//!
//! # Example
//!
//! ```
//! use hls_sniffer::player::{Player, PlayerPreferences};
//!
//! let prefs = PlayerPreferences::default().with_default_player(Player::Vlc);
//! let url = prefs.resolve("https://edge.example.com/a.m3u8").unwrap();
//! assert_eq!(url, "vlc://https://edge.example.com/a.m3u8");
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Placeholder replaced by the manifest URL.
const URL_PLACEHOLDER: &str = "{url}";

// ============================================================================
// Player
// ============================================================================

/// A playback target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Player {
    /// Hosted web player.
    #[default]
    Ct0u0,
    /// PotPlayer deep link.
    PotPlayer,
    /// VLC deep link.
    Vlc,
    /// User-configured template.
    Custom,
}

impl Player {
    /// Every player, in display order.
    pub const ALL: [Player; 4] = [Self::Ct0u0, Self::PotPlayer, Self::Vlc, Self::Custom];

    /// Returns the preference id.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Ct0u0 => "ct0u0",
            Self::PotPlayer => "potplayer",
            Self::Vlc => "vlc",
            Self::Custom => "custom",
        }
    }

    /// Returns the built-in template, `None` for [`Player::Custom`].
    #[must_use]
    pub const fn builtin_template(self) -> Option<&'static str> {
        match self {
            Self::Ct0u0 => Some("https://m3u8.ct0u0.dpdns.org/m3u8-player.html?url={url}"),
            Self::PotPlayer => Some("potplayer://{url}"),
            Self::Vlc => Some("vlc://{url}"),
            Self::Custom => None,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Player {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|player| player.id() == s)
            .ok_or_else(|| Error::invalid_argument(format!("unknown player '{s}'")))
    }
}

// ============================================================================
// PlayerPreferences
// ============================================================================

/// Stored player settings.
///
/// `defaultPlayer` is kept as the raw stored id so that stale or unknown
/// values survive a round trip; they resolve to the default player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPreferences {
    /// Selected player id.
    #[serde(default)]
    pub default_player: String,

    /// Template of the custom player.
    #[serde(default)]
    pub custom_player_url: String,
}

impl Default for PlayerPreferences {
    fn default() -> Self {
        Self {
            default_player: Player::default().id().to_string(),
            custom_player_url: String::new(),
        }
    }
}

impl PlayerPreferences {
    /// Selects a player.
    #[must_use]
    pub fn with_default_player(mut self, player: Player) -> Self {
        self.default_player = player.id().to_string();
        self
    }

    /// Sets the custom player template.
    #[must_use]
    pub fn with_custom_player_url(mut self, template: impl Into<String>) -> Self {
        self.custom_player_url = template.into();
        self
    }

    /// Returns the selected player, falling back to the default one.
    #[must_use]
    pub fn player(&self) -> Player {
        self.default_player.parse().unwrap_or_else(|_| {
            warn!(player = %self.default_player, "Unknown player, using default");
            Player::default()
        })
    }

    /// Returns the template of the selected player.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PlayerNotConfigured`] for a custom player without a
    /// template.
    pub fn template(&self) -> Result<&str> {
        let player = self.player();
        match player.builtin_template() {
            Some(template) => Ok(template),
            None if self.custom_player_url.trim().is_empty() => {
                Err(Error::player_not_configured(player.id()))
            }
            None => Ok(self.custom_player_url.as_str()),
        }
    }

    /// Builds the URL that opens `manifest_url` in the selected player.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PlayerNotConfigured`] for a custom player without a
    /// template.
    pub fn resolve(&self, manifest_url: &str) -> Result<String> {
        Ok(substitute(self.template()?, manifest_url))
    }
}

/// Replaces the first `{url}` in `template` with `manifest_url`.
///
/// Inside the query part the URL is percent-encoded, elsewhere it is
/// inserted verbatim (deep-link schemes expect the raw URL).
#[must_use]
pub fn substitute(template: &str, manifest_url: &str) -> String {
    let Some(position) = template.find(URL_PLACEHOLDER) else {
        return template.to_string();
    };

    let in_query = template.find('?').is_some_and(|query| query < position);
    let value = if in_query {
        urlencoding::encode(manifest_url)
    } else {
        manifest_url.into()
    };

    template.replacen(URL_PLACEHOLDER, &value, 1)
}

// ============================================================================
// PreferenceStore
// ============================================================================

/// Persistence for [`PlayerPreferences`].
pub trait PreferenceStore: Send + Sync {
    /// Loads preferences; missing settings yield the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Preferences`] if stored settings cannot be read.
    fn load(&self) -> Result<PlayerPreferences>;

    /// Saves preferences.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Preferences`] if settings cannot be written.
    fn save(&self, preferences: &PlayerPreferences) -> Result<()>;
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    preferences: Mutex<PlayerPreferences>,
}

impl MemoryPreferenceStore {
    /// Creates a store holding `preferences`.
    #[must_use]
    pub fn new(preferences: PlayerPreferences) -> Self {
        Self {
            preferences: Mutex::new(preferences),
        }
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self) -> Result<PlayerPreferences> {
        Ok(self.preferences.lock().clone())
    }

    fn save(&self, preferences: &PlayerPreferences) -> Result<()> {
        *self.preferences.lock() = preferences.clone();
        Ok(())
    }
}

/// JSON file store with atomic replacement on save.
#[derive(Debug, Clone)]
pub struct JsonFilePreferenceStore {
    path: PathBuf,
}

impl JsonFilePreferenceStore {
    /// Creates a store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for JsonFilePreferenceStore {
    fn load(&self) -> Result<PlayerPreferences> {
        if !self.path.exists() {
            return Ok(PlayerPreferences::default());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            Error::preferences(format!("failed to read {}: {e}", self.path.display()))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            Error::preferences(format!("invalid preferences in {}: {e}", self.path.display()))
        })
    }

    fn save(&self, preferences: &PlayerPreferences) -> Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let json = serde_json::to_vec_pretty(preferences)?;
        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(&json)?;
        file.persist(&self.path).map_err(|e| {
            Error::preferences(format!("failed to replace {}: {}", self.path.display(), e.error))
        })?;

        debug!(path = %self.path.display(), "Player preferences saved");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = "https://edge.example.com/live/index.m3u8?token=a&b=1";

    #[test]
    fn test_builtin_templates() {
        let prefs = PlayerPreferences::default();
        assert_eq!(prefs.player(), Player::Ct0u0);
        assert_eq!(
            prefs.resolve(MANIFEST).expect("resolve"),
            "https://m3u8.ct0u0.dpdns.org/m3u8-player.html?url=https%3A%2F%2Fedge.example.com%2Flive%2Findex.m3u8%3Ftoken%3Da%26b%3D1"
        );

        let prefs = prefs.with_default_player(Player::PotPlayer);
        assert_eq!(prefs.resolve(MANIFEST).expect("resolve"), format!("potplayer://{MANIFEST}"));
    }

    #[test]
    fn test_custom_player() {
        let prefs = PlayerPreferences::default().with_default_player(Player::Custom);
        let err = prefs.resolve(MANIFEST).unwrap_err();
        assert!(err.is_user_facing());
        assert!(matches!(err, Error::PlayerNotConfigured { .. }));

        let prefs = prefs.with_custom_player_url("mpv://{url}");
        assert_eq!(prefs.resolve(MANIFEST).expect("resolve"), format!("mpv://{MANIFEST}"));
    }

    #[test]
    fn test_unknown_player_falls_back() {
        let prefs = PlayerPreferences {
            default_player: "clementzq".to_string(),
            custom_player_url: String::new(),
        };
        assert_eq!(prefs.player(), Player::Ct0u0);
    }

    #[test]
    fn test_substitute_first_placeholder_only() {
        assert_eq!(substitute("x://{url}/{url}", "a"), "x://a/{url}");
        assert_eq!(substitute("no placeholder", "a"), "no placeholder");
    }

    #[test]
    fn test_player_ids_roundtrip() {
        for player in Player::ALL {
            assert_eq!(player.id().parse::<Player>().expect("parse"), player);
            assert_eq!(player.to_string(), player.id());
        }
        assert!("Vlc".parse::<Player>().is_err());
    }

    #[test]
    fn test_preferences_wire_format() {
        let json: PlayerPreferences =
            serde_json::from_str(r#"{"defaultPlayer":"vlc"}"#).expect("parse");
        assert_eq!(json.player(), Player::Vlc);
        assert_eq!(json.custom_player_url, "");

        let value = serde_json::to_value(PlayerPreferences::default()).expect("serialize");
        assert_eq!(value["defaultPlayer"], "ct0u0");
        assert_eq!(value["customPlayerUrl"], "");
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryPreferenceStore::default();
        let prefs = PlayerPreferences::default().with_default_player(Player::Vlc);

        store.save(&prefs).expect("save");
        assert_eq!(store.load().expect("load"), prefs);
    }

    #[test]
    fn test_json_file_store() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = JsonFilePreferenceStore::new(dir.path().join("nested").join("prefs.json"));

        assert_eq!(store.load()?, PlayerPreferences::default());

        let prefs = PlayerPreferences::default()
            .with_default_player(Player::Custom)
            .with_custom_player_url("https://player.example.com/?src={url}");
        store.save(&prefs)?;
        assert_eq!(store.load()?, prefs);

        fs::write(store.path(), "not json")?;
        assert!(matches!(store.load(), Err(Error::Preferences { .. })));
        Ok(())
    }
}
