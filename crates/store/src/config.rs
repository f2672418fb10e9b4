// Local configuration for the wiki engine.
//
// Global config: `~/.quillwiki/config.toml`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use quillwiki_common::anchor::DEFAULT_CONTEXT_CHARS;
use quillwiki_common::highlight::{HighlightError, HighlightOptions};

/// Root directory for quillwiki global state: `~/.quillwiki/`.
pub fn global_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".quillwiki"))
}

/// Path to the global config file: `~/.quillwiki/config.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    global_dir().map(|d| d.join("config.toml"))
}

/// Engine configuration at `~/.quillwiki/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct WikiConfig {
    /// Database location; falls back to `~/.quillwiki/meta.db`.
    pub db_path: Option<PathBuf>,
    pub anchors: AnchorConfig,
    pub highlight: HighlightConfig,
}

impl WikiConfig {
    /// Load from `~/.quillwiki/config.toml`. Returns defaults if the file
    /// doesn't exist or can't be parsed.
    pub fn load() -> Self {
        global_config_path().and_then(|p| Self::load_from(&p).ok()).unwrap_or_default()
    }

    /// Load and validate a config file. Rejects a marker element that is not a
    /// plain, non-void tag name.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        let config: Self = toml::from_str(&contents).map_err(ConfigError::Parse)?;
        config.highlight.options()?;
        Ok(config)
    }

    /// Save to a specific path (creates parent directories).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        let contents = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, contents).map_err(ConfigError::Io)
    }

    /// Configured database path, or the default under the global dir.
    pub fn resolved_db_path(&self) -> Option<PathBuf> {
        self.db_path.clone().or_else(|| global_dir().map(|d| d.join("meta.db")))
    }
}

/// Anchor capture settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnchorConfig {
    /// Characters of prefix/suffix context stored with a new anchor.
    pub context_chars: usize,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self { context_chars: DEFAULT_CONTEXT_CHARS }
    }
}

/// Marker element settings for rendered highlights.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HighlightConfig {
    pub element: String,
    pub class: String,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        let defaults = HighlightOptions::default();
        Self { element: defaults.element().to_string(), class: defaults.class().to_string() }
    }
}

impl HighlightConfig {
    pub fn options(&self) -> Result<HighlightOptions, ConfigError> {
        HighlightOptions::new(self.element.as_str(), self.class.as_str())
            .map_err(ConfigError::Highlight)
    }
}

// ── Errors ─────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
    Highlight(HighlightError),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "config I/O error: {e}"),
            Self::Parse(e) => write!(f, "config parse error: {e}"),
            Self::Serialize(e) => write!(f, "config serialize error: {e}"),
            Self::Highlight(e) => write!(f, "invalid [highlight] config: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
