//! Store configuration and on-disk layout.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory under a locale holding one file per node.
pub const NODE_DIR: &str = "node";
/// Per-locale grammar document.
pub const GRAMMAR_FILE: &str = "grammar.xml";
/// Per-locale master document consumed by `generate`.
pub const MASTER_FILE: &str = "locale.xml";

/// Configuration for the tree-backed store.
///
/// Supplied once at start-up and treated as immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Root storage directory; one subdirectory per locale.
    pub root_dir: PathBuf,
    /// Locale used for records that do not name one.
    pub default_locale: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("./data"),
            default_locale: "en".to_string(),
        }
    }
}

impl StoreConfig {
    pub fn new(root_dir: impl Into<PathBuf>, default_locale: impl Into<String>) -> Self {
        Self {
            root_dir: root_dir.into(),
            default_locale: default_locale.into(),
        }
    }

    /// Load a configuration from a JSON file.
    ///
    /// Missing fields fall back to [`StoreConfig::default`].
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        #[derive(Deserialize)]
        struct Partial {
            root_dir: Option<PathBuf>,
            default_locale: Option<String>,
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let partial: Partial = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse config {}", path.display()))?;

        let defaults = Self::default();
        Ok(Self {
            root_dir: partial.root_dir.unwrap_or(defaults.root_dir),
            default_locale: partial.default_locale.unwrap_or(defaults.default_locale),
        })
    }

    /// The locale a record should be stored under.
    pub fn effective_locale<'a>(&'a self, locale: &'a str) -> &'a str {
        if locale.is_empty() {
            &self.default_locale
        } else {
            locale
        }
    }

    pub fn locale_dir(&self, locale: &str) -> PathBuf {
        self.root_dir.join(self.effective_locale(locale))
    }

    pub fn node_path(&self, locale: &str, id: &str) -> PathBuf {
        self.locale_dir(locale).join(NODE_DIR).join(format!("{id}.xml"))
    }

    pub fn grammar_path(&self, locale: &str) -> PathBuf {
        self.locale_dir(locale).join(GRAMMAR_FILE)
    }

    pub fn master_path(&self, locale: &str) -> PathBuf {
        self.locale_dir(locale).join(MASTER_FILE)
    }

    /// Locale subdirectories present under the root, sorted by name.
    pub fn locales(&self) -> std::io::Result<Vec<String>> {
        let mut locales = Vec::new();
        if !self.root_dir.exists() {
            return Ok(locales);
        }
        for entry in std::fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                locales.push(name.to_string());
            }
        }
        locales.sort();
        Ok(locales)
    }
}
