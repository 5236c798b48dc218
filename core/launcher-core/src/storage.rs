//! Durable key → JSON document persistence under the per-user config root.
//!
//! Every file the launcher owns is resolved here, so path decisions live in
//! one place and tests can inject a temp root via [`ConfigStore::with_root`].
//!
//! ## Failure policy
//!
//! - `read` never fails: a missing, unreadable or malformed document yields the
//!   key's documented default.
//! - `write` never fails either: errors are logged and swallowed, leaving the
//!   caller's in-memory value as the effective one for this process.
//! - Writes are not transactional. A crash mid-write can truncate a document;
//!   `read` treats that exactly like an absent file.

use fs_err as fs;
use serde_json::{json, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{LauncherError, Result};

const APP_DIR_NAME: &str = "lazy-project-launcher";

/// Logical documents persisted by the launcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    Theme,
    Locale,
}

impl ConfigKey {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKey::Theme => "theme",
            ConfigKey::Locale => "locale",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            ConfigKey::Theme => "theme.json",
            ConfigKey::Locale => "locale.json",
        }
    }

    /// Document returned when the persisted file is absent or unusable.
    pub fn default_document(self) -> Value {
        match self {
            ConfigKey::Theme => json!({ "theme": "system" }),
            ConfigKey::Locale => json!({ "locale": "en" }),
        }
    }
}

/// File-backed store rooted at the per-user configuration directory.
///
/// Production code uses [`ConfigStore::from_user_dirs`], which points to
/// `<config_dir>/lazy-project-launcher/`.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    root: PathBuf,
}

impl ConfigStore {
    pub fn from_user_dirs() -> Result<Self> {
        let base = dirs::config_dir().ok_or(LauncherError::ConfigDirNotFound)?;
        Ok(Self {
            root: base.join(APP_DIR_NAME),
        })
    }

    /// Creates a store with a custom root directory.
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Paths
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn path_for(&self, key: ConfigKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    /// Path to launcher.toml (runtime preferences).
    pub fn runtime_config_file(&self) -> PathBuf {
        self.root.join("launcher.toml")
    }

    /// Default path of the view transport socket.
    pub fn socket_file(&self) -> PathBuf {
        self.root.join("launcher.sock")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn ensure_root(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.root)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Documents
    // ─────────────────────────────────────────────────────────────────────────────

    /// Returns the parsed document for `key`, or its default.
    pub fn read(&self, key: ConfigKey) -> Value {
        match self.try_read(key) {
            Ok(Some(document)) => document,
            Ok(None) => {
                tracing::debug!(key = key.as_str(), "No persisted document; using default");
                key.default_document()
            }
            Err(err) => {
                tracing::warn!(key = key.as_str(), error = %err, "Persisted document unusable; using default");
                key.default_document()
            }
        }
    }

    /// Reads and parses `key`'s document. `Ok(None)` means the file is absent.
    pub fn try_read(&self, key: ConfigKey) -> Result<Option<Value>> {
        let path = self.path_for(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(LauncherError::ConfigIo { path, source }),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|err| LauncherError::ConfigMalformed {
                path,
                details: err.to_string(),
            })
    }

    /// Persists `document` for `key`, logging (not returning) any failure.
    pub fn write(&self, key: ConfigKey, document: &Value) {
        if let Err(err) = self.try_write(key, document) {
            tracing::warn!(key = key.as_str(), error = %err, "Failed to persist document; keeping in-memory value");
        }
    }

    /// Creates the root (with parents) and overwrites `key`'s document.
    pub fn try_write(&self, key: ConfigKey, document: &Value) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|source| LauncherError::ConfigIo {
            path: self.root.clone(),
            source,
        })?;

        let path = self.path_for(key);
        let content =
            serde_json::to_string_pretty(document).map_err(|err| LauncherError::ConfigMalformed {
                path: path.clone(),
                details: err.to_string(),
            })?;
        fs::write(&path, content).map_err(|source| LauncherError::ConfigIo { path, source })
    }
}
