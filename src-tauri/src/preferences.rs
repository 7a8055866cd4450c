//! Persisted preferences
//!
//! A single JSON record `{ "window": { "width": .., "height": .. } }` stored
//! in the per-user config directory. Loading never fails: anything unusable
//! is replaced by the defaults, which are written back immediately.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_WINDOW_SIZE, PREFERENCES_FILE};
use crate::error::ShellError;

/// Logical window dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

impl WindowSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Both dimensions are strictly positive
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

impl std::fmt::Display for WindowSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}×{}", self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub window: WindowSize,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW_SIZE,
        }
    }
}

/// Reads and writes the preference record at a fixed path
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store backed by `config.json` inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(PREFERENCES_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record, regenerating and persisting defaults on any failure.
    pub fn load(&self) -> Preferences {
        match self.read() {
            Ok(prefs) => {
                debug!(
                    "[preferences] Loaded window size {} from {}",
                    prefs.window,
                    self.path.display()
                );
                prefs
            }
            Err(e) => {
                match &e {
                    ShellError::Io { source, .. } if source.kind() == ErrorKind::NotFound => {
                        info!(
                            "[preferences] No preference file at {}, creating defaults",
                            self.path.display()
                        );
                    }
                    _ => warn!("[preferences] Discarding unusable preferences: {}", e),
                }

                let prefs = Preferences::default();
                if let Err(e) = self.save(&prefs) {
                    error!("[preferences] Failed to write default preferences: {}", e);
                }
                prefs
            }
        }
    }

    /// Write the record as pretty-printed JSON.
    pub fn save(&self, prefs: &Preferences) -> Result<(), ShellError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| ShellError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let json = serde_json::to_string_pretty(prefs)?;
        fs::write(&self.path, json).map_err(|source| ShellError::Io {
            path: self.path.clone(),
            source,
        })?;

        debug!(
            "[preferences] Saved window size {} to {}",
            prefs.window,
            self.path.display()
        );
        Ok(())
    }

    /// Best-effort save: failures are logged and dropped.
    pub fn persist(&self, prefs: &Preferences) {
        if let Err(e) = self.save(prefs) {
            error!("[preferences] Failed to persist preferences: {}", e);
        }
    }

    fn read(&self) -> Result<Preferences, ShellError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| ShellError::Io {
            path: self.path.clone(),
            source,
        })?;
        let prefs: Preferences = serde_json::from_str(&raw)?;
        if !prefs.window.is_valid() {
            return Err(ShellError::InvalidResolution {
                width: prefs.window.width,
                height: prefs.window.height,
            });
        }
        Ok(prefs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn on_disk(store: &PreferenceStore) -> serde_json::Value {
        let raw = fs::read_to_string(store.path()).unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn test_save_then_load_keeps_record() {
        let dir = TempDir::new().unwrap();
        let store = PreferenceStore::in_dir(dir.path());
        let prefs = Preferences {
            window: WindowSize::new(1600, 900),
        };

        store.save(&prefs).unwrap();

        assert_eq!(store.load(), prefs);
    }

    #[test]
    fn test_saved_file_is_pretty_printed() {
        let dir = TempDir::new().unwrap();
        let store = PreferenceStore::in_dir(dir.path());
        store.save(&Preferences::default()).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains('\n'));
        assert_eq!(
            on_disk(&store),
            serde_json::json!({ "window": { "width": 1280, "height": 720 } })
        );
    }

    #[test]
    fn test_missing_file_yields_and_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let store = PreferenceStore::in_dir(dir.path().join("nested"));

        let prefs = store.load();

        assert_eq!(prefs.window, WindowSize::new(1280, 720));
        assert!(store.path().exists());
        assert_eq!(on_disk(&store)["window"]["width"], 1280);
    }

    #[test]
    fn test_corrupt_file_is_replaced_by_defaults() {
        let dir = TempDir::new().unwrap();
        let store = PreferenceStore::in_dir(dir.path());
        fs::write(store.path(), "{ not json").unwrap();

        assert_eq!(store.load(), Preferences::default());
        assert_eq!(on_disk(&store)["window"]["height"], 720);
    }

    #[test]
    fn test_missing_or_invalid_fields_fall_back() {
        let dir = TempDir::new().unwrap();
        let store = PreferenceStore::in_dir(dir.path());

        for body in [
            r#"{}"#,
            r#"{"window":{"width":1024}}"#,
            r#"{"window":{"width":0,"height":600}}"#,
            r#"{"window":{"width":-5,"height":600}}"#,
            r#"{"window":"large"}"#,
        ] {
            fs::write(store.path(), body).unwrap();
            assert_eq!(store.load(), Preferences::default(), "body: {}", body);
        }
    }

    #[test]
    fn test_persist_swallows_write_errors() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be makes the write fail
        let store = PreferenceStore::new(dir.path());
        store.persist(&Preferences::default());
        assert!(dir.path().is_dir());
    }
}
