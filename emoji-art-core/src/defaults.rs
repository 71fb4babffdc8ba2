//! Shared key-value defaults.
//!
//! Provides a thread-safe [`Defaults`] map from string keys to opaque bytes,
//! optionally mirrored to a JSON file so values survive restarts. Documents,
//! the document store index and palettes all keep their bytes here.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::storage::write_atomic;
use crate::StoreError;

/// Thread-safe key-value defaults.
///
/// Values are held as base64 strings so the backing file stays plain JSON
/// whatever the payload.
///
/// # Example
///
/// ```
/// use emoji_art_core::Defaults;
///
/// let defaults = Defaults::new();
/// defaults.set("greeting", b"hello").unwrap();
/// assert_eq!(defaults.data("greeting").as_deref(), Some(&b"hello"[..]));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Defaults {
    values: Arc<RwLock<BTreeMap<String, String>>>,
    /// Optional backing file.
    path: Option<PathBuf>,
    /// Serializes file writes so the newest snapshot is written last.
    write_guard: Arc<Mutex<()>>,
}

impl Defaults {
    /// Create an in-memory store (no persistence).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store mirrored to `path`.
    ///
    /// Existing values are loaded from the file. A missing file starts empty;
    /// an unreadable or malformed file is logged and also starts empty.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the parent directory cannot be created.
    pub fn with_file(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let values = load_values(&path);
        Ok(Self {
            values: Arc::new(RwLock::new(values)),
            path: Some(path),
            write_guard: Arc::new(Mutex::new(())),
        })
    }

    /// The backing file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Get the bytes stored under `key`.
    #[must_use]
    pub fn data(&self, key: &str) -> Option<Vec<u8>> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        let encoded = values.get(key)?;
        match STANDARD.decode(encoded) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::debug!("Ignoring undecodable defaults value for {key}: {e}");
                None
            }
        }
    }

    /// Check if a value is stored under `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        values.contains_key(key)
    }

    /// Store `bytes` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing file cannot be written. The in-memory
    /// value is updated regardless.
    pub fn set(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        {
            let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
            values.insert(key.to_string(), STANDARD.encode(bytes));
        }
        self.persist()
    }

    /// Remove the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing file cannot be written.
    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        let removed = {
            let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
            values.remove(key).is_some()
        };
        if removed {
            self.persist()
        } else {
            Ok(())
        }
    }

    /// All keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        values.keys().cloned().collect()
    }

    /// Write the whole map to the backing file.
    ///
    /// No-op for in-memory stores.
    fn persist(&self) -> Result<(), StoreError> {
        let Some(ref path) = self.path else {
            return Ok(());
        };
        let _guard = self
            .write_guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let json = {
            let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
            serde_json::to_vec_pretty(&*values)
                .map_err(|e| StoreError::Serialization(e.to_string()))?
        };
        write_atomic(path, &json)?;
        Ok(())
    }
}

fn load_values(path: &Path) -> BTreeMap<String, String> {
    let contents = match std::fs::read(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
        Err(e) => {
            tracing::warn!("Failed to read defaults from {}: {e}", path.display());
            return BTreeMap::new();
        }
    };
    serde_json::from_slice(&contents).unwrap_or_else(|e| {
        tracing::warn!("Ignoring malformed defaults file {}: {e}", path.display());
        BTreeMap::new()
    })
}
