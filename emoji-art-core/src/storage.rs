//! Durable slots that hold one document's encoded bytes.
//!
//! A slot is either a named entry in [`Defaults`] or a file on disk. Both
//! tolerate absence: reading a slot that was never written yields `None`.

use std::path::{Path, PathBuf};

use crate::Defaults;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested document does not exist.
    #[error("Document not found: {0}")]
    DocumentNotFound(String),
    /// An I/O error occurred during persistence.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// A place to read and write one document's bytes.
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Read the stored bytes, or `None` if nothing was stored yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot exists but cannot be read.
    fn read(&self) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replace the stored bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes cannot be written.
    fn write(&self, bytes: &[u8]) -> Result<(), StoreError>;

    /// Delete the stored bytes. Removing an empty slot is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot exists but cannot be removed.
    fn remove(&self) -> Result<(), StoreError>;

    /// Human readable location, for logs.
    fn location(&self) -> String;
}

/// A named entry in a [`Defaults`] store.
#[derive(Debug, Clone)]
pub struct DefaultsSlot {
    defaults: Defaults,
    key: String,
}

impl DefaultsSlot {
    /// Create a slot for `key` in `defaults`.
    #[must_use]
    pub fn new(defaults: Defaults, key: impl Into<String>) -> Self {
        Self {
            defaults,
            key: key.into(),
        }
    }

    /// The defaults key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Storage for DefaultsSlot {
    fn read(&self) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.defaults.data(&self.key))
    }

    fn write(&self, bytes: &[u8]) -> Result<(), StoreError> {
        self.defaults.set(&self.key, bytes)
    }

    fn remove(&self) -> Result<(), StoreError> {
        self.defaults.remove(&self.key)
    }

    fn location(&self) -> String {
        format!("defaults:{}", self.key)
    }
}

/// A file at a caller supplied path.
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    /// Create a slot backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Storage for FileSlot {
    fn read(&self) -> Result<Option<Vec<u8>>, StoreError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, bytes: &[u8]) -> Result<(), StoreError> {
        write_atomic(&self.path, bytes)?;
        Ok(())
    }

    fn remove(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Write `bytes` to `path` through a sibling temp file and a rename.
///
/// Parent directories are created as needed.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_slot() {
        let defaults = Defaults::new();
        let slot = DefaultsSlot::new(defaults.clone(), "EmojiArtDocument.Untitled");
        assert!(slot.read().expect("read").is_none());

        slot.write(b"abc").expect("write");
        assert_eq!(slot.read().expect("read").as_deref(), Some(&b"abc"[..]));
        assert!(defaults.contains("EmojiArtDocument.Untitled"));
        assert_eq!(slot.location(), "defaults:EmojiArtDocument.Untitled");

        slot.remove().expect("remove");
        assert!(slot.read().expect("read").is_none());
    }

    #[test]
    fn test_file_slot_missing_reads_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let slot = FileSlot::new(dir.path().join("missing.json"));
        assert!(slot.read().expect("read").is_none());
        slot.remove().expect("removing a missing file is fine");
    }

    #[test]
    fn test_file_slot_write_creates_parents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("a").join("b").join("art.json");
        let slot = FileSlot::new(&path);

        slot.write(b"first").expect("write");
        slot.write(b"second").expect("overwrite");
        assert_eq!(slot.read().expect("read").as_deref(), Some(&b"second"[..]));
        assert!(!dir.path().join("a").join("b").join("art.json.tmp").exists());

        slot.remove().expect("remove");
        assert!(!path.exists());
    }

    #[test]
    fn test_file_slot_write_under_a_file_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").expect("write");
        let slot = FileSlot::new(blocker.join("art.json"));
        assert!(matches!(slot.write(b"x"), Err(StoreError::Io(_))));
    }
}
