//! A named collection of documents kept in one [`Defaults`] store.
//!
//! The index maps document IDs to display names and lives at
//! `EmojiArtDocumentStore.<store name>`; each document's bytes live at
//! `EmojiArtDocument.<id>`.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use emoji_art_core::{Defaults, DefaultsSlot, Storage, StoreError};

use crate::document::{DocumentId, DocumentOptions, EmojiArtDocument};

/// Base name given to documents created without one.
pub const DEFAULT_DOCUMENT_NAME: &str = "Untitled";

/// Key holding a document's bytes.
#[must_use]
pub fn document_key(id: DocumentId) -> String {
    format!("EmojiArtDocument.{id}")
}

/// Key holding a store's index.
#[must_use]
pub fn index_key(store_name: &str) -> String {
    format!("EmojiArtDocumentStore.{store_name}")
}

/// A persistent, named set of documents.
pub struct DocumentStore {
    name: String,
    defaults: Defaults,
    options: DocumentOptions,
    index: Mutex<BTreeMap<DocumentId, String>>,
    open: Mutex<HashMap<DocumentId, OpenDocument>>,
}

struct OpenDocument {
    document: EmojiArtDocument,
    removed: Arc<AtomicBool>,
}

/// A document's defaults slot that ignores writes once the document has
/// been removed from its store.
#[derive(Debug)]
struct StoreSlot {
    slot: DefaultsSlot,
    removed: Arc<AtomicBool>,
}

impl Storage for StoreSlot {
    fn read(&self) -> Result<Option<Vec<u8>>, StoreError> {
        self.slot.read()
    }

    fn write(&self, bytes: &[u8]) -> Result<(), StoreError> {
        if self.removed.load(Ordering::Acquire) {
            tracing::debug!(key = %self.slot.key(), "Ignoring write to removed document");
            return Ok(());
        }
        self.slot.write(bytes)
    }

    fn remove(&self) -> Result<(), StoreError> {
        self.slot.remove()
    }

    fn location(&self) -> String {
        self.slot.location()
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("name", &self.name)
            .field("documents", &self.lock_index().len())
            .finish_non_exhaustive()
    }
}

impl DocumentStore {
    /// Load the store called `name` from `defaults`.
    ///
    /// A missing or malformed index yields an empty store.
    #[must_use]
    pub fn new(name: impl Into<String>, defaults: Defaults, options: DocumentOptions) -> Self {
        let name = name.into();
        let index = load_index(&defaults, &name);
        tracing::debug!(store = %name, documents = index.len(), "Loaded document store");
        Self {
            name,
            defaults,
            options,
            index: Mutex::new(index),
            open: Mutex::new(HashMap::new()),
        }
    }

    /// The store's name.
    #[must_use]
    pub fn store_name(&self) -> &str {
        &self.name
    }

    /// All documents as `(id, name)` pairs, sorted by name.
    #[must_use]
    pub fn documents(&self) -> Vec<(DocumentId, String)> {
        let mut documents: Vec<_> = self
            .lock_index()
            .iter()
            .map(|(id, name)| (*id, name.clone()))
            .collect();
        documents.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));
        documents
    }

    /// The display name of a document.
    #[must_use]
    pub fn name(&self, id: DocumentId) -> Option<String> {
        self.lock_index().get(&id).cloned()
    }

    /// Find a document by exact display name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<DocumentId> {
        self.lock_index()
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(id, _)| *id)
    }

    /// Create an empty document and open it.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be saved.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn add_document(&self, name: Option<&str>) -> Result<EmojiArtDocument, StoreError> {
        let id = DocumentId::new();
        {
            let mut index = self.lock_index();
            let name = unique_name(&index, name.unwrap_or(DEFAULT_DOCUMENT_NAME), None);
            tracing::info!(store = %self.name, document = %id, %name, "Adding document");
            index.insert(id, name);
            self.save_index(&index)?;
        }
        let open = self.spawn_document(id);
        let document = open.document.clone();
        self.lock_open().insert(id, open);
        Ok(document)
    }

    /// Open a document, or return the already open handle.
    ///
    /// Returns `None` if the store has no such document.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn open(&self, id: DocumentId) -> Option<EmojiArtDocument> {
        if !self.lock_index().contains_key(&id) {
            return None;
        }
        let mut open = self.lock_open();
        let document = open
            .entry(id)
            .or_insert_with(|| self.spawn_document(id))
            .document
            .clone();
        Some(document)
    }

    /// Rename a document. The name is made unique among the other
    /// documents; the name actually given is returned.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DocumentNotFound`] for an unknown ID, or an
    /// error if the index cannot be saved.
    pub fn set_name(&self, id: DocumentId, name: &str) -> Result<String, StoreError> {
        let mut index = self.lock_index();
        if !index.contains_key(&id) {
            return Err(StoreError::DocumentNotFound(id.to_string()));
        }
        let name = unique_name(&index, name, Some(id));
        index.insert(id, name.clone());
        self.save_index(&index)?;
        Ok(name)
    }

    /// Delete a document and its stored bytes.
    ///
    /// Handles to the document stay usable but no longer persist anything,
    /// so they cannot recreate it. Returns `false` if there was no such
    /// document.
    ///
    /// # Errors
    ///
    /// Returns an error if the index or the document key cannot be updated.
    pub async fn remove_document(&self, id: DocumentId) -> Result<bool, StoreError> {
        {
            let mut index = self.lock_index();
            if index.remove(&id).is_none() {
                return Ok(false);
            }
            self.save_index(&index)?;
        }
        let open = self.lock_open().remove(&id);
        if let Some(open) = open {
            open.removed.store(true, Ordering::Release);
            // Let a write already in progress finish before deleting.
            open.document.flush().await;
        }
        self.defaults.remove(&document_key(id))?;
        tracing::info!(store = %self.name, document = %id, "Removed document");
        Ok(true)
    }

    /// Wait for pending writes of every open document.
    pub async fn flush(&self) {
        let documents: Vec<_> = self
            .lock_open()
            .values()
            .map(|open| open.document.clone())
            .collect();
        for document in documents {
            document.flush().await;
        }
    }

    fn spawn_document(&self, id: DocumentId) -> OpenDocument {
        let removed = Arc::new(AtomicBool::new(false));
        let slot = StoreSlot {
            slot: DefaultsSlot::new(self.defaults.clone(), document_key(id)),
            removed: Arc::clone(&removed),
        };
        OpenDocument {
            document: EmojiArtDocument::open(id, Arc::new(slot), self.options.clone()),
            removed,
        }
    }

    fn save_index(&self, index: &BTreeMap<DocumentId, String>) -> Result<(), StoreError> {
        let wire: BTreeMap<String, &String> =
            index.iter().map(|(id, n)| (id.to_string(), n)).collect();
        let bytes =
            serde_json::to_vec(&wire).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.defaults.set(&index_key(&self.name), &bytes)
    }

    fn lock_index(&self) -> MutexGuard<'_, BTreeMap<DocumentId, String>> {
        self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_open(&self) -> MutexGuard<'_, HashMap<DocumentId, OpenDocument>> {
        self.open.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn load_index(defaults: &Defaults, store_name: &str) -> BTreeMap<DocumentId, String> {
    let Some(bytes) = defaults.data(&index_key(store_name)) else {
        return BTreeMap::new();
    };
    let wire: BTreeMap<String, String> = match serde_json::from_slice(&bytes) {
        Ok(wire) => wire,
        Err(e) => {
            tracing::warn!(store = %store_name, "Ignoring malformed document index: {e}");
            return BTreeMap::new();
        }
    };
    wire.into_iter()
        .filter_map(|(id, name)| match DocumentId::parse(&id) {
            Ok(id) => Some((id, name)),
            Err(e) => {
                tracing::warn!(store = %store_name, "Skipping index entry {id}: {e}");
                None
            }
        })
        .collect()
}

/// `base`, or `base 2`, `base 3`, ... whichever is first unused by a
/// document other than `except`.
fn unique_name(
    index: &BTreeMap<DocumentId, String>,
    base: &str,
    except: Option<DocumentId>,
) -> String {
    let taken = |candidate: &str| {
        index
            .iter()
            .any(|(id, name)| Some(*id) != except && name == candidate)
    };
    if !taken(base) {
        return base.to_string();
    }
    (2_u64..)
        .map(|n| format!("{base} {n}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_name() {
        let mut index = BTreeMap::new();
        assert_eq!(unique_name(&index, "Untitled", None), "Untitled");

        let first = DocumentId::new();
        index.insert(first, "Untitled".to_string());
        assert_eq!(unique_name(&index, "Untitled", None), "Untitled 2");

        index.insert(DocumentId::new(), "Untitled 2".to_string());
        assert_eq!(unique_name(&index, "Untitled", None), "Untitled 3");

        // A document keeps its own name when renamed to it.
        assert_eq!(unique_name(&index, "Untitled", Some(first)), "Untitled");
    }

    #[test]
    fn test_keys() {
        let id = DocumentId::parse("67e55044-10b1-426f-9247-bb680e5fe0c8").expect("uuid");
        assert_eq!(
            document_key(id),
            "EmojiArtDocument.67e55044-10b1-426f-9247-bb680e5fe0c8"
        );
        assert_eq!(index_key("Main"), "EmojiArtDocumentStore.Main");
    }

    #[test]
    fn test_malformed_index_is_empty() {
        let defaults = Defaults::new();
        defaults.set(&index_key("Main"), b"[1, 2").expect("set");
        assert!(load_index(&defaults, "Main").is_empty());
    }

    #[test]
    fn test_bad_index_entries_are_skipped() {
        let defaults = Defaults::new();
        let good = DocumentId::new();
        let json = format!(r#"{{"{good}": "Kept", "not-a-uuid": "Dropped"}}"#);
        defaults.set(&index_key("Main"), json.as_bytes()).expect("set");

        let index = load_index(&defaults, "Main");
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(&good).map(String::as_str), Some("Kept"));
    }
}
