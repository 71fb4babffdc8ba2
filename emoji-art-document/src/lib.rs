//! # Emoji Art Document
//!
//! The observable controller around an [`emoji_art_core::EmojiArt`] value.
//!
//! A document exposes intents (add, move, scale, remove, set background),
//! publishes change events to subscribers, persists every change in the
//! background and keeps a decoded background image up to date. Several
//! documents can be managed together through a [`DocumentStore`].
//!
//! All documents must be opened inside a tokio runtime.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod background;
pub mod document;
pub mod error;
pub mod fetch;
pub mod persist;
pub mod resolver;
pub mod store;

pub use background::{BackgroundImage, BackgroundState, ImageFormat};
pub use document::{DocumentEvent, DocumentId, DocumentOptions, EmojiArtDocument, UNTITLED_KEY};
pub use error::{FetchError, FetchResult};
pub use fetch::{FetchConfig, HttpFetcher, ImageFetcher};
pub use persist::Persister;
pub use resolver::{EmbeddedUrlResolver, IdentityResolver, UrlResolver};
pub use store::{DocumentStore, DEFAULT_DOCUMENT_NAME};
