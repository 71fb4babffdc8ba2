//! # Emoji Art Core
//!
//! The value model behind an emoji sticker canvas: placed emoji over an
//! optional background image, serializable to bytes, plus the key-value
//! defaults and storage slots documents are persisted in.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               emoji-art-core                │
//! ├─────────────────────────────────────────────┤
//! │  Value Model     │  Persistence             │
//! │  - EmojiArt      │  - Defaults (key/value)  │
//! │  - Emoji         │  - DefaultsSlot          │
//! │  - Geometry      │  - FileSlot              │
//! ├─────────────────────────────────────────────┤
//! │  Palettes                                   │
//! │  - Named emoji strings, cycling, editing    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! No async runtime is needed here; the observable document controller
//! lives in `emoji-art-document`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod art;
pub mod defaults;
pub mod emoji;
pub mod error;
pub mod geometry;
pub mod palette;
pub mod storage;

pub use art::EmojiArt;
pub use defaults::Defaults;
pub use emoji::{clamp_size, Emoji, EmojiId, MAX_EMOJI_SIZE, MIN_EMOJI_SIZE};
pub use error::{ArtError, ArtResult};
pub use geometry::{Offset, Point};
pub use palette::{Palette, PaletteBook};
pub use storage::{DefaultsSlot, FileSlot, Storage, StoreError};

/// Emoji art core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
