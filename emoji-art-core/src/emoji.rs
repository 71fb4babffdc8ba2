//! Placed emoji - the stickers that make up a document.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ArtError;

/// Smallest point size an emoji can have.
pub const MIN_EMOJI_SIZE: i32 = 10;

/// Largest point size an emoji can have.
pub const MAX_EMOJI_SIZE: i32 = 100;

/// Clamp a point size into `MIN_EMOJI_SIZE..=MAX_EMOJI_SIZE`.
#[must_use]
pub const fn clamp_size(size: i32) -> i32 {
    if size < MIN_EMOJI_SIZE {
        MIN_EMOJI_SIZE
    } else if size > MAX_EMOJI_SIZE {
        MAX_EMOJI_SIZE
    } else {
        size
    }
}

/// Unique identifier for a placed emoji.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EmojiId(Uuid);

impl EmojiId {
    /// Create a new unique emoji ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse an ID from its string form.
    ///
    /// # Errors
    ///
    /// Returns [`ArtError::InvalidId`] if `s` is not a UUID.
    pub fn parse(s: &str) -> Result<Self, ArtError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| ArtError::InvalidId(format!("{s}: {e}")))
    }

    /// The underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EmojiId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EmojiId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EmojiId {
    type Err = ArtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// An emoji placed on the canvas.
///
/// Positions are offsets from the canvas center in document space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Emoji {
    /// Unique identifier, stable for the emoji's lifetime.
    pub id: EmojiId,
    /// The emoji character(s).
    pub text: String,
    /// Horizontal offset.
    pub x: i32,
    /// Vertical offset.
    pub y: i32,
    /// Point size.
    pub size: i32,
}

impl Emoji {
    /// Create a new emoji with a fresh identity.
    #[must_use]
    pub fn new(text: impl Into<String>, x: i32, y: i32, size: i32) -> Self {
        Self {
            id: EmojiId::new(),
            text: text.into(),
            x,
            y,
            size,
        }
    }

    /// Font size for rendering.
    #[must_use]
    pub fn font_size(&self) -> f64 {
        f64::from(self.size)
    }

    /// Position as a floating point pair.
    #[must_use]
    pub fn location(&self) -> (f64, f64) {
        (f64::from(self.x), f64::from(self.y))
    }
}
