//! The emoji art document value.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{clamp_size, ArtError, ArtResult, Emoji, EmojiId};

/// A document: an optional background image and the emoji placed over it.
///
/// Emoji are kept in insertion order, which is also their z-order. Equality
/// ignores that order: two documents are equal when they share a background
/// and contain the same emoji.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmojiArt {
    /// Reference to the background image, if any.
    #[serde(rename = "backgroundURL")]
    pub background_url: Option<Url>,
    /// Placed emoji in z-order.
    emojis: Vec<Emoji>,
}

impl EmojiArt {
    /// Create an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new emoji with a fresh identity.
    ///
    /// The size is stored as given.
    pub fn add_emoji(&mut self, text: impl Into<String>, x: i32, y: i32, size: i32) -> Emoji {
        let emoji = Emoji::new(text, x, y, size);
        self.emojis.push(emoji.clone());
        emoji
    }

    /// All emoji in z-order.
    #[must_use]
    pub fn emojis(&self) -> &[Emoji] {
        &self.emojis
    }

    /// Position of an emoji in z-order.
    #[must_use]
    pub fn index_of(&self, id: EmojiId) -> Option<usize> {
        self.emojis.iter().position(|e| e.id == id)
    }

    /// Look up an emoji by identity.
    #[must_use]
    pub fn emoji(&self, id: EmojiId) -> Option<&Emoji> {
        self.emojis.iter().find(|e| e.id == id)
    }

    /// Look up an emoji by identity for in-place mutation.
    pub fn emoji_mut(&mut self, id: EmojiId) -> Option<&mut Emoji> {
        self.emojis.iter_mut().find(|e| e.id == id)
    }

    /// Remove an emoji, returning it if it was present.
    pub fn remove_emoji(&mut self, id: EmojiId) -> Option<Emoji> {
        let index = self.index_of(id)?;
        Some(self.emojis.remove(index))
    }

    /// Clamp every emoji size into the allowed range, returning how many
    /// emoji were adjusted.
    pub fn clamp_sizes(&mut self) -> usize {
        let mut adjusted = 0;
        for emoji in &mut self.emojis {
            let clamped = clamp_size(emoji.size);
            if clamped != emoji.size {
                emoji.size = clamped;
                adjusted += 1;
            }
        }
        adjusted
    }

    /// Number of placed emoji.
    #[must_use]
    pub fn len(&self) -> usize {
        self.emojis.len()
    }

    /// Check if no emoji are placed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.emojis.is_empty()
    }

    /// Serialize the document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode(&self) -> ArtResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(ArtError::Serialization)
    }

    /// Deserialize a document, reporting why the bytes were rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a document or two emoji share
    /// an identity.
    pub fn try_decode(bytes: &[u8]) -> ArtResult<Self> {
        let art: Self = serde_json::from_slice(bytes)?;
        let mut seen = HashSet::with_capacity(art.emojis.len());
        for emoji in &art.emojis {
            if !seen.insert(emoji.id) {
                return Err(ArtError::DuplicateEmoji(emoji.id.to_string()));
            }
        }
        Ok(art)
    }

    /// Deserialize a document, or `None` if the bytes are malformed.
    #[must_use]
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        match Self::try_decode(bytes) {
            Ok(art) => Some(art),
            Err(e) => {
                tracing::debug!("Rejecting persisted document: {e}");
                None
            }
        }
    }
}

impl PartialEq for EmojiArt {
    fn eq(&self, other: &Self) -> bool {
        self.background_url == other.background_url
            && self.emojis.len() == other.emojis.len()
            && self
                .emojis
                .iter()
                .all(|e| other.emoji(e.id).is_some_and(|o| o == e))
    }
}

impl Eq for EmojiArt {}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EmojiArt {
        let mut art = EmojiArt::new();
        art.background_url = Some(Url::parse("https://example.com/bg.png").expect("url"));
        art.add_emoji("🍕", 10, 20, 40);
        art.add_emoji("🚗", -5, 0, 12);
        art.add_emoji("🇪🇺", 300, -300, 100);
        art
    }

    #[test]
    fn test_add_then_find() {
        let mut art = sample();
        let added = art.add_emoji("🍕", 10, 20, 40);

        let found = art.emoji(added.id).expect("emoji should exist");
        assert_eq!(found.text, "🍕");
        assert_eq!((found.x, found.y, found.size), (10, 20, 40));
        assert_eq!(art.emojis().last(), Some(&added));
        assert_eq!(art.index_of(added.id), Some(art.len() - 1));
    }

    #[test]
    fn test_add_stores_size_as_given() {
        let mut art = EmojiArt::new();
        let emoji = art.add_emoji("🐭", 0, 0, 500);
        assert_eq!(emoji.size, 500);
    }

    #[test]
    fn test_round_trip_preserves_order() {
        let art = sample();
        let bytes = art.encode().expect("encode");
        let decoded = EmojiArt::decode(&bytes).expect("decode");

        assert_eq!(decoded, art);
        assert_eq!(decoded.emojis(), art.emojis());
    }

    #[test]
    fn test_encode_is_deterministic() {
        let art = sample();
        assert_eq!(art.encode().expect("a"), art.encode().expect("b"));
    }

    #[test]
    fn test_encoded_shape() {
        let mut art = EmojiArt::new();
        let emoji = art.add_emoji("🍕", 1, 2, 30);
        let value: serde_json::Value =
            serde_json::from_slice(&art.encode().expect("encode")).expect("json");

        assert!(value["backgroundURL"].is_null());
        assert!(value.get("background_url").is_none());
        assert_eq!(value["emojis"][0]["id"], emoji.id.to_string());
        assert_eq!(value["emojis"][0]["text"], "🍕");
    }

    #[test]
    fn test_decode_external_shape() {
        let bytes = r#"{"backgroundURL":"https://a.test/x.png","emojis":[{"id":"67e55044-10b1-426f-9247-bb680e5fe0c8","text":"🍕","x":3,"y":-4,"size":40}]}"#.as_bytes();
        let art = EmojiArt::decode(bytes).expect("decode");

        assert_eq!(
            art.background_url.as_ref().map(Url::as_str),
            Some("https://a.test/x.png")
        );
        assert_eq!(art.len(), 1);
        assert_eq!((art.emojis()[0].x, art.emojis()[0].y), (3, -4));

        let reencoded = EmojiArt::decode(&art.encode().expect("encode")).expect("decode again");
        assert_eq!(reencoded, art);
    }

    #[test]
    fn test_decode_garbage_is_none() {
        assert!(EmojiArt::decode(b"").is_none());
        assert!(EmojiArt::decode(b"\xff\xfe\x00").is_none());
        assert!(EmojiArt::decode(b"{\"emojis\": 7}").is_none());
        assert!(EmojiArt::decode(b"[1, 2, 3]").is_none());
    }

    #[test]
    fn test_decode_rejects_duplicate_ids() {
        let mut art = EmojiArt::new();
        let emoji = art.add_emoji("🍕", 0, 0, 40);
        art.emojis.push(emoji);

        let bytes = art.encode().expect("encode");
        assert!(matches!(
            EmojiArt::try_decode(&bytes),
            Err(ArtError::DuplicateEmoji(_))
        ));
        assert!(EmojiArt::decode(&bytes).is_none());
    }

    #[test]
    fn test_equality_ignores_order() {
        let art = sample();
        let mut reversed = art.clone();
        reversed.emojis.reverse();
        assert_eq!(art, reversed);

        let mut moved = art.clone();
        let first = moved.emojis()[0].id;
        moved.emoji_mut(first).expect("exists").x += 1;
        assert_ne!(art, moved);
    }

    #[test]
    fn test_clamp_sizes() {
        let mut art = EmojiArt::new();
        let big = art.add_emoji("🍕", 0, 0, 500);
        let small = art.add_emoji("🚗", 0, 0, 1);
        let fine = art.add_emoji("🐭", 0, 0, 55);

        assert_eq!(art.clamp_sizes(), 2);
        assert_eq!(art.emoji(big.id).map(|e| e.size), Some(100));
        assert_eq!(art.emoji(small.id).map(|e| e.size), Some(10));
        assert_eq!(art.emoji(fine.id).map(|e| e.size), Some(55));
        assert_eq!(art.clamp_sizes(), 0);
    }

    #[test]
    fn test_remove_emoji() {
        let mut art = sample();
        let id = art.emojis()[1].id;

        let removed = art.remove_emoji(id).expect("should remove");
        assert_eq!(removed.text, "🚗");
        assert_eq!(art.len(), 2);
        assert!(art.remove_emoji(id).is_none());
    }
}
