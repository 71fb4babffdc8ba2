//! Named emoji palettes offered to the user when placing stickers.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{Defaults, StoreError};

/// Defaults key the palettes are saved under.
pub const PALETTES_KEY: &str = "EmojiArtDocument.PaletteNames";

const DEFAULT_PALETTES: &[(&str, &str)] = &[
    ("🐭🚗🚜⚛️🍕🇪🇺", "Mix"),
    ("🍏🍎🍐🍊🍋🍌🍉🍇🍓🍈🍒🍑🥭🍍🥥🥝🍅🍆🥑🥦", "Food"),
    ("🐶🐱🐹🐰🦊🐻🐼🐨🐯🦁🐮🐷🐸🐵🦄🐝🐛🦋🐌🐞", "Animals"),
    ("😀😅😂😍🥰😎🤓😭😡🥶🤯😴🙄😬🤠🥳", "Faces"),
    ("⚽️🏀🏈⚾️🎾🏐🥏🎱🏓🏸🥅🏒🏑⛳️🏹🎣🥊🛹", "Activities"),
];

/// A string of emoji with a display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    /// The emoji offered by this palette, concatenated.
    pub emojis: String,
    /// Display name.
    pub name: String,
}

/// Ordered palettes, optionally saved in [`Defaults`].
///
/// Palettes are addressed by their emoji string. Because a palette string
/// changes when emoji are added, lookups match the palette sharing the most
/// emoji with the string given, so a caller holding a slightly stale string
/// still lands on the right palette.
#[derive(Debug, Clone)]
pub struct PaletteBook {
    palettes: Vec<Palette>,
    defaults: Option<Defaults>,
}

impl Default for PaletteBook {
    fn default() -> Self {
        Self::new()
    }
}

impl PaletteBook {
    /// Create a book holding the built-in palettes (no persistence).
    #[must_use]
    pub fn new() -> Self {
        Self {
            palettes: default_palettes(),
            defaults: None,
        }
    }

    /// Load the palettes saved in `defaults`, seeding the built-in ones when
    /// nothing usable was saved.
    #[must_use]
    pub fn load(defaults: Defaults) -> Self {
        let palettes = defaults
            .data(PALETTES_KEY)
            .and_then(|bytes| match serde_json::from_slice::<Vec<Palette>>(&bytes) {
                Ok(palettes) => Some(palettes),
                Err(e) => {
                    tracing::debug!("Ignoring saved palettes: {e}");
                    None
                }
            })
            .filter(|palettes| !palettes.is_empty())
            .unwrap_or_else(default_palettes);
        Self {
            palettes,
            defaults: Some(defaults),
        }
    }

    /// All palettes in order.
    #[must_use]
    pub fn palettes(&self) -> &[Palette] {
        &self.palettes
    }

    /// The first palette's emoji.
    #[must_use]
    pub fn default_palette(&self) -> &str {
        self.palettes.first().map_or("", |p| p.emojis.as_str())
    }

    /// The display name of `palette`.
    #[must_use]
    pub fn name(&self, palette: &str) -> Option<&str> {
        self.index_of(palette).map(|i| self.palettes[i].name.as_str())
    }

    /// The palette following `palette`, wrapping to the first.
    ///
    /// Unknown palettes yield the default palette.
    #[must_use]
    pub fn palette_after(&self, palette: &str) -> &str {
        self.palette_with_offset(palette, 1)
    }

    /// The palette preceding `palette`, wrapping to the last.
    ///
    /// Unknown palettes yield the default palette.
    #[must_use]
    pub fn palette_before(&self, palette: &str) -> &str {
        self.palette_with_offset(palette, -1)
    }

    fn palette_with_offset(&self, palette: &str, offset: isize) -> &str {
        let Some(index) = self.index_of(palette) else {
            return self.default_palette();
        };
        let count = self.palettes.len();
        let step = offset.unsigned_abs() % count;
        let next = if offset >= 0 {
            (index + step) % count
        } else {
            (index + count - step) % count
        };
        &self.palettes[next].emojis
    }

    /// Add `emoji` to `palette` unless it is already there.
    ///
    /// Returns the palette's new emoji string, or `None` if no palette
    /// matches.
    ///
    /// # Errors
    ///
    /// Returns an error if the palettes could not be saved.
    pub fn add_emoji(&mut self, emoji: &str, palette: &str) -> Result<Option<String>, StoreError> {
        let Some(index) = self.index_of(palette) else {
            return Ok(None);
        };
        let target = &mut self.palettes[index];
        if !emoji.is_empty() && !target.emojis.contains(emoji) {
            target.emojis.push_str(emoji);
        }
        let updated = target.emojis.clone();
        self.save()?;
        Ok(Some(updated))
    }

    /// Rename `palette`. Unknown palettes are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the palettes could not be saved.
    pub fn rename_palette(&mut self, palette: &str, name: &str) -> Result<(), StoreError> {
        if let Some(index) = self.index_of(palette) {
            self.palettes[index].name = name.to_string();
            self.save()?;
        }
        Ok(())
    }

    /// Append a new palette.
    ///
    /// # Errors
    ///
    /// Returns an error if the palettes could not be saved.
    pub fn add_palette(&mut self, emojis: &str, name: &str) -> Result<(), StoreError> {
        self.palettes.push(Palette {
            emojis: emojis.to_string(),
            name: name.to_string(),
        });
        self.save()
    }

    /// Remove `palette`. The last remaining palette is never removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the palettes could not be saved.
    pub fn remove_palette(&mut self, palette: &str) -> Result<bool, StoreError> {
        if self.palettes.len() <= 1 {
            return Ok(false);
        }
        let Some(index) = self.index_of(palette) else {
            return Ok(false);
        };
        self.palettes.remove(index);
        self.save()?;
        Ok(true)
    }

    /// Index of the palette sharing the most emoji with `palette`.
    fn index_of(&self, palette: &str) -> Option<usize> {
        if let Some(exact) = self.palettes.iter().position(|p| p.emojis == palette) {
            return Some(exact);
        }
        let wanted = base_chars(palette);
        let mut best: Option<(usize, usize)> = None;
        for (index, candidate) in self.palettes.iter().enumerate() {
            let score = base_chars(&candidate.emojis).intersection(&wanted).count();
            if score > best.map_or(0, |(_, s)| s) {
                best = Some((index, score));
            }
        }
        best.map(|(index, _)| index)
    }

    fn save(&self) -> Result<(), StoreError> {
        let Some(ref defaults) = self.defaults else {
            return Ok(());
        };
        let json = serde_json::to_vec(&self.palettes)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        defaults.set(PALETTES_KEY, &json)
    }
}

/// Characters of `emojis` that can stand on their own. Joiners, variation
/// selectors, keycap marks, skin tone modifiers and tag characters only
/// modify a neighbour and never count as a shared emoji.
fn base_chars(emojis: &str) -> HashSet<char> {
    emojis.chars().filter(|c| !is_modifier(*c)).collect()
}

fn is_modifier(c: char) -> bool {
    matches!(
        c,
        '\u{200D}'
            | '\u{FE0E}'
            | '\u{FE0F}'
            | '\u{20E3}'
            | '\u{1F3FB}'..='\u{1F3FF}'
            | '\u{E0020}'..='\u{E007F}'
    )
}

fn default_palettes() -> Vec<Palette> {
    DEFAULT_PALETTES
        .iter()
        .map(|(emojis, name)| Palette {
            emojis: (*emojis).to_string(),
            name: (*name).to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_seeded() {
        let book = PaletteBook::new();
        assert_eq!(book.palettes().len(), DEFAULT_PALETTES.len());
        assert_eq!(book.default_palette(), "🐭🚗🚜⚛️🍕🇪🇺");
        assert_eq!(book.name(book.default_palette()), Some("Mix"));
    }

    #[test]
    fn test_cycling_wraps() {
        let book = PaletteBook::new();
        let first = book.default_palette().to_string();
        let last = book.palettes().last().expect("palettes").emojis.clone();

        assert_eq!(book.palette_before(&first), last);
        assert_eq!(book.palette_after(&last), first);

        let mut current = first.clone();
        for _ in 0..book.palettes().len() {
            current = book.palette_after(&current).to_string();
        }
        assert_eq!(current, first);
    }

    #[test]
    fn test_unknown_palette_yields_default() {
        let book = PaletteBook::new();
        assert_eq!(book.palette_after("xyz"), book.default_palette());
        assert_eq!(book.palette_before(""), book.default_palette());
        assert!(book.name("xyz").is_none());
    }

    #[test]
    fn test_add_emoji_and_stale_lookup() {
        let mut book = PaletteBook::new();
        let food = book.palettes()[1].emojis.clone();

        let updated = book
            .add_emoji("🌮", &food)
            .expect("save")
            .expect("palette exists");
        assert!(updated.ends_with("🌮"));

        // The pre-edit string still resolves to the edited palette.
        assert_eq!(book.name(&food), Some("Food"));

        let again = book.add_emoji("🌮", &updated).expect("save").expect("exists");
        assert_eq!(again, updated);
    }

    #[test]
    fn test_modifiers_alone_match_nothing() {
        let book = PaletteBook::new();
        assert_eq!(book.name("\u{FE0F}"), None);
        assert_eq!(book.name("\u{200D}\u{1F3FD}"), None);
        assert_eq!(book.palette_after("\u{FE0F}"), book.default_palette());
        // The atom keeps matching through its base character.
        assert_eq!(book.name("⚛️"), Some("Mix"));
    }

    #[test]
    fn test_rename_add_remove() {
        let mut book = PaletteBook::new();
        let mix = book.default_palette().to_string();
        book.rename_palette(&mix, "Things").expect("rename");
        assert_eq!(book.name(&mix), Some("Things"));

        book.add_palette("🌲🌳🌴", "Trees").expect("add");
        assert_eq!(book.name("🌲🌳🌴"), Some("Trees"));
        assert!(book.remove_palette("🌲🌳🌴").expect("remove"));
        assert!(book.name("🌲🌳🌴").is_none());
    }

    #[test]
    fn test_last_palette_is_kept() {
        let mut book = PaletteBook::new();
        while book.palettes().len() > 1 {
            let p = book.default_palette().to_string();
            assert!(book.remove_palette(&p).expect("remove"));
        }
        let p = book.default_palette().to_string();
        assert!(!book.remove_palette(&p).expect("remove"));
    }

    #[test]
    fn test_persisted_in_defaults() {
        let defaults = Defaults::new();
        let mut book = PaletteBook::load(defaults.clone());
        book.add_palette("🎈🎉", "Party").expect("add");

        let reloaded = PaletteBook::load(defaults);
        assert_eq!(reloaded.name("🎈🎉"), Some("Party"));
        assert_eq!(reloaded.palettes().len(), DEFAULT_PALETTES.len() + 1);
    }
}
