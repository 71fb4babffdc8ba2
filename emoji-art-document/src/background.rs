//! Decoded background images and the per-document image cache state.

use std::sync::Arc;

use crate::error::{FetchError, FetchResult};

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG with alpha support.
    Png,
    /// JPEG (no alpha).
    Jpeg,
    /// GIF (first frame only).
    Gif,
    /// WebP (alpha support).
    WebP,
    /// Unknown/other format.
    Unknown,
}

impl ImageFormat {
    /// Detect format from magic bytes.
    #[must_use]
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.len() < 4 {
            return Self::Unknown;
        }

        // PNG: 89 50 4E 47
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Self::Png;
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Self::Jpeg;
        }

        if data.starts_with(b"GIF8") {
            return Self::Gif;
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Self::WebP;
        }

        Self::Unknown
    }
}

/// A background image decoded to RGBA pixels.
#[derive(Clone, PartialEq, Eq)]
pub struct BackgroundImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// RGBA pixel data (4 bytes per pixel).
    pub pixels: Vec<u8>,
    /// Format of the source bytes.
    pub format: ImageFormat,
}

impl BackgroundImage {
    /// Decode an image from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Decode`] if the bytes are not a supported image.
    pub fn decode(data: &[u8]) -> FetchResult<Self> {
        let format = ImageFormat::from_magic_bytes(data);

        let img = image::load_from_memory(data).map_err(|e| FetchError::Decode(e.to_string()))?;

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        Ok(Self {
            width,
            height,
            pixels: rgba.into_raw(),
            format,
        })
    }
}

impl std::fmt::Debug for BackgroundImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// The transient background image cache of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BackgroundState {
    /// No background, or the last fetch failed.
    #[default]
    Absent,
    /// A fetch is in flight.
    Loading,
    /// The image is decoded and ready to draw.
    Ready(Arc<BackgroundImage>),
}

impl BackgroundState {
    /// The decoded image, if ready.
    #[must_use]
    pub fn image(&self) -> Option<&Arc<BackgroundImage>> {
        match self {
            Self::Ready(image) => Some(image),
            Self::Absent | Self::Loading => None,
        }
    }

    /// Check if a fetch is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}
