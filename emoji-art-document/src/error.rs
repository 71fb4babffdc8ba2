//! Error types for background image retrieval.

use thiserror::Error;

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors that can occur while retrieving or decoding a background image.
///
/// These never reach intent callers; a failed fetch leaves the document
/// without a background image.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP status {0}")]
    Status(u16),

    /// The response body exceeded the configured limit.
    #[error("Image exceeds {limit} bytes")]
    TooLarge {
        /// Configured maximum body size.
        limit: usize,
    },

    /// Reading a local file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The URL scheme cannot be fetched.
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    /// A `data:` URL was malformed.
    #[error("Invalid data URL: {0}")]
    InvalidDataUrl(String),

    /// The bytes are not a decodable image.
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// A background task was cancelled or panicked.
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
