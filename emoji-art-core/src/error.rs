//! Error types for emoji art operations.

use thiserror::Error;

/// Result type for emoji art operations.
pub type ArtResult<T> = Result<T, ArtError>;

/// Errors that can occur in emoji art operations.
#[derive(Debug, Error)]
pub enum ArtError {
    /// Document serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Two emoji in one document share an identity.
    #[error("Duplicate emoji id: {0}")]
    DuplicateEmoji(String),

    /// A string could not be parsed as an emoji id.
    #[error("Invalid emoji id: {0}")]
    InvalidId(String),
}
