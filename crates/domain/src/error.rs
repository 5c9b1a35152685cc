//! Domain error types.

use thiserror::Error;

/// Errors raised while interpreting payloads received from the storefront API.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The response body is not the expected JSON envelope.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// A single offer record failed validation.
    #[error("Invalid offer {id}: {reason}")]
    InvalidOffer { id: String, reason: String },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
