//! Client error types.

use domain::DomainError;
use thiserror::Error;

use crate::transport::TransportError;

/// Errors surfaced by catalog and cart reads.
///
/// Claim attempts never return these; they resolve to a
/// [`domain::ClaimOutcome`] instead.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request did not produce an HTTP response.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server answered with a non-success status.
    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be interpreted.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// No usable session is stored.
    #[error("Not signed in")]
    Unauthenticated,

    /// The HTTP client could not be constructed.
    #[error("HTTP client setup failed: {0}")]
    Setup(String),
}

impl From<DomainError> for ClientError {
    fn from(err: DomainError) -> Self {
        ClientError::Malformed(err.to_string())
    }
}

/// Convenience type alias for client results.
pub type Result<T> = std::result::Result<T, ClientError>;
