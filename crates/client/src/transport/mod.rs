//! Transport seam between the client core and the storefront API.
//!
//! Transports return the raw status and body; every interpretation (retry
//! on 429, "already claimed" detection, defensive parsing) happens in the
//! components above, so it behaves the same over HTTP and in tests.

pub mod http;
pub mod scripted;

use async_trait::async_trait;
use domain::ClaimRequest;
use thiserror::Error;

use crate::session::BearerToken;

pub use http::HttpTransport;
pub use scripted::{Endpoint, Gate, RecordedCall, Reply, ScriptedTransport};

/// Status and body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns true for 4xx statuses.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }
}

/// Failure to obtain any HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request exceeded its timeout.
    #[error("request timed out")]
    Timeout,

    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Any other request failure.
    #[error("request failed: {0}")]
    Request(String),
}

/// The three storefront API calls the claim workflow consumes.
#[async_trait]
pub trait StorefrontTransport: Send + Sync {
    /// `GET /api/offers`, with the bearer token when signed in so the
    /// server includes the caller's own claim records.
    async fn list_offers(&self, token: Option<&BearerToken>)
    -> Result<RawResponse, TransportError>;

    /// `POST /api/offers/claim` with a bearer token.
    async fn claim_offer(
        &self,
        token: &BearerToken,
        request: &ClaimRequest,
    ) -> Result<RawResponse, TransportError>;

    /// `GET /api/cart` with a bearer token.
    async fn fetch_cart(&self, token: &BearerToken) -> Result<RawResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classes() {
        assert!(RawResponse::new(200, "").is_success());
        assert!(RawResponse::new(204, "").is_success());
        assert!(!RawResponse::new(301, "").is_success());
        assert!(RawResponse::new(429, "").is_client_error());
        assert!(!RawResponse::new(500, "").is_client_error());
    }
}
