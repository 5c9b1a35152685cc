//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ledger::LedgerError;

/// Message the claim client matches to detect an idempotent repeat claim.
pub const ALREADY_CLAIMED_MESSAGE: &str = "You have already claimed this offer";

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Missing, malformed, or unknown bearer token.
    Unauthorized,
    /// Bad request from the client.
    BadRequest(String),
    /// Ledger rejected the claim.
    Ledger(LedgerError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Ledger(err) => ledger_error_to_response(err),
        };

        let body = serde_json::json!({ "success": false, "message": message });
        (status, axum::Json(body)).into_response()
    }
}

fn ledger_error_to_response(err: LedgerError) -> (StatusCode, String) {
    match err {
        LedgerError::OfferNotFound(_) => (StatusCode::NOT_FOUND, "Offer not found".to_string()),
        LedgerError::NotClaimable(_) => (
            StatusCode::BAD_REQUEST,
            "Offer is not currently available".to_string(),
        ),
        LedgerError::AlreadyClaimed { .. } => {
            (StatusCode::BAD_REQUEST, ALREADY_CLAIMED_MESSAGE.to_string())
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}
