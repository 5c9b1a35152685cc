use common::{OfferId, UserId};
use thiserror::Error;

/// Errors that can occur when recording a claim.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// No offer exists with the given ID.
    #[error("Offer not found: {0}")]
    OfferNotFound(OfferId),

    /// The offer is inactive or outside its validity window.
    #[error("Offer is not currently available: {0}")]
    NotClaimable(OfferId),

    /// A claim record already exists for this (offer, user) pair.
    #[error("You have already claimed this offer ({offer_id}, user {user_id})")]
    AlreadyClaimed { offer_id: OfferId, user_id: UserId },
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
