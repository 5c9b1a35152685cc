//! Domain layer for the storefront offer-claim workflow.
//!
//! This crate holds the data model shared by the client and the server side:
//! - [`Offer`] and [`ClaimRecord`], owned by the server and only read by clients
//! - [`CartView`], the client-held projection of the server cart
//! - [`ClaimAttemptState`] and [`ClaimOutcome`] for the per-offer claim lifecycle
//! - Defensive parsing of the offer list and claim/cart response bodies

pub mod cart;
pub mod claim;
pub mod error;
pub mod offer;

pub use cart::{AppliedDiscount, CartLine, CartView};
pub use claim::{
    ClaimAttemptState, ClaimOutcome, ClaimRequest, ClaimResponseBody, FailureReason,
    GENERIC_CLAIM_FAILURE, indicates_already_claimed,
};
pub use error::{DomainError, Result};
pub use offer::{
    ClaimRecord, Discount, DiscountKind, Offer, OfferListParse, ValidityWindow, is_placeholder,
    parse_offer_list, placeholder_offers,
};
