//! Offer model, defensive list parsing, and placeholder offers.

mod model;
mod placeholder;
mod wire;

pub use model::{ClaimRecord, Discount, DiscountKind, Offer, ValidityWindow};
pub use placeholder::{PLACEHOLDER_ID_PREFIX, is_placeholder, placeholder_offers};
pub use wire::{OfferListParse, parse_offer_list};
