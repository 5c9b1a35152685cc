//! Shared types for the storefront offer-claim workspace.

pub mod types;

pub use types::{OfferId, ProductId, UserId};
