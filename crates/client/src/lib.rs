//! Client core of the storefront offer-claim workflow.
//!
//! Three components cooperate around a shared per-tab [`Storefront`]:
//! 1. [`OfferCatalogClient`] fetches the offer list, retrying rate-limited
//!    responses with exponential backoff and degrading to placeholder offers
//! 2. [`ClaimCoordinator`] claims an offer at most once at a time per offer
//!    and classifies the server's answer into a [`domain::ClaimOutcome`]
//! 3. [`CartSynchronizer`] replaces the local cart view with server truth
//!    after a successful or already-claimed outcome
//!
//! [`OfferPanel`] is the consuming view: it owns the cancellation scope and
//! the "still mounted" flag that guard every view-state update.

pub mod cart_sync;
pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod panel;
pub mod session;
pub mod storefront;
pub mod transport;

pub use cart_sync::{CartSynchronizer, SharedCart};
pub use catalog::{CatalogFetch, OfferCatalogClient};
pub use config::ClientConfig;
pub use coordinator::{ClaimCoordinator, OfferClaimStatus};
pub use error::{ClientError, Result};
pub use panel::{CatalogStatus, Notice, OfferPanel, ViewScope};
pub use session::{BearerToken, MemorySessionStore, Session, SessionStore};
pub use storefront::Storefront;
pub use transport::{HttpTransport, RawResponse, StorefrontTransport, TransportError};
pub use tokio_util::sync::CancellationToken;
