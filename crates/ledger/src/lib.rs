//! Server-side collaborators of the offer-claim workflow.
//!
//! [`ClaimLedger`] is the durable record of which user claimed which offer and
//! the authoritative enforcer of the at-most-once invariant. [`CartStore`]
//! holds per-user carts. Clients never see these traits; they talk to the HTTP
//! endpoints backed by them. The in-memory implementations serve tests and the
//! reference server.

pub mod cart_store;
pub mod error;
pub mod memory;
pub mod store;

pub use cart_store::{CartStore, InMemoryCartStore};
pub use error::{LedgerError, Result};
pub use memory::InMemoryClaimLedger;
pub use store::{ClaimLedger, ClaimReceipt};
