//! HTTP route handlers.

pub mod cart;
pub mod health;
pub mod metrics;
pub mod offers;
