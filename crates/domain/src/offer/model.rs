//! Offer value objects.

use chrono::{DateTime, Utc};
use common::{OfferId, ProductId, UserId};
use serde::{Deserialize, Serialize};

/// How an offer's discount magnitude is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
    /// Magnitude is a percentage of the line price.
    Percentage,
    /// Magnitude is a fixed currency amount.
    Fixed,
}

impl DiscountKind {
    /// Returns the wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountKind::Percentage => "percentage",
            DiscountKind::Fixed => "fixed",
        }
    }
}

impl std::fmt::Display for DiscountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A discount magnitude together with its kind.
///
/// How the discount is applied to prices is decided by the server; clients
/// only carry and display it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    #[serde(rename = "discountType")]
    pub kind: DiscountKind,
    #[serde(rename = "discount")]
    pub value: f64,
}

impl Discount {
    /// Creates a percentage discount.
    pub fn percentage(value: f64) -> Self {
        Self {
            kind: DiscountKind::Percentage,
            value,
        }
    }

    /// Creates a fixed-amount discount.
    pub fn fixed(value: f64) -> Self {
        Self {
            kind: DiscountKind::Fixed,
            value,
        }
    }
}

impl std::fmt::Display for Discount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            DiscountKind::Percentage => write!(f, "{}% off", self.value),
            DiscountKind::Fixed => write!(f, "{:.2} off", self.value),
        }
    }
}

/// Inclusive validity window `[start, end]` of an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidityWindow {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl ValidityWindow {
    /// Creates a window; returns `None` when `end` precedes `start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start <= end).then_some(Self {
            start_date: start,
            end_date: end,
        })
    }

    /// Returns true if `at` lies inside the window, bounds included.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start_date <= at && at <= self.end_date
    }
}

/// Durable record of a user having claimed an offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRecord {
    pub user_id: UserId,
    pub claimed_at: DateTime<Utc>,
}

impl ClaimRecord {
    /// Creates a claim record for `user_id` at `claimed_at`.
    pub fn new(user_id: UserId, claimed_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            claimed_at,
        }
    }
}

/// A time-bounded, possibly product-scoped discount a user may claim once.
///
/// Offers are owned by the server. Clients never mutate them; they request a
/// claim and re-read.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    #[serde(rename = "_id")]
    pub id: OfferId,
    pub title: String,
    #[serde(flatten)]
    pub discount: Discount,
    /// Eligible products. Empty means the offer applies to all products.
    pub products: Vec<ProductId>,
    #[serde(flatten)]
    pub validity: ValidityWindow,
    pub is_active: bool,
    #[serde(rename = "claimedBy")]
    pub claims: Vec<ClaimRecord>,
}

impl Offer {
    /// Returns true if the offer may be claimed at `now`:
    /// active and `now` inside the validity window.
    pub fn is_claimable_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.validity.contains(now)
    }

    /// Returns true if a claim record exists for `user_id`.
    pub fn is_claimed_by(&self, user_id: &UserId) -> bool {
        self.claims.iter().any(|c| &c.user_id == user_id)
    }

    /// Number of products statically associated with the offer.
    pub fn product_count(&self) -> usize {
        self.products.len()
    }

    /// Returns true if the offer is not restricted to specific products.
    pub fn applies_to_all_products(&self) -> bool {
        self.products.is_empty()
    }
}
