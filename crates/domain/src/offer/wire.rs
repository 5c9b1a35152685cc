//! Defensive parsing of the `GET /api/offers` response body.
//!
//! The envelope must be well formed; individual offer records are parsed one
//! at a time and a record with missing or malformed fields is dropped instead
//! of failing the whole list.

use chrono::{DateTime, Utc};
use common::{OfferId, ProductId};
use serde::Deserialize;
use serde_json::Value;

use super::model::{ClaimRecord, Discount, DiscountKind, Offer, ValidityWindow};
use crate::error::{DomainError, Result};

/// Offers successfully read from a list response.
#[derive(Debug, Clone, Default)]
pub struct OfferListParse {
    /// Records that passed validation, in response order.
    pub offers: Vec<Offer>,
    /// Number of records dropped as malformed.
    pub skipped: usize,
}

/// Product reference as sent by the server: either a bare ID or a
/// populated product document.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireProductRef {
    Id(String),
    Document {
        #[serde(alias = "_id")]
        id: String,
    },
}

impl From<WireProductRef> for ProductId {
    fn from(r: WireProductRef) -> Self {
        match r {
            WireProductRef::Id(id) | WireProductRef::Document { id } => ProductId::new(id),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireOffer {
    #[serde(alias = "_id")]
    id: String,
    title: String,
    discount: f64,
    discount_type: DiscountKind,
    #[serde(default)]
    products: Vec<WireProductRef>,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    is_active: bool,
    #[serde(default)]
    claimed_by: Vec<ClaimRecord>,
}

impl TryFrom<WireOffer> for Offer {
    type Error = DomainError;

    fn try_from(w: WireOffer) -> Result<Self> {
        let invalid = |reason: &str| DomainError::InvalidOffer {
            id: w.id.clone(),
            reason: reason.to_string(),
        };

        if w.id.trim().is_empty() {
            return Err(invalid("empty id"));
        }
        if !w.discount.is_finite() || w.discount < 0.0 {
            return Err(invalid("discount must be a non-negative number"));
        }
        if w.discount_type == DiscountKind::Percentage && w.discount > 100.0 {
            return Err(invalid("percentage discount above 100"));
        }
        let validity = ValidityWindow::new(w.start_date, w.end_date)
            .ok_or_else(|| invalid("end date precedes start date"))?;

        Ok(Offer {
            id: OfferId::new(w.id),
            title: w.title,
            discount: Discount {
                kind: w.discount_type,
                value: w.discount,
            },
            products: w.products.into_iter().map(ProductId::from).collect(),
            validity,
            is_active: w.is_active,
            claims: w.claimed_by,
        })
    }
}

/// Parses a single offer record.
pub(crate) fn parse_offer(value: Value) -> Result<Offer> {
    let wire: WireOffer = serde_json::from_value(value)?;
    Offer::try_from(wire)
}

/// Parses a `{ data: { offers: [...] } }` body.
///
/// Fails only when the body is not JSON or the envelope lacks the offers
/// array. Malformed records are skipped and counted.
pub fn parse_offer_list(body: &str) -> Result<OfferListParse> {
    let mut root: Value = serde_json::from_str(body)?;
    let records = match root.pointer_mut("/data/offers").map(Value::take) {
        Some(Value::Array(records)) => records,
        Some(_) => {
            return Err(DomainError::MalformedPayload(
                "data.offers is not an array".to_string(),
            ));
        }
        None => {
            return Err(DomainError::MalformedPayload(
                "missing data.offers".to_string(),
            ));
        }
    };

    let mut parsed = OfferListParse::default();
    for (index, record) in records.into_iter().enumerate() {
        match parse_offer(record) {
            Ok(offer) => parsed.offers.push(offer),
            Err(e) => {
                tracing::warn!(index, error = %e, "skipping malformed offer record");
                parsed.skipped += 1;
            }
        }
    }
    Ok(parsed)
}
