//! Hardcoded offers shown while the catalog endpoint is rate limiting us.
//!
//! These are display-only. They are never written anywhere as server data.

use chrono::{DateTime, Duration, Utc};
use common::{OfferId, ProductId};

use super::model::{Discount, Offer, ValidityWindow};

/// Prefix shared by every placeholder offer ID.
pub const PLACEHOLDER_ID_PREFIX: &str = "placeholder-";

/// Returns true if `id` names a placeholder offer.
pub fn is_placeholder(id: &OfferId) -> bool {
    id.as_str().starts_with(PLACEHOLDER_ID_PREFIX)
}

/// Builds the placeholder offer list, valid for 30 days from `now`.
pub fn placeholder_offers(now: DateTime<Utc>) -> Vec<Offer> {
    let window = ValidityWindow {
        start_date: now,
        end_date: now + Duration::days(30),
    };

    vec![
        Offer {
            id: OfferId::new(format!("{PLACEHOLDER_ID_PREFIX}welcome")),
            title: "Welcome discount".to_string(),
            discount: Discount::percentage(10.0),
            products: vec![],
            validity: window,
            is_active: true,
            claims: vec![],
        },
        Offer {
            id: OfferId::new(format!("{PLACEHOLDER_ID_PREFIX}bundle")),
            title: "Bundle savings".to_string(),
            discount: Discount::fixed(5.0),
            products: vec![ProductId::new(format!("{PLACEHOLDER_ID_PREFIX}product"))],
            validity: window,
            is_active: true,
            claims: vec![],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_marked() {
        let offers = placeholder_offers(Utc::now());
        assert!(!offers.is_empty());
        assert!(offers.iter().all(|o| is_placeholder(&o.id)));
    }

    #[test]
    fn real_ids_are_not_placeholders() {
        assert!(!is_placeholder(&OfferId::new("65f0c1a2b3")));
    }
}
