//! Client-held projection of the server cart.

use common::{OfferId, ProductId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DomainError, Result};
use crate::offer::{Discount, DiscountKind};

/// Discount annotation attached to a cart line by a claimed offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedDiscount {
    pub offer_id: OfferId,
    #[serde(flatten)]
    pub discount: Discount,
}

impl AppliedDiscount {
    /// Returns the discount kind.
    pub fn kind(&self) -> DiscountKind {
        self.discount.kind
    }
}

/// A single line of the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_discount: Option<AppliedDiscount>,
}

impl CartLine {
    /// Creates an undiscounted line.
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            applied_discount: None,
        }
    }

    /// Returns a copy of the line annotated with `discount`.
    pub fn with_discount(mut self, discount: AppliedDiscount) -> Self {
        self.applied_discount = Some(discount);
        self
    }
}

/// Ordered snapshot of the cart as last read from the server.
///
/// A `CartView` is only ever replaced as a whole. Partial updates would let
/// two interleaved reconciliations produce a cart the server never had.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartView {
    #[serde(rename = "items", default)]
    lines: Vec<CartLine>,
}

impl CartView {
    /// Creates a cart from its lines.
    pub fn new(lines: Vec<CartLine>) -> Self {
        Self { lines }
    }

    /// Returns the lines in server order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Returns the number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns true if the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Finds the line for `product_id`.
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.product_id == product_id)
    }

    /// Lines carrying a discount from `offer_id`.
    pub fn lines_discounted_by<'a>(
        &'a self,
        offer_id: &'a OfferId,
    ) -> impl Iterator<Item = &'a CartLine> + 'a {
        self.lines.iter().filter(move |l| {
            l.applied_discount
                .as_ref()
                .is_some_and(|d| &d.offer_id == offer_id)
        })
    }

    /// Parses a cart object (`{ items: [...] }`). Unlike offer lists, a cart
    /// is all-or-nothing: any malformed line rejects the snapshot.
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Parses a `GET /api/cart` body: `{ data: { cart: { items: [...] } } }`.
    pub fn from_response_body(body: &str) -> Result<Self> {
        let mut root: Value = serde_json::from_str(body)?;
        let cart = root
            .pointer_mut("/data/cart")
            .map(Value::take)
            .ok_or_else(|| DomainError::MalformedPayload("missing data.cart".to_string()))?;
        Self::from_value(cart)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_cart_body() {
        let body = json!({
            "success": true,
            "data": { "cart": { "items": [
                { "productId": "p1", "quantity": 2 },
                { "productId": "p2", "quantity": 1,
                  "appliedDiscount": { "offerId": "O1", "discount": 15, "discountType": "percentage" } }
            ] } }
        });
        let cart = CartView::from_response_body(&body.to_string()).unwrap();
        assert_eq!(cart.len(), 2);
        assert_eq!(cart.line(&ProductId::new("p1")).unwrap().quantity, 2);
        let offer_id = OfferId::new("O1");
        let discounted: Vec<_> = cart.lines_discounted_by(&offer_id).collect();
        assert_eq!(discounted.len(), 1);
        assert_eq!(discounted[0].product_id.as_str(), "p2");
        assert_eq!(
            discounted[0].applied_discount.as_ref().unwrap().kind(),
            DiscountKind::Percentage
        );
    }

    #[test]
    fn malformed_line_rejects_whole_cart() {
        let body = json!({ "data": { "cart": { "items": [
            { "productId": "p1", "quantity": 2 },
            { "productId": "p2", "quantity": -1 }
        ] } } });
        assert!(CartView::from_response_body(&body.to_string()).is_err());
    }

    #[test]
    fn missing_cart_is_malformed() {
        let body = json!({ "data": {} }).to_string();
        assert!(matches!(
            CartView::from_response_body(&body),
            Err(DomainError::MalformedPayload(_))
        ));
    }

    #[test]
    fn empty_cart_object_is_empty_view() {
        let cart = CartView::from_value(json!({})).unwrap();
        assert!(cart.is_empty());
    }
}
