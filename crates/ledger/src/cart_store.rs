//! Per-user cart storage.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{ProductId, UserId};
use domain::{AppliedDiscount, CartLine, CartView, Offer};
use tokio::sync::RwLock;

use crate::Result;

/// Storage for the authoritative per-user carts.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Returns the user's current cart (empty if none).
    async fn cart(&self, user_id: &UserId) -> Result<CartView>;

    /// Adds `quantity` of a product, merging with an existing line.
    async fn add_item(&self, user_id: &UserId, product_id: ProductId, quantity: u32)
    -> Result<()>;

    /// Applies a claimed offer's discount to the user's cart.
    ///
    /// Products in the offer's eligible set get a discounted line, created
    /// with quantity 1 when missing. An offer without eligible products
    /// discounts every line already in the cart. Returns the products the
    /// offer added or annotated, by eligibility.
    async fn apply_offer(&self, user_id: &UserId, offer: &Offer) -> Result<Vec<ProductId>>;
}

/// In-memory cart store.
#[derive(Clone, Default)]
pub struct InMemoryCartStore {
    carts: Arc<RwLock<HashMap<UserId, Vec<CartLine>>>>,
}

impl InMemoryCartStore {
    /// Creates an empty cart store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn cart(&self, user_id: &UserId) -> Result<CartView> {
        let carts = self.carts.read().await;
        Ok(CartView::new(
            carts.get(user_id).cloned().unwrap_or_default(),
        ))
    }

    async fn add_item(
        &self,
        user_id: &UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<()> {
        let mut carts = self.carts.write().await;
        let lines = carts.entry(user_id.clone()).or_default();
        match lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => line.quantity += quantity,
            None => lines.push(CartLine::new(product_id, quantity)),
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, offer), fields(offer_id = %offer.id))]
    async fn apply_offer(&self, user_id: &UserId, offer: &Offer) -> Result<Vec<ProductId>> {
        let discount = AppliedDiscount {
            offer_id: offer.id.clone(),
            discount: offer.discount,
        };

        let mut carts = self.carts.write().await;
        let lines = carts.entry(user_id.clone()).or_default();

        if offer.applies_to_all_products() {
            for line in lines.iter_mut() {
                line.applied_discount = Some(discount.clone());
            }
            return Ok(vec![]);
        }

        for product_id in &offer.products {
            match lines.iter_mut().find(|l| &l.product_id == product_id) {
                Some(line) => line.applied_discount = Some(discount.clone()),
                None => lines
                    .push(CartLine::new(product_id.clone(), 1).with_discount(discount.clone())),
            }
        }
        Ok(offer.products.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use common::OfferId;
    use domain::{Discount, ValidityWindow};

    fn offer(products: &[&str]) -> Offer {
        let now = Utc::now();
        Offer {
            id: OfferId::new("O1"),
            title: "Offer".to_string(),
            discount: Discount::percentage(15.0),
            products: products.iter().map(|p| ProductId::new(*p)).collect(),
            validity: ValidityWindow::new(now, now + Duration::days(1)).unwrap(),
            is_active: true,
            claims: vec![],
        }
    }

    #[tokio::test]
    async fn apply_offer_adds_missing_lines_with_discount() {
        let store = InMemoryCartStore::new();
        let user = UserId::new("u1");
        store.add_item(&user, ProductId::new("p1"), 2).await.unwrap();

        let added = store.apply_offer(&user, &offer(&["p1", "p2"])).await.unwrap();
        assert_eq!(added.len(), 2);

        let cart = store.cart(&user).await.unwrap();
        assert_eq!(cart.len(), 2);
        assert_eq!(cart.line(&ProductId::new("p1")).unwrap().quantity, 2);
        assert_eq!(cart.lines_discounted_by(&OfferId::new("O1")).count(), 2);
    }

    #[tokio::test]
    async fn offer_without_products_discounts_every_line() {
        let store = InMemoryCartStore::new();
        let user = UserId::new("u1");
        store.add_item(&user, ProductId::new("p1"), 1).await.unwrap();
        store.add_item(&user, ProductId::new("p9"), 1).await.unwrap();

        let added = store.apply_offer(&user, &offer(&[])).await.unwrap();
        assert!(added.is_empty());
        let cart = store.cart(&user).await.unwrap();
        assert_eq!(cart.lines_discounted_by(&OfferId::new("O1")).count(), 2);
    }

    #[tokio::test]
    async fn add_item_merges_quantities() {
        let store = InMemoryCartStore::new();
        let user = UserId::new("u1");
        store.add_item(&user, ProductId::new("p1"), 1).await.unwrap();
        store.add_item(&user, ProductId::new("p1"), 2).await.unwrap();
        let cart = store.cart(&user).await.unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].quantity, 3);
    }

    #[tokio::test]
    async fn carts_are_per_user() {
        let store = InMemoryCartStore::new();
        store
            .add_item(&UserId::new("u1"), ProductId::new("p1"), 1)
            .await
            .unwrap();
        assert!(store.cart(&UserId::new("u2")).await.unwrap().is_empty());
    }
}
