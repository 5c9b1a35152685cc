use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OfferId, UserId};
use domain::{ClaimRecord, Offer};
use tokio::sync::RwLock;

use crate::{
    LedgerError, Result,
    store::{ClaimLedger, ClaimReceipt},
};

/// In-memory claim ledger.
///
/// Claims are checked and recorded under a single write lock, which gives
/// the same guarantee as a unique index on (offer, user).
#[derive(Clone, Default)]
pub struct InMemoryClaimLedger {
    offers: Arc<RwLock<Vec<Offer>>>,
}

impl InMemoryClaimLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ledger seeded with `offers`.
    pub fn with_offers(offers: Vec<Offer>) -> Self {
        Self {
            offers: Arc::new(RwLock::new(offers)),
        }
    }

    /// Inserts an offer, replacing any offer with the same ID.
    pub async fn upsert_offer(&self, offer: Offer) {
        let mut offers = self.offers.write().await;
        match offers.iter_mut().find(|o| o.id == offer.id) {
            Some(existing) => *existing = offer,
            None => offers.push(offer),
        }
    }

    /// Returns the number of claim records for an offer.
    pub async fn claim_count(&self, offer_id: &OfferId) -> usize {
        self.offers
            .read()
            .await
            .iter()
            .find(|o| &o.id == offer_id)
            .map(|o| o.claims.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl ClaimLedger for InMemoryClaimLedger {
    async fn active_offers(&self, now: DateTime<Utc>) -> Result<Vec<Offer>> {
        Ok(self
            .offers
            .read()
            .await
            .iter()
            .filter(|o| o.is_claimable_at(now))
            .cloned()
            .collect())
    }

    #[tracing::instrument(skip(self))]
    async fn claim(
        &self,
        offer_id: &OfferId,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<ClaimReceipt> {
        let mut offers = self.offers.write().await;

        let offer = offers
            .iter_mut()
            .find(|o| &o.id == offer_id)
            .ok_or_else(|| LedgerError::OfferNotFound(offer_id.clone()))?;

        // Duplicate check comes first so a repeat claim on an offer that has
        // since expired still reads as already claimed.
        if offer.is_claimed_by(user_id) {
            return Err(LedgerError::AlreadyClaimed {
                offer_id: offer_id.clone(),
                user_id: user_id.clone(),
            });
        }

        if !offer.is_claimable_at(now) {
            return Err(LedgerError::NotClaimable(offer_id.clone()));
        }

        let record = ClaimRecord::new(user_id.clone(), now);
        offer.claims.push(record.clone());
        tracing::info!(%offer_id, %user_id, "claim recorded");

        Ok(ClaimReceipt {
            offer: offer.clone(),
            record,
        })
    }
}
