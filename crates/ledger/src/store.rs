use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OfferId, UserId};
use domain::{ClaimRecord, Offer};

use crate::Result;

/// Proof that a claim was recorded.
#[derive(Debug, Clone)]
pub struct ClaimReceipt {
    /// The offer as it stands after the claim was recorded.
    pub offer: Offer,
    /// The newly written record.
    pub record: ClaimRecord,
}

/// Durable record of offer claims.
///
/// Implementations must serialize concurrent claims for the same
/// (offer, user) pair: exactly one succeeds and every other attempt gets
/// [`LedgerError::AlreadyClaimed`](crate::LedgerError::AlreadyClaimed), no
/// matter how many clients race.
#[async_trait]
pub trait ClaimLedger: Send + Sync {
    /// Lists offers claimable at `now`, in catalog order.
    async fn active_offers(&self, now: DateTime<Utc>) -> Result<Vec<Offer>>;

    /// Records a claim of `offer_id` by `user_id` at `now`.
    async fn claim(
        &self,
        offer_id: &OfferId,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<ClaimReceipt>;
}
