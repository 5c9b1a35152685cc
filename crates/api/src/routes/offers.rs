//! Offer catalog and claim endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use chrono::Utc;
use domain::{CartView, ClaimRequest, Offer};
use ledger::{CartStore, ClaimLedger, LedgerError};
use serde::Serialize;

use crate::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }
}

#[derive(Serialize)]
pub struct OfferList {
    pub offers: Vec<Offer>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimData {
    pub added_products: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cart: Option<CartView>,
}

/// GET /api/offers: offers claimable right now.
///
/// Claim records are limited to the caller's own; an anonymous caller sees
/// none.
#[tracing::instrument(skip(state, headers))]
pub async fn list<L: ClaimLedger, C: CartStore>(
    State(state): State<Arc<AppState<L, C>>>,
    headers: HeaderMap,
) -> Result<Json<Envelope<OfferList>>, ApiError> {
    let caller = state.tokens.authenticate(&headers).ok();
    let mut offers = state.ledger.active_offers(Utc::now()).await?;
    for offer in &mut offers {
        offer
            .claims
            .retain(|c| caller.as_ref().is_some_and(|u| &c.user_id == u));
    }
    tracing::debug!(count = offers.len(), signed_in = caller.is_some(), "listing offers");
    Ok(Json(Envelope::ok(OfferList { offers })))
}

/// POST /api/offers/claim: records a claim and applies the discount to the
/// caller's cart.
#[tracing::instrument(skip(state, headers, req), fields(offer_id = %req.offer_id))]
pub async fn claim<L: ClaimLedger, C: CartStore>(
    State(state): State<Arc<AppState<L, C>>>,
    headers: HeaderMap,
    Json(req): Json<ClaimRequest>,
) -> Result<Json<Envelope<ClaimData>>, ApiError> {
    let user_id = state.tokens.authenticate(&headers)?;

    if req.create_order {
        return Err(ApiError::BadRequest(
            "Order creation is not supported".to_string(),
        ));
    }

    let receipt = match state.ledger.claim(&req.offer_id, &user_id, Utc::now()).await {
        Ok(receipt) => receipt,
        Err(e) => {
            let result = match &e {
                LedgerError::AlreadyClaimed { .. } => "duplicate",
                LedgerError::NotClaimable(_) => "not_claimable",
                LedgerError::OfferNotFound(_) => "not_found",
            };
            metrics::counter!("ledger_claims_total", "result" => result).increment(1);
            tracing::info!(%user_id, error = %e, "claim rejected");
            return Err(e.into());
        }
    };
    metrics::counter!("ledger_claims_total", "result" => "recorded").increment(1);

    let added = state.carts.apply_offer(&user_id, &receipt.offer).await?;
    let cart = if state.claim_returns_cart {
        Some(state.carts.cart(&user_id).await?)
    } else {
        None
    };
    tracing::info!(%user_id, added = added.len(), "offer claimed");

    Ok(Json(Envelope {
        success: true,
        message: Some("Offer claimed successfully"),
        data: ClaimData {
            added_products: added.into_iter().map(|p| p.to_string()).collect(),
            cart,
        },
    }))
}
