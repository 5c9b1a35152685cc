//! Cart read endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use domain::CartView;
use ledger::{CartStore, ClaimLedger};
use serde::Serialize;

use crate::AppState;
use crate::error::ApiError;
use crate::routes::offers::Envelope;

#[derive(Serialize)]
pub struct CartData {
    pub cart: CartView,
}

/// GET /api/cart: the caller's current cart.
#[tracing::instrument(skip(state, headers))]
pub async fn get<L: ClaimLedger, C: CartStore>(
    State(state): State<Arc<AppState<L, C>>>,
    headers: HeaderMap,
) -> Result<Json<Envelope<CartData>>, ApiError> {
    let user_id = state.tokens.authenticate(&headers)?;
    let cart = state.carts.cart(&user_id).await?;
    Ok(Json(Envelope::ok(CartData { cart })))
}
