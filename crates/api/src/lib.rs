//! Reference storefront HTTP server.
//!
//! Serves the three calls the claim client consumes (offer list, claim, cart
//! read) on top of a [`ClaimLedger`] and a [`CartStore`], with structured
//! logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use chrono::{Duration, Utc};
use common::{OfferId, ProductId, UserId};
use domain::{Discount, Offer, ValidityWindow};
use ledger::{CartStore, ClaimLedger, InMemoryCartStore, InMemoryClaimLedger};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::TokenRegistry;

/// Bearer token of the seeded demo user.
pub const DEMO_TOKEN: &str = "demo-token";

/// Shared application state accessible from all handlers.
pub struct AppState<L: ClaimLedger, C: CartStore> {
    pub ledger: L,
    pub carts: C,
    pub tokens: TokenRegistry,
    /// Whether claim responses carry the post-claim cart.
    pub claim_returns_cart: bool,
}

impl<L: ClaimLedger, C: CartStore> AppState<L, C> {
    pub fn new(ledger: L, carts: C) -> Self {
        Self {
            ledger,
            carts,
            tokens: TokenRegistry::new(),
            claim_returns_cart: true,
        }
    }

    pub fn with_claim_returns_cart(mut self, enabled: bool) -> Self {
        self.claim_returns_cart = enabled;
        self
    }
}

/// In-memory state used by the binary and the tests.
pub type MemoryState = AppState<InMemoryClaimLedger, InMemoryCartStore>;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<L, C>(state: Arc<AppState<L, C>>, metrics_handle: PrometheusHandle) -> Router
where
    L: ClaimLedger + 'static,
    C: CartStore + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/api/offers", get(routes::offers::list::<L, C>))
        .route("/api/offers/claim", post(routes::offers::claim::<L, C>))
        .route("/api/cart", get(routes::cart::get::<L, C>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates empty in-memory state.
pub fn create_default_state() -> MemoryState {
    AppState::new(InMemoryClaimLedger::new(), InMemoryCartStore::new())
}

/// Loads demo offers, a demo user with a starter cart, and [`DEMO_TOKEN`].
pub async fn seed_demo(state: &MemoryState) -> ledger::Result<()> {
    let now = Utc::now();
    let window = ValidityWindow {
        start_date: now - Duration::days(1),
        end_date: now + Duration::days(30),
    };

    let offers = [
        Offer {
            id: OfferId::new("spring-15"),
            title: "15% off spring essentials".to_string(),
            discount: Discount::percentage(15.0),
            products: vec![ProductId::new("tee-white"), ProductId::new("cap-navy")],
            validity: window,
            is_active: true,
            claims: Vec::new(),
        },
        Offer {
            id: OfferId::new("welcome-10"),
            title: "10% off your cart".to_string(),
            discount: Discount::percentage(10.0),
            products: Vec::new(),
            validity: window,
            is_active: true,
            claims: Vec::new(),
        },
        Offer {
            id: OfferId::new("socks-5"),
            title: "5 off socks".to_string(),
            discount: Discount::fixed(5.0),
            products: vec![ProductId::new("socks-grey")],
            validity: window,
            is_active: true,
            claims: Vec::new(),
        },
    ];
    for offer in offers {
        state.ledger.upsert_offer(offer).await;
    }

    let demo_user = UserId::new("demo-user");
    state
        .carts
        .add_item(&demo_user, ProductId::new("jeans-blue"), 1)
        .await?;
    state.tokens.register(DEMO_TOKEN, demo_user);
    Ok(())
}
