//! Integration tests for the storefront server.

use std::sync::{Arc, OnceLock};

use api::{AppState, MemoryState};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use common::{OfferId, ProductId, UserId};
use domain::{Discount, Offer, ValidityWindow};
use ledger::{CartStore, InMemoryCartStore, InMemoryClaimLedger};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn offer(id: &str, products: &[&str], is_active: bool) -> Offer {
    let now = Utc::now();
    Offer {
        id: OfferId::new(id),
        title: format!("Offer {id}"),
        discount: Discount::percentage(15.0),
        products: products.iter().map(|p| ProductId::new(*p)).collect(),
        validity: ValidityWindow {
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(1),
        },
        is_active,
        claims: Vec::new(),
    }
}

async fn setup_with_state() -> (axum::Router, Arc<MemoryState>) {
    let ledger = InMemoryClaimLedger::with_offers(vec![
        offer("O1", &["p1", "p2"], true),
        offer("O2", &[], true),
        offer("OFF", &["p1"], false),
    ]);
    let state = AppState::new(ledger, InMemoryCartStore::new());
    state.tokens.register("token-u1", UserId::new("u1"));
    state.tokens.register("token-u2", UserId::new("u2"));
    let state = Arc::new(state);
    let app = api::create_app(state.clone(), get_metrics_handle());
    (app, state)
}

async fn setup() -> axum::Router {
    setup_with_state().await.0
}

fn claim_request(token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/offers/claim")
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = setup().await;

    let response = app.oneshot(get("/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup().await;

    let response = app.oneshot(get("/metrics", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn test_list_offers_returns_only_claimable_offers() {
    let app = setup().await;

    let response = app.oneshot(get("/api/offers", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["success"], true);
    let ids: Vec<&str> = json["data"]["offers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["O1", "O2"]);
    let first = &json["data"]["offers"][0];
    assert_eq!(first["discountType"], "percentage");
    assert_eq!(first["discount"], 15.0);
    assert_eq!(first["isActive"], true);
    assert!(first["startDate"].is_string());
}

#[tokio::test]
async fn test_list_offers_shows_only_the_callers_claims() {
    let (app, _state) = setup_with_state().await;
    for token in ["token-u1", "token-u2"] {
        let response = app
            .clone()
            .oneshot(claim_request(Some(token), json!({ "offerId": "O1" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let anonymous = json_body(app.clone().oneshot(get("/api/offers", None)).await.unwrap()).await;
    assert_eq!(anonymous["data"]["offers"][0]["claimedBy"], json!([]));

    let own = json_body(
        app.oneshot(get("/api/offers", Some("token-u2")))
            .await
            .unwrap(),
    )
    .await;
    let claimed_by = own["data"]["offers"][0]["claimedBy"].as_array().unwrap();
    assert_eq!(claimed_by.len(), 1);
    assert_eq!(claimed_by[0]["userId"], "u2");
}

#[tokio::test]
async fn test_listed_offers_parse_on_the_client_side() {
    let app = setup().await;

    let response = app.oneshot(get("/api/offers", None)).await.unwrap();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let parsed = domain::parse_offer_list(std::str::from_utf8(&body).unwrap()).unwrap();

    assert_eq!(parsed.skipped, 0);
    assert_eq!(parsed.offers.len(), 2);
    assert_eq!(parsed.offers[0].products.len(), 2);
}

#[tokio::test]
async fn test_claim_requires_bearer_token() {
    let app = setup().await;

    let response = app
        .clone()
        .oneshot(claim_request(None, json!({ "offerId": "O1" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["success"], false);

    let response = app
        .oneshot(claim_request(Some("forged"), json!({ "offerId": "O1" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_claim_adds_discounted_products_and_returns_cart() {
    let (app, state) = setup_with_state().await;

    let response = app
        .oneshot(claim_request(
            Some("token-u1"),
            json!({ "offerId": "O1", "createOrder": false }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["addedProducts"], json!(["p1", "p2"]));
    let items = json["data"]["cart"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["appliedDiscount"]["offerId"], "O1");

    let cart = state.carts.cart(&UserId::new("u1")).await.unwrap();
    assert_eq!(cart.lines_discounted_by(&OfferId::new("O1")).count(), 2);
    assert_eq!(state.ledger.claim_count(&OfferId::new("O1")).await, 1);
}

#[tokio::test]
async fn test_second_claim_is_reported_as_already_claimed() {
    let (app, state) = setup_with_state().await;

    let first = app
        .clone()
        .oneshot(claim_request(Some("token-u1"), json!({ "offerId": "O1" })))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(claim_request(Some("token-u1"), json!({ "offerId": "O1" })))
        .await
        .unwrap();

    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    let message = json_body(second).await["message"].as_str().unwrap().to_string();
    assert!(domain::indicates_already_claimed(&message));
    assert_eq!(state.ledger.claim_count(&OfferId::new("O1")).await, 1);
}

#[tokio::test]
async fn test_users_claim_the_same_offer_independently() {
    let (app, state) = setup_with_state().await;

    for token in ["token-u1", "token-u2"] {
        let response = app
            .clone()
            .oneshot(claim_request(Some(token), json!({ "offerId": "O1" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(state.ledger.claim_count(&OfferId::new("O1")).await, 2);
}

#[tokio::test]
async fn test_claim_of_unknown_or_inactive_offer() {
    let app = setup().await;

    let missing = app
        .clone()
        .oneshot(claim_request(Some("token-u1"), json!({ "offerId": "nope" })))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let inactive = app
        .oneshot(claim_request(Some("token-u1"), json!({ "offerId": "OFF" })))
        .await
        .unwrap();
    assert_eq!(inactive.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(inactive).await["message"],
        "Offer is not currently available"
    );
}

#[tokio::test]
async fn test_create_order_is_rejected() {
    let (app, state) = setup_with_state().await;

    let response = app
        .oneshot(claim_request(
            Some("token-u1"),
            json!({ "offerId": "O1", "createOrder": true }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(state.ledger.claim_count(&OfferId::new("O1")).await, 0);
}

#[tokio::test]
async fn test_all_products_offer_discounts_existing_lines() {
    let (app, state) = setup_with_state().await;
    let u1 = UserId::new("u1");
    state
        .carts
        .add_item(&u1, ProductId::new("p7"), 2)
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(claim_request(Some("token-u1"), json!({ "offerId": "O2" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["addedProducts"], json!([]));

    let cart = app.oneshot(get("/api/cart", Some("token-u1"))).await.unwrap();
    assert_eq!(cart.status(), StatusCode::OK);
    let json = json_body(cart).await;
    let items = json["data"]["cart"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["productId"], "p7");
    assert_eq!(items[0]["quantity"], 2);
    assert_eq!(items[0]["appliedDiscount"]["offerId"], "O2");
}

#[tokio::test]
async fn test_claim_without_cart_snapshot() {
    let ledger = InMemoryClaimLedger::with_offers(vec![offer("O1", &["p1"], true)]);
    let state = AppState::new(ledger, InMemoryCartStore::new()).with_claim_returns_cart(false);
    state.tokens.register("token-u1", UserId::new("u1"));
    let app = api::create_app(Arc::new(state), get_metrics_handle());

    let response = app
        .oneshot(claim_request(Some("token-u1"), json!({ "offerId": "O1" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert!(json["data"].get("cart").is_none());
    assert_eq!(json["data"]["addedProducts"], json!(["p1"]));
}

#[tokio::test]
async fn test_cart_requires_bearer_token() {
    let app = setup().await;

    let response = app.oneshot(get("/api/cart", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_seed_demo_registers_token_and_offers() {
    let state = api::create_default_state();
    api::seed_demo(&state).await.unwrap();
    let app = api::create_app(Arc::new(state), get_metrics_handle());

    let offers = app.clone().oneshot(get("/api/offers", None)).await.unwrap();
    let json = json_body(offers).await;
    assert_eq!(json["data"]["offers"].as_array().unwrap().len(), 3);

    let cart = app
        .oneshot(get("/api/cart", Some(api::DEMO_TOKEN)))
        .await
        .unwrap();
    assert_eq!(cart.status(), StatusCode::OK);
}
