//! Scripted in-memory transport for tests.
//!
//! Replies are queued per endpoint (claims per offer) and consumed in order;
//! an endpoint with an empty queue falls back to its default reply. Every call
//! is recorded with the tokio clock, so tests running on paused time can
//! assert exact delays.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use common::OfferId;
use domain::ClaimRequest;
use tokio::sync::watch;
use tokio::time::Instant;

use super::{RawResponse, StorefrontTransport, TransportError};
use crate::session::BearerToken;

/// A storefront endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Offers,
    Claim,
    Cart,
}

/// A call observed by the transport.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub endpoint: Endpoint,
    pub at: Instant,
    pub offer_id: Option<OfferId>,
    pub token: Option<String>,
}

/// A one-shot latch that holds gated replies until opened.
#[derive(Debug, Clone)]
pub struct Gate {
    tx: Arc<watch::Sender<bool>>,
}

impl Gate {
    /// Creates a closed gate.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Opens the gate, releasing every reply waiting on it.
    pub fn open(&self) {
        self.tx.send_replace(true);
    }

    async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|open| *open).await;
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

/// A scripted reply.
#[derive(Debug, Clone)]
pub struct Reply {
    result: Result<RawResponse, TransportError>,
    delay: Option<Duration>,
    gate: Option<Gate>,
}

impl Reply {
    /// Replies with `status` and a raw body.
    pub fn raw(status: u16, body: impl Into<String>) -> Self {
        Self {
            result: Ok(RawResponse::new(status, body)),
            delay: None,
            gate: None,
        }
    }

    /// Replies with `status` and a JSON body.
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self::raw(status, body.to_string())
    }

    /// Fails without an HTTP response.
    pub fn error(error: TransportError) -> Self {
        Self {
            result: Err(error),
            delay: None,
            gate: None,
        }
    }

    /// Delays the reply by `delay`.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Holds the reply until `gate` opens.
    pub fn gated(mut self, gate: &Gate) -> Self {
        self.gate = Some(gate.clone());
        self
    }

    async fn deliver(self) -> Result<RawResponse, TransportError> {
        if let Some(gate) = &self.gate {
            gate.wait().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result
    }
}

#[derive(Debug, Default)]
struct ScriptedState {
    offers: VecDeque<Reply>,
    claims: HashMap<OfferId, VecDeque<Reply>>,
    carts: VecDeque<Reply>,
    default_offers: Option<Reply>,
    default_claim: Option<Reply>,
    default_cart: Option<Reply>,
    calls: Vec<RecordedCall>,
}

/// In-memory transport driven by scripted replies.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    state: Arc<RwLock<ScriptedState>>,
}

impl ScriptedTransport {
    /// Creates a transport with no scripted replies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a reply for `GET /api/offers`.
    pub fn push_offers(&self, reply: Reply) {
        self.write().offers.push_back(reply);
    }

    /// Queues a reply for a claim of `offer_id`.
    pub fn push_claim(&self, offer_id: impl Into<OfferId>, reply: Reply) {
        self.write()
            .claims
            .entry(offer_id.into())
            .or_default()
            .push_back(reply);
    }

    /// Queues a reply for `GET /api/cart`.
    pub fn push_cart(&self, reply: Reply) {
        self.write().carts.push_back(reply);
    }

    /// Sets the reply used when the offers queue is empty.
    pub fn set_default_offers(&self, reply: Reply) {
        self.write().default_offers = Some(reply);
    }

    /// Sets the reply used when an offer's claim queue is empty.
    pub fn set_default_claim(&self, reply: Reply) {
        self.write().default_claim = Some(reply);
    }

    /// Sets the reply used when the cart queue is empty.
    pub fn set_default_cart(&self, reply: Reply) {
        self.write().default_cart = Some(reply);
    }

    /// Returns every recorded call to `endpoint`, in call order.
    pub fn calls(&self, endpoint: Endpoint) -> Vec<RecordedCall> {
        self.read()
            .calls
            .iter()
            .filter(|c| c.endpoint == endpoint)
            .cloned()
            .collect()
    }

    /// Returns the number of calls to `endpoint`.
    pub fn call_count(&self, endpoint: Endpoint) -> usize {
        self.read()
            .calls
            .iter()
            .filter(|c| c.endpoint == endpoint)
            .count()
    }

    /// Returns the number of claim calls for `offer_id`.
    pub fn claim_count(&self, offer_id: &OfferId) -> usize {
        self.read()
            .calls
            .iter()
            .filter(|c| c.endpoint == Endpoint::Claim && c.offer_id.as_ref() == Some(offer_id))
            .count()
    }

    /// Yields until at least `count` calls to `endpoint` were recorded.
    pub async fn wait_for_calls(&self, endpoint: Endpoint, count: usize) {
        while self.call_count(endpoint) < count {
            tokio::task::yield_now().await;
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, ScriptedState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, ScriptedState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, endpoint: Endpoint, offer_id: Option<OfferId>, token: Option<&BearerToken>) {
        self.write().calls.push(RecordedCall {
            endpoint,
            at: Instant::now(),
            offer_id,
            token: token.map(|t| t.expose().to_string()),
        });
    }
}

fn unscripted(endpoint: Endpoint) -> Reply {
    Reply::error(TransportError::Connection(format!(
        "no scripted reply for {endpoint:?}"
    )))
}

#[async_trait]
impl StorefrontTransport for ScriptedTransport {
    async fn list_offers(
        &self,
        token: Option<&BearerToken>,
    ) -> Result<RawResponse, TransportError> {
        self.record(Endpoint::Offers, None, token);
        let reply = {
            let mut state = self.write();
            state
                .offers
                .pop_front()
                .or_else(|| state.default_offers.clone())
                .unwrap_or_else(|| unscripted(Endpoint::Offers))
        };
        reply.deliver().await
    }

    async fn claim_offer(
        &self,
        token: &BearerToken,
        request: &ClaimRequest,
    ) -> Result<RawResponse, TransportError> {
        self.record(Endpoint::Claim, Some(request.offer_id.clone()), Some(token));
        let reply = {
            let mut state = self.write();
            state
                .claims
                .get_mut(&request.offer_id)
                .and_then(VecDeque::pop_front)
                .or_else(|| state.default_claim.clone())
                .unwrap_or_else(|| unscripted(Endpoint::Claim))
        };
        reply.deliver().await
    }

    async fn fetch_cart(&self, token: &BearerToken) -> Result<RawResponse, TransportError> {
        self.record(Endpoint::Cart, None, Some(token));
        let reply = {
            let mut state = self.write();
            state
                .carts
                .pop_front()
                .or_else(|| state.default_cart.clone())
                .unwrap_or_else(|| unscripted(Endpoint::Cart))
        };
        reply.deliver().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queued_replies_then_default() {
        let transport = ScriptedTransport::new();
        transport.push_offers(Reply::raw(429, ""));
        transport.set_default_offers(Reply::raw(200, "{}"));

        assert_eq!(transport.list_offers(None).await.unwrap().status, 429);
        assert_eq!(transport.list_offers(None).await.unwrap().status, 200);
        assert_eq!(transport.list_offers(None).await.unwrap().status, 200);
        assert_eq!(transport.call_count(Endpoint::Offers), 3);
    }

    #[tokio::test]
    async fn unscripted_endpoint_is_a_connection_error() {
        let transport = ScriptedTransport::new();
        let result = transport.fetch_cart(&BearerToken::new("t")).await;
        assert!(matches!(result, Err(TransportError::Connection(_))));
    }

    #[tokio::test]
    async fn claims_are_scripted_per_offer() {
        let transport = ScriptedTransport::new();
        transport.push_claim("O1", Reply::raw(200, "one"));
        transport.push_claim("O2", Reply::raw(200, "two"));
        let token = BearerToken::new("t");

        let r2 = transport
            .claim_offer(&token, &ClaimRequest::cart_only(OfferId::new("O2")))
            .await
            .unwrap();
        assert_eq!(r2.body, "two");
        assert_eq!(transport.claim_count(&OfferId::new("O2")), 1);
        assert_eq!(transport.claim_count(&OfferId::new("O1")), 0);
        assert_eq!(
            transport.calls(Endpoint::Claim)[0].token.as_deref(),
            Some("t")
        );
    }

    #[tokio::test]
    async fn gated_reply_waits_for_open() {
        let transport = ScriptedTransport::new();
        let gate = Gate::new();
        transport.push_offers(Reply::raw(200, "late").gated(&gate));

        let pending = {
            let transport = transport.clone();
            tokio::spawn(async move { transport.list_offers(None).await })
        };
        transport.wait_for_calls(Endpoint::Offers, 1).await;
        assert!(!pending.is_finished());

        gate.open();
        assert_eq!(pending.await.unwrap().unwrap().body, "late");
    }
}
