//! reqwest-backed transport.

use async_trait::async_trait;
use domain::ClaimRequest;
use reqwest::Client;

use super::{RawResponse, StorefrontTransport, TransportError};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::session::BearerToken;

const OFFERS_PATH: &str = "/api/offers";
const CLAIM_PATH: &str = "/api/offers/claim";
const CART_PATH: &str = "/api/cart";

/// Talks to the storefront API over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: ClientConfig,
}

impl HttpTransport {
    /// Creates a transport using the base URL and timeout from `config`.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Setup(e.to_string()))?;
        Ok(Self { client, config })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<RawResponse, TransportError> {
        let response = request.send().await.map_err(map_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_error)?;
        tracing::debug!(status, bytes = body.len(), "storefront response");
        Ok(RawResponse { status, body })
    }
}

fn map_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Connection(e.to_string())
    } else {
        TransportError::Request(e.to_string())
    }
}

#[async_trait]
impl StorefrontTransport for HttpTransport {
    async fn list_offers(
        &self,
        token: Option<&BearerToken>,
    ) -> Result<RawResponse, TransportError> {
        let mut request = self.client.get(self.config.url(OFFERS_PATH));
        if let Some(token) = token {
            request = request.bearer_auth(token.expose());
        }
        self.send(request).await
    }

    async fn claim_offer(
        &self,
        token: &BearerToken,
        request: &ClaimRequest,
    ) -> Result<RawResponse, TransportError> {
        self.send(
            self.client
                .post(self.config.url(CLAIM_PATH))
                .bearer_auth(token.expose())
                .json(request),
        )
        .await
    }

    async fn fetch_cart(&self, token: &BearerToken) -> Result<RawResponse, TransportError> {
        self.send(
            self.client
                .get(self.config.url(CART_PATH))
                .bearer_auth(token.expose()),
        )
        .await
    }
}
