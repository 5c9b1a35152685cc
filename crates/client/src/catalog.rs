//! Offer catalog fetch with rate-limit backoff and cancellation.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use domain::{Offer, parse_offer_list, placeholder_offers};
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::session::SessionStore;
use crate::transport::StorefrontTransport;

const STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// Result of one catalog fetch.
///
/// Iterating a fetch yields its offers once; a new fetch is needed to
/// refresh them.
#[derive(Debug)]
pub enum CatalogFetch {
    /// Offers parsed from a successful response.
    Live(Vec<Offer>),

    /// Retries were exhausted on 429; these are hardcoded display-only offers.
    Placeholder(Vec<Offer>),

    /// The fetch failed; there are no offers to show.
    Unavailable(ClientError),

    /// The consuming view went away; the result must be discarded.
    Cancelled,
}

impl CatalogFetch {
    /// Offers to display (empty unless live or placeholder).
    pub fn offers(&self) -> &[Offer] {
        match self {
            CatalogFetch::Live(offers) | CatalogFetch::Placeholder(offers) => offers,
            CatalogFetch::Unavailable(_) | CatalogFetch::Cancelled => &[],
        }
    }

    /// Returns true only for offers the server actually sent.
    pub fn is_authoritative(&self) -> bool {
        matches!(self, CatalogFetch::Live(_))
    }

    /// Returns true if the fetch was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CatalogFetch::Cancelled)
    }
}

impl IntoIterator for CatalogFetch {
    type Item = Offer;
    type IntoIter = std::vec::IntoIter<Offer>;

    fn into_iter(self) -> Self::IntoIter {
        match self {
            CatalogFetch::Live(offers) | CatalogFetch::Placeholder(offers) => offers.into_iter(),
            CatalogFetch::Unavailable(_) | CatalogFetch::Cancelled => Vec::new().into_iter(),
        }
    }
}

/// Fetches the list of active offers.
pub struct OfferCatalogClient<T: StorefrontTransport> {
    transport: Arc<T>,
    sessions: Arc<dyn SessionStore>,
    max_retries: u32,
    backoff_base: Duration,
}

impl<T: StorefrontTransport> Clone for OfferCatalogClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            sessions: self.sessions.clone(),
            max_retries: self.max_retries,
            backoff_base: self.backoff_base,
        }
    }
}

impl<T: StorefrontTransport> OfferCatalogClient<T> {
    /// Creates a catalog client with retry settings from `config`.
    pub fn new(transport: Arc<T>, sessions: Arc<dyn SessionStore>, config: &ClientConfig) -> Self {
        Self {
            transport,
            sessions,
            max_retries: config.catalog_max_retries,
            backoff_base: config.catalog_backoff_base,
        }
    }

    /// Delay before retry number `attempt` (0-based): `2^attempt * base`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Fetches the offer list.
    ///
    /// A 429 is retried up to `max_retries` times after `1s, 2s, 4s, ...`
    /// (with the default base), then degrades to placeholder offers. With the
    /// default three retries that is four requests in total: the first one
    /// plus one after each of the 1s, 2s and 4s waits. Any other failure
    /// yields [`CatalogFetch::Unavailable`]. Cancelling `cancel`
    /// aborts the in-flight request or the pending backoff and yields
    /// [`CatalogFetch::Cancelled`]; no request is issued after cancellation.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn fetch_offers(&self, cancel: &CancellationToken) -> CatalogFetch {
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return CatalogFetch::Cancelled;
            }

            let session = self.sessions.current();
            let token = session.as_ref().map(|s| &s.token);
            metrics::counter!("catalog_requests_total").increment(1);
            let response = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::debug!("catalog fetch cancelled in flight");
                    return CatalogFetch::Cancelled;
                }
                response = self.transport.list_offers(token) => response,
            };

            let response = match response {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(error = %e, "catalog fetch failed");
                    return CatalogFetch::Unavailable(e.into());
                }
            };

            if response.status == STATUS_TOO_MANY_REQUESTS {
                metrics::counter!("catalog_rate_limited_total").increment(1);
                if attempt >= self.max_retries {
                    metrics::counter!("catalog_fallback_total").increment(1);
                    tracing::warn!(
                        retries = attempt,
                        "catalog still rate limited, showing placeholder offers"
                    );
                    return CatalogFetch::Placeholder(placeholder_offers(Utc::now()));
                }

                let delay = self.backoff_delay(attempt);
                tracing::warn!(attempt, ?delay, "catalog rate limited, backing off");
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return CatalogFetch::Cancelled,
                    () = tokio::time::sleep(delay) => {}
                }
                attempt += 1;
                continue;
            }

            if !response.is_success() {
                tracing::warn!(status = response.status, "catalog fetch rejected");
                return CatalogFetch::Unavailable(ClientError::Status {
                    status: response.status,
                    body: response.body,
                });
            }

            return match parse_offer_list(&response.body) {
                Ok(parsed) => {
                    if parsed.skipped > 0 {
                        tracing::warn!(skipped = parsed.skipped, "dropped malformed offers");
                    }
                    CatalogFetch::Live(parsed.offers)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "catalog response unreadable");
                    CatalogFetch::Unavailable(e.into())
                }
            };
        }
    }
}
