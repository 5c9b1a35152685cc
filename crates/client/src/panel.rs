//! The consuming view: an offer panel's state and its lifecycle.
//!
//! Every view-state update checks the "still mounted" flag of the scope the
//! operation started in, under the same lock [`OfferPanel::teardown`] takes.
//! An operation that outlives its scope completes against the server but
//! leaves the view alone.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use common::OfferId;
use domain::{CartView, ClaimOutcome, Offer, is_placeholder};
use tokio_util::sync::CancellationToken;

use crate::catalog::CatalogFetch;
use crate::coordinator::OfferClaimStatus;
use crate::storefront::Storefront;
use crate::transport::StorefrontTransport;

/// Lifetime of one mount of the view.
#[derive(Debug, Clone)]
pub struct ViewScope {
    cancel: CancellationToken,
    mounted: Arc<AtomicBool>,
}

impl ViewScope {
    fn open() -> Self {
        Self {
            cancel: CancellationToken::new(),
            mounted: Arc::new(AtomicBool::new(true)),
        }
    }

    fn closed() -> Self {
        let scope = Self::open();
        scope.close();
        scope
    }

    /// Returns true until the view is torn down.
    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    /// Token cancelled when the view is torn down.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    fn close(&self) {
        self.mounted.store(false, Ordering::Release);
        self.cancel.cancel();
    }
}

/// Where the displayed offer list came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogStatus {
    Loading,
    /// Server data.
    Live,
    /// Placeholder offers after persistent rate limiting.
    Degraded,
    /// The fetch failed; no offers are shown.
    Unavailable(String),
}

/// A user-visible message raised by the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The offer is claimed, whether by this attempt or an earlier one.
    Claimed(OfferId),
    /// The user must sign in before claiming.
    SignInRequired,
    /// A claim failed; carries the message to show.
    Error(String),
    /// No live offers could be shown.
    OffersUnavailable,
}

#[derive(Debug)]
struct PanelState {
    scope: ViewScope,
    offers: Vec<Offer>,
    catalog: CatalogStatus,
    notices: Vec<Notice>,
}

/// View model of the offer panel.
pub struct OfferPanel<T: StorefrontTransport> {
    storefront: Storefront<T>,
    state: Arc<Mutex<PanelState>>,
}

impl<T: StorefrontTransport> Clone for OfferPanel<T> {
    fn clone(&self) -> Self {
        Self {
            storefront: self.storefront.clone(),
            state: self.state.clone(),
        }
    }
}

impl<T: StorefrontTransport + 'static> OfferPanel<T> {
    /// Creates an unmounted panel over `storefront`.
    pub fn new(storefront: Storefront<T>) -> Self {
        Self {
            storefront,
            state: Arc::new(Mutex::new(PanelState {
                scope: ViewScope::closed(),
                offers: Vec::new(),
                catalog: CatalogStatus::Loading,
                notices: Vec::new(),
            })),
        }
    }

    pub fn storefront(&self) -> &Storefront<T> {
        &self.storefront
    }

    /// Mounts the view with a fresh scope, closing any previous one.
    pub fn mount(&self) -> ViewScope {
        let mut state = self.lock();
        state.scope.close();
        state.scope = ViewScope::open();
        state.catalog = CatalogStatus::Loading;
        state.notices.clear();
        state.scope.clone()
    }

    /// Tears the view down: cancels the catalog fetch and stops every
    /// pending operation from touching view state.
    pub fn teardown(&self) {
        let state = self.lock();
        state.scope.close();
        tracing::debug!("offer panel torn down");
    }

    /// Returns true while mounted.
    pub fn is_mounted(&self) -> bool {
        self.lock().scope.is_mounted()
    }

    /// Fetches the catalog and shows it.
    ///
    /// The fetch is bound to the current scope; a fetch that is cancelled or
    /// finishes after teardown changes nothing.
    pub async fn load_offers(&self) {
        let scope = self.current_scope();
        if !scope.is_mounted() {
            return;
        }

        let fetch = self.storefront.catalog().fetch_offers(scope.cancel_token()).await;
        if fetch.is_cancelled() {
            tracing::debug!("catalog fetch cancelled, view unchanged");
            return;
        }

        let user = self.storefront.sessions().current().map(|s| s.user_id);
        let coordinator = self.storefront.coordinator();
        let applied = self.update(&scope, |state| {
            let (catalog, offers) = match fetch {
                CatalogFetch::Live(offers) => (CatalogStatus::Live, offers),
                CatalogFetch::Placeholder(offers) => (CatalogStatus::Degraded, offers),
                CatalogFetch::Unavailable(e) => (CatalogStatus::Unavailable(e.to_string()), Vec::new()),
                CatalogFetch::Cancelled => return,
            };

            if catalog == CatalogStatus::Live {
                if let Some(user) = &user {
                    coordinator.mark_claimed_from(&offers, user);
                }
            }
            if catalog != CatalogStatus::Live || offers.is_empty() {
                state.notices.push(Notice::OffersUnavailable);
            }
            state.catalog = catalog;
            state.offers = offers;
        });
        if !applied {
            tracing::debug!("view torn down during catalog fetch, result discarded");
        }
    }

    /// Refreshes the cart view from the server, keeping it on failure.
    pub async fn load_cart(&self) {
        if let Err(e) = self.storefront.cart_sync().refresh().await {
            tracing::debug!(error = %e, "cart load failed");
        }
    }

    /// Claims a displayed offer and raises the matching notice.
    ///
    /// Returns `None` if `offer_id` is not a claimable displayed offer. The
    /// claim itself always runs to completion; only the notice is dropped if
    /// the view was torn down meanwhile.
    pub async fn claim(&self, offer_id: &OfferId) -> Option<ClaimOutcome> {
        let scope = self.current_scope();
        let offer = self.lock().offers.iter().find(|o| &o.id == offer_id).cloned()?;

        if is_placeholder(&offer.id) {
            self.update(&scope, |state| state.notices.push(Notice::OffersUnavailable));
            return None;
        }

        let outcome = self.storefront.coordinator().claim(&offer).await;

        let notice = match &outcome {
            ClaimOutcome::Succeeded(_) | ClaimOutcome::AlreadyClaimed => {
                Notice::Claimed(offer.id.clone())
            }
            ClaimOutcome::Unauthenticated => Notice::SignInRequired,
            ClaimOutcome::Failed(reason) => Notice::Error(reason.user_message().to_string()),
        };
        if !self.update(&scope, |state| state.notices.push(notice)) {
            tracing::debug!(offer_id = %offer.id, "view torn down during claim, notice discarded");
        }
        Some(outcome)
    }

    /// Signs out: clears the session, destroys the cart view, and forgets
    /// every offer's claim status.
    ///
    /// A mounted view stays mounted under a fresh scope, so operations begun
    /// before logout can no longer raise notices or replace the offers.
    pub async fn logout(&self) {
        {
            let mut state = self.lock();
            if state.scope.is_mounted() {
                state.scope.close();
                state.scope = ViewScope::open();
                state.notices.clear();
            }
        }
        self.storefront.logout().await;
    }

    pub fn offers(&self) -> Vec<Offer> {
        self.lock().offers.clone()
    }

    pub fn catalog_status(&self) -> CatalogStatus {
        self.lock().catalog.clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.lock().notices.clone()
    }

    pub fn claim_status(&self, offer_id: &OfferId) -> OfferClaimStatus {
        self.storefront.coordinator().status(offer_id)
    }

    pub async fn cart(&self) -> Option<CartView> {
        self.storefront.cart().snapshot().await
    }

    fn current_scope(&self) -> ViewScope {
        self.lock().scope.clone()
    }

    /// Applies `f` only if `scope` is still the mounted scope.
    fn update(&self, scope: &ViewScope, f: impl FnOnce(&mut PanelState)) -> bool {
        let mut state = self.lock();
        if !scope.is_mounted() {
            return false;
        }
        f(&mut state);
        true
    }

    fn lock(&self) -> MutexGuard<'_, PanelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
