//! Cart reconciliation against the server.
//!
//! The local [`CartView`] is a projection that is only ever replaced as a
//! whole by a server read. A failed read leaves the previous view in place.

use std::sync::Arc;
use std::time::Duration;

use domain::CartView;
use tokio::sync::RwLock;

use crate::error::{ClientError, Result};
use crate::session::SessionStore;
use crate::transport::StorefrontTransport;

const STATUS_UNAUTHORIZED: u16 = 401;

#[derive(Debug, Default)]
struct CartSlot {
    view: Option<CartView>,
    epoch: u64,
}

/// The per-tab cart view, shared by every component that reads or replaces it.
///
/// Clearing the cart starts a new epoch. A read that began in an earlier
/// epoch is discarded instead of repopulating a cart the user logged out of.
#[derive(Debug, Clone, Default)]
pub struct SharedCart {
    slot: Arc<RwLock<CartSlot>>,
}

impl SharedCart {
    /// Creates an empty cart slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the current view, if one has been loaded.
    pub async fn snapshot(&self) -> Option<CartView> {
        self.slot.read().await.view.clone()
    }

    /// Destroys the view and starts a new epoch.
    pub async fn clear(&self) {
        let mut slot = self.slot.write().await;
        slot.view = None;
        slot.epoch += 1;
    }

    /// Returns the current epoch.
    pub async fn epoch(&self) -> u64 {
        self.slot.read().await.epoch
    }

    /// Replaces the view only if no clear happened since `epoch` was read.
    pub async fn replace_if_current(&self, epoch: u64, view: CartView) -> bool {
        let mut slot = self.slot.write().await;
        if slot.epoch != epoch {
            return false;
        }
        slot.view = Some(view);
        true
    }
}

/// Re-reads the server cart after a claim changed it.
pub struct CartSynchronizer<T: StorefrontTransport> {
    transport: Arc<T>,
    sessions: Arc<dyn SessionStore>,
    cart: SharedCart,
    grace: Duration,
}

impl<T: StorefrontTransport> Clone for CartSynchronizer<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            sessions: self.sessions.clone(),
            cart: self.cart.clone(),
            grace: self.grace,
        }
    }
}

impl<T: StorefrontTransport> CartSynchronizer<T> {
    /// Creates a synchronizer writing into `cart`.
    pub fn new(
        transport: Arc<T>,
        sessions: Arc<dyn SessionStore>,
        cart: SharedCart,
        grace: Duration,
    ) -> Self {
        Self {
            transport,
            sessions,
            cart,
            grace,
        }
    }

    /// Returns the cart slot this synchronizer writes into.
    pub fn cart(&self) -> &SharedCart {
        &self.cart
    }

    /// Waits the grace period, then replaces the view with a fresh server read.
    ///
    /// `epoch` is the cart epoch read before the claim that changed the
    /// server cart was sent; if the cart was cleared since, the read result
    /// is discarded. On failure the previous view stays and the error is
    /// returned; a claim outcome is never downgraded because of it.
    #[tracing::instrument(skip(self))]
    pub async fn reconcile(&self, epoch: u64) -> Result<CartView> {
        tokio::time::sleep(self.grace).await;
        self.read_into(epoch).await
    }

    /// Replaces the view with a server read, without the grace period.
    #[tracing::instrument(skip(self))]
    pub async fn refresh(&self) -> Result<CartView> {
        let epoch = self.cart.epoch().await;
        self.read_into(epoch).await
    }

    /// Replaces the view with a snapshot the server already returned.
    ///
    /// Returns false, leaving the view alone, if the cart was cleared since
    /// `epoch` was read.
    pub async fn apply_snapshot(&self, epoch: u64, view: CartView) -> bool {
        let lines = view.len();
        if self.cart.replace_if_current(epoch, view).await {
            metrics::counter!("cart_reconcile_total", "result" => "snapshot").increment(1);
            tracing::debug!(lines, "applied cart snapshot from claim response");
            true
        } else {
            metrics::counter!("cart_reconcile_total", "result" => "stale").increment(1);
            tracing::debug!("cart cleared during claim, discarding snapshot");
            false
        }
    }

    async fn read_into(&self, epoch: u64) -> Result<CartView> {
        match self.read_server_cart().await {
            Ok(view) => {
                if self.cart.replace_if_current(epoch, view.clone()).await {
                    metrics::counter!("cart_reconcile_total", "result" => "replaced").increment(1);
                    tracing::debug!(lines = view.len(), "cart view replaced");
                } else {
                    metrics::counter!("cart_reconcile_total", "result" => "stale").increment(1);
                    tracing::debug!("cart cleared during read, discarding result");
                }
                Ok(view)
            }
            Err(e) => {
                metrics::counter!("cart_reconcile_total", "result" => "failed").increment(1);
                tracing::warn!(error = %e, "cart read failed, keeping previous view");
                Err(e)
            }
        }
    }

    async fn read_server_cart(&self) -> Result<CartView> {
        let session = self.sessions.current().ok_or(ClientError::Unauthenticated)?;
        let response = self.transport.fetch_cart(&session.token).await?;

        if response.status == STATUS_UNAUTHORIZED {
            return Err(ClientError::Unauthenticated);
        }
        if !response.is_success() {
            return Err(ClientError::Status {
                status: response.status,
                body: response.body,
            });
        }
        Ok(CartView::from_response_body(&response.body)?)
    }
}
