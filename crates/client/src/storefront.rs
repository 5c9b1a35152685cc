//! Per-tab wiring of the claim workflow components.

use std::sync::Arc;

use crate::cart_sync::{CartSynchronizer, SharedCart};
use crate::catalog::OfferCatalogClient;
use crate::config::ClientConfig;
use crate::coordinator::ClaimCoordinator;
use crate::error::Result;
use crate::session::{Session, SessionStore};
use crate::transport::{HttpTransport, StorefrontTransport};

/// One browser tab's worth of client state: a transport, the session store,
/// the cart view, and the three components that share them.
pub struct Storefront<T: StorefrontTransport> {
    sessions: Arc<dyn SessionStore>,
    cart: SharedCart,
    catalog: OfferCatalogClient<T>,
    coordinator: ClaimCoordinator<T>,
    cart_sync: CartSynchronizer<T>,
}

impl<T: StorefrontTransport> Clone for Storefront<T> {
    fn clone(&self) -> Self {
        Self {
            sessions: self.sessions.clone(),
            cart: self.cart.clone(),
            catalog: self.catalog.clone(),
            coordinator: self.coordinator.clone(),
            cart_sync: self.cart_sync.clone(),
        }
    }
}

impl<T: StorefrontTransport + 'static> Storefront<T> {
    /// Wires the components around `transport` and `sessions`.
    pub fn new(transport: T, sessions: Arc<dyn SessionStore>, config: &ClientConfig) -> Self {
        let transport = Arc::new(transport);
        let cart = SharedCart::new();
        let cart_sync = CartSynchronizer::new(
            transport.clone(),
            sessions.clone(),
            cart.clone(),
            config.cart_grace,
        );
        let coordinator =
            ClaimCoordinator::new(transport.clone(), sessions.clone(), cart_sync.clone());
        let catalog = OfferCatalogClient::new(transport, sessions.clone(), config);

        Self {
            sessions,
            cart,
            catalog,
            coordinator,
            cart_sync,
        }
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    pub fn cart(&self) -> &SharedCart {
        &self.cart
    }

    pub fn catalog(&self) -> &OfferCatalogClient<T> {
        &self.catalog
    }

    pub fn coordinator(&self) -> &ClaimCoordinator<T> {
        &self.coordinator
    }

    pub fn cart_sync(&self) -> &CartSynchronizer<T> {
        &self.cart_sync
    }

    /// Stores `session` as the signed-in user.
    pub fn sign_in(&self, session: Session) {
        tracing::info!(user_id = %session.user_id, "signed in");
        self.sessions.save(session);
    }

    /// Clears the session, destroys the cart view, and forgets claim status.
    pub async fn logout(&self) {
        self.sessions.clear();
        self.cart.clear().await;
        self.coordinator.reset();
        tracing::info!("signed out");
    }
}

impl Storefront<HttpTransport> {
    /// Builds a storefront talking HTTP to `config.base_url`.
    pub fn connect(sessions: Arc<dyn SessionStore>, config: &ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.clone())?;
        Ok(Self::new(transport, sessions, config))
    }
}
