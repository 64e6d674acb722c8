//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::StorefrontConfig;
use crate::razorpay::{PaymentGateway, RazorpayClient};
use crate::services::cart::CartStore;
use crate::services::checkout::CheckoutService;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; provides access to the database pool,
/// configuration, the in-process cart store, and the checkout service.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: SqlitePool,
    carts: CartStore,
    checkout: CheckoutService,
}

impl AppState {
    /// Create application state with the real Razorpay gateway client.
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: SqlitePool) -> Self {
        let gateway = Arc::new(RazorpayClient::new(&config.razorpay));
        Self::with_gateway(config, pool, gateway)
    }

    /// Create application state with an explicit gateway implementation.
    ///
    /// Tests inject a recording mock here.
    #[must_use]
    pub fn with_gateway(
        config: StorefrontConfig,
        pool: SqlitePool,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        let checkout = CheckoutService::new(pool.clone(), gateway, config.razorpay.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                carts: CartStore::new(),
                checkout,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    /// Get a reference to the cart store.
    #[must_use]
    pub fn carts(&self) -> &CartStore {
        &self.inner.carts
    }

    /// Get a reference to the checkout service.
    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }
}
