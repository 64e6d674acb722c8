//! Checkout orchestration.
//!
//! Converts a single-product "buy now" request or a cart total into a
//! gateway payment order, and records gateway payment confirmations. The
//! charge amount is always computed server-side from catalog prices; the
//! only client-supplied amount accepted anywhere is cross-checked against
//! the session cart before use (see `routes::checkout`).
//!
//! One synchronous gateway call per checkout attempt, no retries, no local
//! state on failure: a failed attempt leaves no trace and the caller may
//! simply try again end-to-end.

use std::sync::Arc;

use secrecy::ExposeSecret;
use serde::Deserialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{error, info, instrument};

use kirana_core::{CurrencyCode, Email, ProductId};

use crate::config::RazorpayConfig;
use crate::db::{OrderRepository, RecordOutcome, RepositoryError, ProductRepository, UserRepository};
use crate::models::order::NewPaymentRecord;
use crate::models::product::Product;
use crate::models::session::CurrentUser;
use crate::razorpay::{GatewayError, GatewayOrder, OrderRequest, PaymentGateway, signature};

/// Errors from checkout operations.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The referenced product does not exist.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// The computed charge does not fit in minor units.
    #[error("charge amount out of range")]
    AmountOutOfRange,

    /// The gateway call failed; nothing was persisted.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Database failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// The session principal has no matching account. Should not happen if
    /// authentication is enforced upstream; treated as a server fault.
    #[error("no account for principal {0}")]
    OwnerNotFound(Email),

    /// The payment callback signature did not verify. Nothing is persisted.
    #[error("payment signature verification failed")]
    InvalidSignature,
}

/// Payment confirmation posted by the client after the gateway UI succeeds.
/// Field names follow the gateway's callback payload.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentCallback {
    pub razorpay_payment_id: String,
    pub razorpay_order_id: String,
    pub razorpay_signature: String,
}

/// A gateway order for a single-product purchase, plus the display data the
/// payment UI needs.
#[derive(Debug)]
pub struct BuyNowOrder {
    pub order: GatewayOrder,
    pub product: Product,
    pub quantity: u32,
}

/// Checkout orchestrator.
#[derive(Clone)]
pub struct CheckoutService {
    pool: SqlitePool,
    gateway: Arc<dyn PaymentGateway>,
    razorpay: RazorpayConfig,
}

impl CheckoutService {
    /// Create a new checkout service.
    #[must_use]
    pub fn new(pool: SqlitePool, gateway: Arc<dyn PaymentGateway>, razorpay: RazorpayConfig) -> Self {
        Self {
            pool,
            gateway,
            razorpay,
        }
    }

    /// Create a gateway order for a single product.
    ///
    /// The amount is derived from the live catalog price
    /// (`round(unit_price * quantity * 100)`), never from the caller.
    ///
    /// # Errors
    ///
    /// `ProductNotFound` if the product does not resolve, `Gateway` if the
    /// order-creation call fails.
    #[instrument(skip(self))]
    pub async fn buy_now(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<BuyNowOrder, CheckoutError> {
        let product = ProductRepository::new(&self.pool)
            .get(product_id)
            .await?
            .ok_or(CheckoutError::ProductNotFound(product_id))?;

        let amount = product
            .unit_price
            .total_paise(quantity)
            .ok_or(CheckoutError::AmountOutOfRange)?;

        let order = self.create_gateway_order(amount).await?;
        info!(order_id = %order.id, amount, "buy-now gateway order created");

        Ok(BuyNowOrder {
            order,
            product,
            quantity,
        })
    }

    /// Create a gateway order for an amount the server already computed
    /// (e.g., a session cart total).
    ///
    /// # Errors
    ///
    /// `AmountOutOfRange` for non-positive amounts, `Gateway` on failure.
    #[instrument(skip(self))]
    pub async fn order_for_amount(&self, amount_paise: i64) -> Result<GatewayOrder, CheckoutError> {
        if amount_paise <= 0 {
            return Err(CheckoutError::AmountOutOfRange);
        }
        let order = self.create_gateway_order(amount_paise).await?;
        info!(order_id = %order.id, amount_paise, "gateway order created");
        Ok(order)
    }

    /// Record a confirmed payment for the authenticated principal.
    ///
    /// Verification order matters: the signature gate runs before any
    /// database access, and the insert itself is idempotent per gateway
    /// payment id, so retries are safe and forgeries persist nothing.
    ///
    /// # Errors
    ///
    /// `InvalidSignature` if the callback fails verification,
    /// `OwnerNotFound` if the principal has no account, `Repository` on
    /// database failure.
    #[instrument(skip(self, callback), fields(payment_id = %callback.razorpay_payment_id))]
    pub async fn record_payment(
        &self,
        callback: &PaymentCallback,
        current_user: &CurrentUser,
        amount_paise: i64,
    ) -> Result<RecordOutcome, CheckoutError> {
        let verified = signature::verify_payment_signature(
            &callback.razorpay_order_id,
            &callback.razorpay_payment_id,
            &callback.razorpay_signature,
            self.razorpay.key_secret.expose_secret().as_bytes(),
        );
        if !verified {
            return Err(CheckoutError::InvalidSignature);
        }

        let owner = UserRepository::new(&self.pool)
            .get_by_email(&current_user.email)
            .await?
            .ok_or_else(|| {
                error!(principal = %current_user.email, "authenticated principal has no account row");
                CheckoutError::OwnerNotFound(current_user.email.clone())
            })?;

        let outcome = OrderRepository::new(&self.pool)
            .record(&NewPaymentRecord {
                razorpay_order_id: callback.razorpay_order_id.clone(),
                razorpay_payment_id: callback.razorpay_payment_id.clone(),
                razorpay_signature: callback.razorpay_signature.clone(),
                amount_paise,
                user_id: owner.id,
                email: owner.email,
            })
            .await?;

        if matches!(outcome, RecordOutcome::Duplicate) {
            info!(
                payment_id = %callback.razorpay_payment_id,
                "payment already recorded; treating as success"
            );
        }

        Ok(outcome)
    }

    async fn create_gateway_order(&self, amount: i64) -> Result<GatewayOrder, CheckoutError> {
        let request = OrderRequest {
            amount,
            currency: CurrencyCode::INR.code().to_string(),
            receipt: new_receipt_ref(),
        };
        Ok(self.gateway.create_order(&request).await?)
    }
}

/// A fresh receipt reference, unique per checkout intent.
///
/// Timestamp plus a random suffix so two intents in the same millisecond
/// still differ.
fn new_receipt_ref() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u16 = rand::random();
    format!("txn_{millis}_{suffix:04x}")
}
