//! Razorpay payment gateway client.
//!
//! # Architecture
//!
//! - Plain JSON REST over `reqwest` with basic auth (key id / key secret)
//! - A gateway order is created server-side for a server-computed amount;
//!   the browser completes payment against it in the Razorpay UI
//! - Payment confirmations are HMAC-signed by the gateway and verified
//!   before anything is persisted (see [`signature`])
//!
//! The [`PaymentGateway`] trait is the seam between the checkout
//! orchestrator and the network; tests substitute a recording mock.

mod client;
pub mod signature;

pub use client::RazorpayClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when interacting with the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed (includes timeouts).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway rejected the request.
    #[error("gateway error: {0}")]
    Api(String),
}

/// A request to create a gateway payment order.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OrderRequest {
    /// Charge amount in minor units (paise).
    pub amount: i64,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Caller-generated receipt reference, unique per checkout intent.
    pub receipt: String,
}

/// A payment order created at the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayOrder {
    /// Gateway order id (e.g., `order_...`).
    pub id: String,
    /// Amount in minor units the order was created for.
    pub amount: i64,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Receipt reference echoed back by the gateway.
    pub receipt: Option<String>,
}

/// The gateway operations the checkout orchestrator depends on.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a remote payment order. One synchronous call, no retries;
    /// failures propagate to the caller and leave no local trace.
    async fn create_order(&self, request: &OrderRequest) -> Result<GatewayOrder, GatewayError>;
}
