//! HTTP client for the Razorpay Orders API.

use std::time::Duration;

use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{GatewayError, GatewayOrder, OrderRequest, PaymentGateway};
use crate::config::RazorpayConfig;

const API_BASE: &str = "https://api.razorpay.com/v1";

/// The gateway imposes no deadline of its own; expiry surfaces as
/// `GatewayError::Http` and the checkout attempt can be retried end-to-end.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the Razorpay REST API.
#[derive(Clone)]
pub struct RazorpayClient {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

/// Error envelope returned by the gateway on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<String>,
    description: String,
}

impl RazorpayClient {
    /// Create a new Razorpay client.
    #[must_use]
    pub fn new(config: &RazorpayConfig) -> Self {
        Self::with_base_url(config, API_BASE)
    }

    /// Create a client against a non-default endpoint (sandbox, local stub).
    #[must_use]
    pub fn with_base_url(config: &RazorpayConfig, base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client with static configuration");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.expose_secret().to_string(),
        }
    }
}

#[async_trait::async_trait]
impl PaymentGateway for RazorpayClient {
    #[instrument(skip(self), fields(amount = request.amount, currency = %request.currency))]
    async fn create_order(&self, request: &OrderRequest) -> Result<GatewayOrder, GatewayError> {
        let url = format!("{}/orders", self.base_url);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body).map_or_else(
                |_| format!("HTTP {status}: {body}"),
                |envelope| match envelope.error.code {
                    Some(code) => format!("{code}: {}", envelope.error.description),
                    None => envelope.error.description,
                },
            );
            return Err(GatewayError::Api(message));
        }

        let order: GatewayOrder = response.json().await?;
        debug!(order_id = %order.id, "gateway order created");
        Ok(order)
    }
}
