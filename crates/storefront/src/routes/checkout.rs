//! Checkout route handlers: buy-now, cart order creation, and the payment
//! confirmation callback.
//!
//! All three require an authenticated principal. Amounts are computed
//! server-side (catalog price for buy-now, session cart total for
//! create-order); the `amount` a client sends to `/create-order` is only a
//! cross-check against the server's own number.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{instrument, warn};

use kirana_core::ProductId;

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::session::PendingOrder;
use crate::models::session_keys;
use crate::routes::cart::get_cart_key;
use crate::services::cart::price_cart;
use crate::services::checkout::PaymentCallback;
use crate::state::AppState;

/// Optional quantity on `POST /buy-now/{id}`.
#[derive(Debug, Deserialize)]
pub struct BuyNowQuery {
    pub quantity: Option<u32>,
}

/// Product display data embedded in the buy-now response.
#[derive(Debug, Serialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
}

/// Everything the client-side payment UI needs to collect the payment.
#[derive(Debug, Serialize)]
pub struct BuyNowResponse {
    /// Gateway public key id.
    pub key: String,
    pub order_id: String,
    /// Charge amount in paise.
    pub amount: i64,
    pub currency: String,
    pub product: ProductSummary,
    pub quantity: u32,
}

/// Body for `POST /create-order`: the amount the client computed, in paise.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub amount: i64,
}

/// Response for `POST /create-order`.
#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub id: String,
    pub amount: i64,
}

/// Remember the gateway order this session is about to pay, so the
/// confirmation callback can recover the server-side amount.
async fn set_pending_order(session: &Session, order_id: &str, amount_paise: i64) -> Result<()> {
    session
        .insert(
            session_keys::PENDING_ORDER,
            PendingOrder {
                order_id: order_id.to_string(),
                amount_paise,
            },
        )
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))
}

/// Create a gateway order for a single product.
#[instrument(skip(state, session, user), fields(principal = %user.email))]
pub async fn buy_now(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
    Query(query): Query<BuyNowQuery>,
) -> Result<Json<BuyNowResponse>> {
    let quantity = query.quantity.unwrap_or(1).max(1);

    let purchase = state.checkout().buy_now(product_id, quantity).await?;
    set_pending_order(&session, &purchase.order.id, purchase.order.amount).await?;

    Ok(Json(BuyNowResponse {
        key: state.config().razorpay.key_id.clone(),
        order_id: purchase.order.id,
        amount: purchase.order.amount,
        currency: purchase.order.currency,
        product: ProductSummary {
            id: purchase.product.id,
            name: purchase.product.name,
            unit_price: purchase.product.unit_price.amount,
        },
        quantity: purchase.quantity,
    }))
}

/// Create a gateway order for the session cart.
///
/// The amount is recomputed here from live catalog prices. The client's
/// `amount` must agree, otherwise the request is rejected: a stale cart
/// view should fail loudly rather than charge the wrong number.
#[instrument(skip(state, session, user), fields(principal = %user.email))]
pub async fn create_order(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>> {
    let entries = match get_cart_key(&session).await {
        Some(key) => state.carts().snapshot(key),
        None => Vec::new(),
    };
    if entries.is_empty() {
        return Err(AppError::BadRequest("cart is empty".to_string()));
    }

    let priced = price_cart(state.pool(), &entries).await?;
    let total_paise = priced
        .total_paise()
        .ok_or_else(|| AppError::BadRequest("charge amount out of range".to_string()))?;

    if request.amount != total_paise {
        warn!(
            client_amount = request.amount,
            server_amount = total_paise,
            "client-computed amount disagrees with cart total"
        );
        return Err(AppError::BadRequest(
            "amount does not match the cart total".to_string(),
        ));
    }

    let order = state.checkout().order_for_amount(total_paise).await?;
    set_pending_order(&session, &order.id, order.amount).await?;

    Ok(Json(CreateOrderResponse {
        id: order.id,
        amount: order.amount,
    }))
}

/// Record a confirmed payment.
///
/// The signature is verified and the insert is idempotent per gateway
/// payment id, so clients may retry this call safely.
#[instrument(skip(state, session, user, callback), fields(principal = %user.email))]
pub async fn payment_success(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Json(callback): Json<PaymentCallback>,
) -> Result<Response> {
    // The recorded amount comes from the checkout intent this session
    // created, never from the callback body.
    let pending: Option<PendingOrder> = session
        .get(session_keys::PENDING_ORDER)
        .await
        .ok()
        .flatten();
    let matched = pending
        .as_ref()
        .filter(|p| p.order_id == callback.razorpay_order_id);
    let amount_paise = match matched {
        Some(p) => p.amount_paise,
        None => {
            warn!(
                order_id = %callback.razorpay_order_id,
                "payment confirmation for an order this session did not create; recording amount 0"
            );
            0
        }
    };

    let consume_pending = matched.is_some();

    state
        .checkout()
        .record_payment(&callback, &user, amount_paise)
        .await?;

    // An unrelated confirmation must not consume the pending order; the
    // session may still receive the real one afterwards.
    if consume_pending {
        let _ = session
            .remove::<PendingOrder>(session_keys::PENDING_ORDER)
            .await;
    }

    Ok(StatusCode::OK.into_response())
}
