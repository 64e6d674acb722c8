//! Cart route handlers.
//!
//! Mutations follow redirect-with-flash semantics: the handler applies the
//! change (or doesn't, when the product is missing), leaves a transient
//! message in the session, and redirects. The cart view itself is JSON;
//! rendering is the client's concern.
//!
//! The session only holds the cart *key*; entries live in the in-process
//! [`CartStore`](crate::services::cart::CartStore).

use axum::{
    Form, Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{error, instrument};

use kirana_core::ProductId;

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::models::session::CartKey;
use crate::models::{Flash, session_keys};
use crate::services::cart::{PricedItem, price_cart};
use crate::state::AppState;

// =============================================================================
// Session Helpers
// =============================================================================

/// Get the cart key from the session, if one has been assigned.
pub async fn get_cart_key(session: &Session) -> Option<CartKey> {
    session
        .get::<CartKey>(session_keys::CART_KEY)
        .await
        .ok()
        .flatten()
}

/// Get the session's cart key, assigning a fresh one on first use.
async fn ensure_cart_key(session: &Session) -> Result<CartKey> {
    if let Some(key) = get_cart_key(session).await {
        return Ok(key);
    }
    let key = CartKey::new_v4();
    session
        .insert(session_keys::CART_KEY, key)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    Ok(key)
}

/// Leave a one-shot flash message in the session. Failures are logged, not
/// surfaced: losing a flash must not fail the mutation it describes.
async fn set_flash(session: &Session, flash: Flash) {
    if let Err(e) = session.insert(session_keys::CART_FLASH, flash).await {
        error!("failed to store cart flash message: {e}");
    }
}

/// Take (and clear) the pending flash message.
async fn take_flash(session: &Session) -> Option<Flash> {
    session
        .remove::<Flash>(session_keys::CART_FLASH)
        .await
        .ok()
        .flatten()
}

// =============================================================================
// Request / Response Types
// =============================================================================

/// Optional quantity on `POST /cart/add/{id}`.
#[derive(Debug, Deserialize)]
pub struct AddQuery {
    pub quantity: Option<u32>,
}

/// Form body for `POST /cart/update/{id}`. Signed: zero and below remove.
#[derive(Debug, Deserialize)]
pub struct UpdateForm {
    pub quantity: i64,
}

/// Flash message as presented to the client.
#[derive(Debug, Serialize)]
pub struct FlashView {
    pub level: &'static str,
    pub message: String,
}

impl From<Flash> for FlashView {
    fn from(flash: Flash) -> Self {
        match flash {
            Flash::Success(message) => Self {
                level: "success",
                message,
            },
            Flash::Error(message) => Self {
                level: "error",
                message,
            },
        }
    }
}

/// Cart view data: live-priced items, total, and the gateway public key the
/// payment UI needs.
#[derive(Debug, Serialize)]
pub struct CartPage {
    pub items: Vec<PricedItem>,
    pub total: Decimal,
    pub razorpay_key_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flash: Option<FlashView>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the cart. Empty carts redirect to the catalog root.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Response> {
    let Some(key) = get_cart_key(&session).await else {
        return Ok(Redirect::to("/").into_response());
    };

    let entries = state.carts().snapshot(key);
    if entries.is_empty() {
        return Ok(Redirect::to("/").into_response());
    }

    let priced = price_cart(state.pool(), &entries).await?;
    let flash = take_flash(&session).await.map(FlashView::from);

    Ok(Json(CartPage {
        items: priced.items,
        total: priced.total,
        razorpay_key_id: state.config().razorpay.key_id.clone(),
        flash,
    })
    .into_response())
}

/// Add a product to the cart.
///
/// A missing product leaves the cart untouched and redirects with an error
/// flash; the mutation itself never fails the request.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Path(product_id): Path<ProductId>,
    Query(query): Query<AddQuery>,
) -> Result<Response> {
    // Zero would silently mutate nothing while still flashing success, so
    // treat it like an omitted quantity.
    let quantity = query.quantity.unwrap_or(1).max(1);

    let product = ProductRepository::new(state.pool()).get(product_id).await?;
    let Some(product) = product else {
        tracing::warn!(%product_id, "add to cart for unknown product");
        set_flash(
            &session,
            Flash::Error("That product is no longer available.".to_string()),
        )
        .await;
        return Ok(Redirect::to("/?cartError=true").into_response());
    };

    let key = ensure_cart_key(&session).await?;
    let size = state.carts().add(key, product.id, quantity);
    tracing::debug!(%product_id, quantity, cart_size = size, "added to cart");

    set_flash(
        &session,
        Flash::Success("Item added to cart successfully!".to_string()),
    )
    .await;
    Ok(Redirect::to("/?cartAdded=true").into_response())
}

/// Remove a product from the cart. Redirects to the catalog root when the
/// cart becomes empty, back to the cart otherwise.
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Path(product_id): Path<ProductId>,
) -> Result<Response> {
    let Some(key) = get_cart_key(&session).await else {
        return Ok(Redirect::to("/").into_response());
    };

    let remaining = state.carts().remove(key, product_id);
    if remaining == 0 {
        return Ok(Redirect::to("/").into_response());
    }
    Ok(Redirect::to("/cart").into_response())
}

/// Update a product's quantity. Zero or negative removes the entry; an
/// absent product is logged and ignored. Same empty-cart redirect rule as
/// `remove`.
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Path(product_id): Path<ProductId>,
    Form(form): Form<UpdateForm>,
) -> Result<Response> {
    let Some(key) = get_cart_key(&session).await else {
        return Ok(Redirect::to("/").into_response());
    };

    let quantity = u32::try_from(form.quantity.max(0)).unwrap_or(u32::MAX);
    let remaining = state.carts().set_quantity(key, product_id, quantity);
    if remaining == 0 {
        return Ok(Redirect::to("/").into_response());
    }
    Ok(Redirect::to("/cart").into_response())
}

/// Empty the cart.
#[instrument(skip(state, session))]
pub async fn clear(State(state): State<AppState>, session: Session) -> Result<Response> {
    if let Some(key) = get_cart_key(&session).await {
        state.carts().clear(key);
    }
    Ok(Redirect::to("/").into_response())
}
