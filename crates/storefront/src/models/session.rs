//! Session-stored types.
//!
//! The session carries the authenticated principal, the cart key, transient
//! flash messages for cart mutations, and the pending gateway order created
//! at checkout time.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kirana_core::{Email, UserId};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
}

/// Transient one-shot message shown after a cart mutation.
///
/// Mirrors redirect-with-message semantics: mutations redirect and leave a
/// flash in the session; the next cart view consumes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Flash {
    Success(String),
    Error(String),
}

/// The gateway order awaiting payment for this session.
///
/// Written when a gateway order is created (buy-now or cart checkout) and
/// consulted when the payment confirmation arrives, so the recorded amount
/// comes from the server-side checkout intent rather than the callback body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingOrder {
    /// Gateway order id.
    pub order_id: String,
    /// Amount in paise the order was created for.
    pub amount_paise: i64,
}

/// The per-session cart key type (random, no meaning outside the cart store).
pub type CartKey = Uuid;

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the cart store key owned by this session.
    pub const CART_KEY: &str = "cart_key";

    /// Key for the transient cart flash message.
    pub const CART_FLASH: &str = "cart_flash";

    /// Key for the pending gateway order.
    pub const PENDING_ORDER: &str = "pending_order";
}
