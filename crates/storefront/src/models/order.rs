//! Payment record types.
//!
//! A `PaymentRecord` is this system's durable record of a confirmed gateway
//! payment. It is created only after the gateway signature verifies, is
//! immutable thereafter, and is never deleted by this service.

use chrono::{DateTime, Utc};

use kirana_core::{Email, OrderId, UserId};

/// A confirmed payment (domain type).
#[derive(Debug, Clone)]
pub struct PaymentRecord {
    /// Local database ID.
    pub id: OrderId,
    /// Gateway order identifier (created at checkout time).
    pub razorpay_order_id: String,
    /// Gateway payment identifier. Unique across all records.
    pub razorpay_payment_id: String,
    /// Gateway HMAC signature over the (order, payment) pair.
    pub razorpay_signature: String,
    /// Charged amount in paise.
    pub amount_paise: i64,
    /// Owning account.
    pub user_id: UserId,
    /// Owner's contact email at record time.
    pub email: Email,
    /// Server-assigned timestamp.
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting a new payment record.
#[derive(Debug, Clone)]
pub struct NewPaymentRecord {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
    pub amount_paise: i64,
    pub user_id: UserId,
    pub email: Email,
}
