//! Payment callback signature verification.
//!
//! Razorpay signs successful payments with HMAC-SHA256 over
//! `"<order_id>|<payment_id>"` using the API key secret, hex-encoded. A
//! confirmation is only trusted (and only then persisted) if this signature
//! verifies.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Verify a payment callback signature.
///
/// Returns `false` for malformed hex as well as for a wrong signature; the
/// comparison itself is constant-time via `Mac::verify_slice`.
#[must_use]
pub fn verify_payment_signature(
    order_id: &str,
    payment_id: &str,
    signature: &str,
    key_secret: &[u8],
) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(key_secret) else {
        return false;
    };
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());

    let Ok(expected) = hex::decode(signature) else {
        return false;
    };

    mac.verify_slice(&expected).is_ok()
}
