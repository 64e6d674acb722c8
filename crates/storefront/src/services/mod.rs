//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `cart` - Session-scoped cart store and read-time pricing
//! - `checkout` - Gateway order creation and payment recording
//! - `auth` - Local accounts supplying the authenticated principal

pub mod auth;
pub mod cart;
pub mod checkout;
