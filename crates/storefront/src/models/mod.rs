//! Domain models for the storefront.

pub mod order;
pub mod product;
pub mod session;
pub mod user;

pub use session::{CurrentUser, Flash, PendingOrder, keys as session_keys};
