//! Product domain type.

use chrono::{DateTime, Utc};

use kirana_core::{Price, ProductId};

/// A catalog product (domain type).
///
/// The cart and checkout only ever read products; catalog management is
/// outside this service.
#[derive(Debug, Clone)]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Current unit price. Charge amounts are always derived from this at
    /// read time, never from anything client-supplied.
    pub unit_price: Price,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
}
