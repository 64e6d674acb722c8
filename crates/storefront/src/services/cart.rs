//! Session-scoped cart store.
//!
//! Carts live in process memory, keyed by a random `CartKey` that the HTTP
//! layer keeps in the session (the session itself never stores cart
//! contents). Each cart sits behind its own mutex so overlapping requests
//! from the same client (double-clicks, parallel tabs) apply their mutations
//! one at a time; carts of different sessions never contend.
//!
//! Pricing is deliberately not stored: [`price_cart`] joins a snapshot of
//! the entries with live product rows on every read, so a price change in
//! the catalog is reflected by the very next cart view.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::warn;

use kirana_core::{Price, ProductId};

use crate::db::{ProductRepository, RepositoryError};
use crate::models::session::CartKey;

/// One product line in a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartEntry {
    pub product_id: ProductId,
    /// Always >= 1; an entry that would drop to zero is removed instead.
    pub quantity: u32,
}

/// A single session's cart. Ordered by first insertion.
#[derive(Debug, Clone, Default)]
pub struct Cart {
    entries: Vec<CartEntry>,
}

impl Cart {
    fn add(&mut self, product_id: ProductId, quantity: u32) {
        if quantity == 0 {
            return;
        }
        match self.entries.iter_mut().find(|e| e.product_id == product_id) {
            Some(entry) => entry.quantity = entry.quantity.saturating_add(quantity),
            None => self.entries.push(CartEntry {
                product_id,
                quantity,
            }),
        }
    }

    fn remove(&mut self, product_id: ProductId) {
        self.entries.retain(|e| e.product_id != product_id);
    }

    /// Returns whether the product was present.
    fn set_quantity(&mut self, product_id: ProductId, quantity: u32) -> bool {
        if quantity == 0 {
            let found = self.entries.iter().any(|e| e.product_id == product_id);
            self.remove(product_id);
            return found;
        }
        match self.entries.iter_mut().find(|e| e.product_id == product_id) {
            Some(entry) => {
                entry.quantity = quantity;
                true
            }
            None => false,
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shared map of per-session carts with per-key exclusive locking.
///
/// Cheaply cloneable; all clones see the same carts.
#[derive(Clone, Default)]
pub struct CartStore {
    carts: Arc<Mutex<HashMap<CartKey, Arc<Mutex<Cart>>>>>,
}

impl CartStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn cart(&self, key: CartKey) -> Arc<Mutex<Cart>> {
        let mut carts = self
            .carts
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(carts.entry(key).or_default())
    }

    /// Add `quantity` of a product, accumulating onto an existing entry.
    /// Returns the number of distinct entries afterwards.
    ///
    /// The caller is responsible for having resolved the product first; a
    /// failed lookup must not reach this method.
    pub fn add(&self, key: CartKey, product_id: ProductId, quantity: u32) -> usize {
        let cart = self.cart(key);
        let mut cart = cart.lock().unwrap_or_else(PoisonError::into_inner);
        cart.add(product_id, quantity);
        cart.len()
    }

    /// Remove a product. Absence is a no-op, not an error.
    /// Returns the number of remaining entries.
    pub fn remove(&self, key: CartKey, product_id: ProductId) -> usize {
        let cart = self.cart(key);
        let mut cart = cart.lock().unwrap_or_else(PoisonError::into_inner);
        cart.remove(product_id);
        cart.len()
    }

    /// Set a product's quantity, replacing the old value. Zero (or below,
    /// at the HTTP layer) removes the entry. Returns the number of
    /// remaining entries; an absent product is logged and left alone.
    pub fn set_quantity(&self, key: CartKey, product_id: ProductId, quantity: u32) -> usize {
        let cart = self.cart(key);
        let mut cart = cart.lock().unwrap_or_else(PoisonError::into_inner);
        if !cart.set_quantity(product_id, quantity) {
            warn!(%product_id, "quantity update for product not in cart");
        }
        cart.len()
    }

    /// A consistent snapshot of the cart's entries, in insertion order.
    #[must_use]
    pub fn snapshot(&self, key: CartKey) -> Vec<CartEntry> {
        let cart = self.cart(key);
        let cart = cart.lock().unwrap_or_else(PoisonError::into_inner);
        cart.entries.clone()
    }

    /// Whether the cart has no entries.
    #[must_use]
    pub fn is_empty(&self, key: CartKey) -> bool {
        let cart = self.cart(key);
        let cart = cart.lock().unwrap_or_else(PoisonError::into_inner);
        cart.is_empty()
    }

    /// Empty the cart.
    pub fn clear(&self, key: CartKey) {
        let cart = self.cart(key);
        let mut cart = cart.lock().unwrap_or_else(PoisonError::into_inner);
        cart.entries.clear();
    }
}

// =============================================================================
// Pricing
// =============================================================================

/// A cart entry joined with live product data for display.
#[derive(Debug, Clone, Serialize)]
pub struct PricedItem {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
}

/// A fully priced cart view.
#[derive(Debug, Clone, Serialize)]
pub struct PricedCart {
    pub items: Vec<PricedItem>,
    pub total: Decimal,
}

impl PricedCart {
    /// The cart total in paise, the unit the gateway charges in.
    #[must_use]
    pub fn total_paise(&self) -> Option<i64> {
        Price::inr(self.total).total_paise(1)
    }
}

/// Join a cart snapshot with live product data.
///
/// Entries whose product no longer resolves are skipped with a warning;
/// one dangling reference must not take down the whole cart view.
///
/// # Errors
///
/// Returns `RepositoryError` only for database failures, never for missing
/// products.
pub async fn price_cart(
    pool: &SqlitePool,
    entries: &[CartEntry],
) -> Result<PricedCart, RepositoryError> {
    let products = ProductRepository::new(pool);
    let mut items = Vec::with_capacity(entries.len());
    let mut total = Decimal::ZERO;

    for entry in entries {
        let Some(product) = products.get(entry.product_id).await? else {
            warn!(product_id = %entry.product_id, "cart references a product that no longer exists; skipping");
            continue;
        };

        let line_total = product.unit_price.amount * Decimal::from(entry.quantity);
        total += line_total;
        items.push(PricedItem {
            product_id: product.id,
            name: product.name,
            unit_price: product.unit_price.amount,
            quantity: entry.quantity,
            line_total,
        });
    }

    Ok(PricedCart { items, total })
}
