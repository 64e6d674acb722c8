//! Product lookup repository.
//!
//! The cart and checkout treat the catalog as a read-only lookup service:
//! given an id, return the live name and price or nothing. Prices are stored
//! as decimal TEXT so money never passes through floating point.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Row, SqlitePool};

use kirana_core::{Price, ProductId};

use super::RepositoryError;
use crate::models::product::Product;

/// Repository for product lookups.
pub struct ProductRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a product by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored price is not
    /// a valid decimal.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(
            r"
            SELECT id, name, description, unit_price, created_at
            FROM product
            WHERE id = ?1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| map_product(&r)).transpose()
    }

    /// List the catalog in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails, or
    /// `RepositoryError::DataCorruption` on an invalid stored price.
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(
            r"
            SELECT id, name, description, unit_price, created_at
            FROM product
            ORDER BY id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        rows.iter().map(map_product).collect()
    }

    /// Insert a product and return it.
    ///
    /// Used by seeding and tests; the cart/checkout paths never write here.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        name: &str,
        description: Option<&str>,
        unit_price: Decimal,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query(
            r"
            INSERT INTO product (name, description, unit_price)
            VALUES (?1, ?2, ?3)
            RETURNING id, name, description, unit_price, created_at
            ",
        )
        .bind(name)
        .bind(description)
        .bind(unit_price.to_string())
        .fetch_one(self.pool)
        .await?;

        map_product(&row)
    }
}

fn map_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product, RepositoryError> {
    let raw_price: String = row.try_get("unit_price")?;
    let amount = raw_price.parse::<Decimal>().map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid price in database: {e}"))
    })?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    Ok(Product {
        id: ProductId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        unit_price: Price::inr(amount),
        created_at,
    })
}
