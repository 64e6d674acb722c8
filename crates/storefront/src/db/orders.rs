//! Order Recorder: durable, idempotent persistence of confirmed payments.
//!
//! Exactly one `payment_record` row may exist per gateway payment id. The
//! insert relies on the unique index and `ON CONFLICT DO NOTHING`, so a
//! retried `/payment-success` call is a successful no-op rather than a
//! duplicate charge record or an error.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use kirana_core::{Email, OrderId, UserId};

use super::RepositoryError;
use crate::models::order::{NewPaymentRecord, PaymentRecord};

/// Result of a [`OrderRepository::record`] call.
#[derive(Debug)]
pub enum RecordOutcome {
    /// A new payment record was written.
    Recorded(PaymentRecord),
    /// A record for this gateway payment id already exists; nothing changed.
    Duplicate,
}

/// Repository for payment records.
pub struct OrderRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a confirmed payment, at most once per gateway payment id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails for reasons
    /// other than the uniqueness of `razorpay_payment_id`.
    pub async fn record(
        &self,
        new: &NewPaymentRecord,
    ) -> Result<RecordOutcome, RepositoryError> {
        let row = sqlx::query(
            r"
            INSERT INTO payment_record
                (razorpay_order_id, razorpay_payment_id, razorpay_signature,
                 amount_paise, user_id, email)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT (razorpay_payment_id) DO NOTHING
            RETURNING id, created_at
            ",
        )
        .bind(&new.razorpay_order_id)
        .bind(&new.razorpay_payment_id)
        .bind(&new.razorpay_signature)
        .bind(new.amount_paise)
        .bind(new.user_id)
        .bind(new.email.as_str())
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(r) => {
                let created_at: DateTime<Utc> = r.try_get("created_at")?;
                Ok(RecordOutcome::Recorded(PaymentRecord {
                    id: OrderId::new(r.try_get("id")?),
                    razorpay_order_id: new.razorpay_order_id.clone(),
                    razorpay_payment_id: new.razorpay_payment_id.clone(),
                    razorpay_signature: new.razorpay_signature.clone(),
                    amount_paise: new.amount_paise,
                    user_id: new.user_id,
                    email: new.email.clone(),
                    created_at,
                }))
            }
            None => Ok(RecordOutcome::Duplicate),
        }
    }

    /// Look up a payment record by its gateway payment id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_payment_id(
        &self,
        payment_id: &str,
    ) -> Result<Option<PaymentRecord>, RepositoryError> {
        let row = sqlx::query(
            r"
            SELECT id, razorpay_order_id, razorpay_payment_id, razorpay_signature,
                   amount_paise, user_id, email, created_at
            FROM payment_record
            WHERE razorpay_payment_id = ?1
            ",
        )
        .bind(payment_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| map_record(&r)).transpose()
    }

    /// All payment records owned by a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<PaymentRecord>, RepositoryError> {
        let rows = sqlx::query(
            r"
            SELECT id, razorpay_order_id, razorpay_payment_id, razorpay_signature,
                   amount_paise, user_id, email, created_at
            FROM payment_record
            WHERE user_id = ?1
            ORDER BY id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.iter().map(map_record).collect()
    }
}

fn map_record(row: &sqlx::sqlite::SqliteRow) -> Result<PaymentRecord, RepositoryError> {
    let raw_email: String = row.try_get("email")?;
    let email = Email::parse(&raw_email).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
    })?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    Ok(PaymentRecord {
        id: OrderId::new(row.try_get("id")?),
        razorpay_order_id: row.try_get("razorpay_order_id")?,
        razorpay_payment_id: row.try_get("razorpay_payment_id")?,
        razorpay_signature: row.try_get("razorpay_signature")?,
        amount_paise: row.try_get("amount_paise")?,
        user_id: UserId::new(row.try_get("user_id")?),
        email,
        created_at,
    })
}
