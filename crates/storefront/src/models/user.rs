//! User domain types.

use chrono::{DateTime, Utc};

use kirana_core::{Email, UserId};

/// A storefront account (domain type).
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// User's email address (also the login identifier).
    pub email: Email,
    /// Argon2 password hash (PHC string format).
    pub password_hash: String,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}
