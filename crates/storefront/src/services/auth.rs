//! Local account authentication.
//!
//! Checkout only needs a principal; this is the thin layer that produces
//! one. Passwords are hashed with argon2 (PHC string format).

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use sqlx::SqlitePool;
use thiserror::Error;

use kirana_core::{Email, EmailError};

use crate::db::{RepositoryError, UserRepository};
use crate::models::user::User;

const MIN_PASSWORD_LENGTH: usize = 8;

/// Errors from authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email or wrong password. Deliberately indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An account with this email already exists.
    #[error("account already exists")]
    UserAlreadyExists,

    /// Password fails the length policy.
    #[error("password must be at least {MIN_PASSWORD_LENGTH} characters")]
    WeakPassword,

    /// Email failed validation.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Password hashing failed.
    #[error("password hashing error")]
    Hashing,

    /// Database failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Register a new account.
///
/// # Errors
///
/// `InvalidEmail`/`WeakPassword` for bad input, `UserAlreadyExists` when
/// the email is taken.
pub async fn register(pool: &SqlitePool, email: &str, password: &str) -> Result<User, AuthError> {
    let email = Email::parse(email)?;
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword);
    }

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| AuthError::Hashing)?
        .to_string();

    UserRepository::new(pool)
        .create(&email, &hash)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
            other => AuthError::Repository(other),
        })
}

/// Verify credentials and return the account.
///
/// # Errors
///
/// `InvalidCredentials` for unknown emails and wrong passwords alike.
pub async fn login(pool: &SqlitePool, email: &str, password: &str) -> Result<User, AuthError> {
    let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

    let user = UserRepository::new(pool)
        .get_by_email(&email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    let parsed = PasswordHash::new(&user.password_hash).map_err(|_| AuthError::Hashing)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AuthError::InvalidCredentials)?;

    Ok(user)
}
