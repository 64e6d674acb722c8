//! Authentication route handlers.
//!
//! Minimal account plumbing: checkout needs a principal, these routes
//! produce one. Everything else about identity is out of scope.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use kirana_core::UserId;

use crate::error::{AppError, Result};
use crate::middleware::auth::{clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::services::auth;
use crate::state::AppState;

/// Credentials for register and login.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// The logged-in account.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: UserId,
    pub email: String,
}

async fn establish_session(session: &Session, user: &crate::models::user::User) -> Result<()> {
    let current = CurrentUser {
        id: user.id,
        email: user.email.clone(),
    };
    set_current_user(session, &current)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))
}

/// Register a new account and log it in.
#[instrument(skip(state, session, request))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<CredentialsRequest>,
) -> Result<impl IntoResponse> {
    let user = auth::register(state.pool(), &request.email, &request.password).await?;
    establish_session(&session, &user).await?;

    Ok((
        StatusCode::CREATED,
        Json(AccountResponse {
            id: user.id,
            email: user.email.into_inner(),
        }),
    ))
}

/// Log in with email and password.
#[instrument(skip(state, session, request))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<CredentialsRequest>,
) -> Result<Json<AccountResponse>> {
    let user = auth::login(state.pool(), &request.email, &request.password).await?;
    establish_session(&session, &user).await?;

    Ok(Json(AccountResponse {
        id: user.id,
        email: user.email.into_inner(),
    }))
}

/// Log out the current session.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Login page placeholder. Browser requests that hit a protected route get
/// redirected here; the storefront client renders the actual form.
pub async fn login_page() -> &'static str {
    "login required"
}
