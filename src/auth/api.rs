//! Account API Endpoints
//! Mission: Map HTTP requests onto account service operations

use crate::auth::{
    middleware::AuthToken,
    models::{Account, LoginRequest, SignupRequest, UpdateAccountRequest},
};
use crate::error::ServiceError;
use crate::service::AccountService;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use tracing::debug;

/// Shared auth state
#[derive(Clone)]
pub struct AuthState {
    pub accounts: Arc<AccountService>,
}

impl AuthState {
    pub fn new(accounts: Arc<AccountService>) -> Self {
        Self { accounts }
    }
}

/// Unreadable bodies are a caller problem, same as missing fields.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            debug!("Rejected request body: {}", rejection.body_text());
            Err(ServiceError::Validation("No valid JSON body provided".to_string()))
        }
    }
}

/// Signup endpoint - POST /users/signup
pub async fn signup(
    State(state): State<AuthState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Account>), ServiceError> {
    let account = state.accounts.signup(body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// Login endpoint - POST /users/login
///
/// The body is the bare token string.
pub async fn login(
    State(state): State<AuthState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(StatusCode, String), ServiceError> {
    let issued = state.accounts.login(body(payload)?).await?;
    debug!("Issued token for {} ({}s)", issued.account.id, issued.expires_in);
    Ok((StatusCode::OK, issued.token))
}

/// Current account - GET /users/me
pub async fn get_current_user(
    State(state): State<AuthState>,
    Extension(AuthToken(token)): Extension<AuthToken>,
) -> Result<Json<Account>, ServiceError> {
    let account = state.accounts.who_am_i(&token).await?;
    Ok(Json(account))
}

/// List all accounts - GET /users/all (Admin only)
pub async fn list_users(
    State(state): State<AuthState>,
    Extension(AuthToken(token)): Extension<AuthToken>,
) -> Result<Json<Vec<Account>>, ServiceError> {
    let accounts = state.accounts.list_all(&token).await?;
    Ok(Json(accounts))
}

/// Update account - PATCH /users/:id (self or admin)
///
/// Token, permission and target are checked before the body is looked at.
pub async fn update_user(
    State(state): State<AuthState>,
    Extension(AuthToken(token)): Extension<AuthToken>,
    Path(user_id): Path<String>,
    payload: Result<Json<UpdateAccountRequest>, JsonRejection>,
) -> Result<Json<Account>, ServiceError> {
    let caller = state.accounts.authorize_update(&token, &user_id).await?;
    let request = body(payload)?;
    let account = state.accounts.apply_update(&caller, &user_id, request).await?;
    Ok(Json(account))
}

/// Delete account - DELETE /users/:id (self or admin)
pub async fn delete_user(
    State(state): State<AuthState>,
    Extension(AuthToken(token)): Extension<AuthToken>,
    Path(user_id): Path<String>,
) -> Result<Json<Account>, ServiceError> {
    let account = state.accounts.delete_account(&token, &user_id).await?;
    Ok(Json(account))
}
