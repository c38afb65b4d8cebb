//! Account Service Library
//!
//! Signup, login, profile lookup, update, deletion and admin listing of user
//! accounts, with JWT bearer authentication and user/admin roles.

pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod service;

use crate::auth::{AccountStore, AuthState, JwtHandler, SqliteAccountStore};
use crate::config::Config;
use crate::service::AccountService;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

pub use routes::app_router;

/// Wire a store into the service and HTTP state. Seeds the configured admin
/// account if there is one.
pub async fn build_state_with_store(
    config: &Config,
    store: Arc<dyn AccountStore>,
) -> Result<AuthState> {
    let jwt_handler = Arc::new(JwtHandler::new(&config.jwt_secret));
    let accounts = Arc::new(AccountService::new(store, jwt_handler, config.bcrypt_cost)?);

    if let Some((email, password)) = config.admin_seed() {
        accounts
            .seed_admin(email, password)
            .await
            .context("Failed to seed admin account")?;
    }

    Ok(AuthState::new(accounts))
}

/// Open the SQLite store named by the configuration and build the state on it.
pub async fn build_state(config: &Config) -> Result<AuthState> {
    let store = SqliteAccountStore::open(&config.database_path)
        .with_context(|| format!("Failed to open account database at {}", config.database_path))?
        .with_hash_cost(config.bcrypt_cost);
    info!("Account database ready at: {}", config.database_path);

    build_state_with_store(config, Arc::new(store)).await
}
