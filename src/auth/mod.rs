//! Authentication Module
//! Mission: Account storage, credentials, JWT tokens and role-based access

pub mod account_store;
pub mod api;
pub mod credentials;
pub mod jwt;
pub mod memory_store;
pub mod middleware;
pub mod models;
pub mod policy;

pub use account_store::{AccountStore, SqliteAccountStore};
pub use api::AuthState;
pub use jwt::JwtHandler;
pub use memory_store::InMemoryAccountStore;
pub use middleware::require_token;
