//! Account Storage
//! Mission: Persist account records and enforce their invariants at write time
//!
//! The [`AccountStore`] trait is the only way the service touches persisted
//! accounts. [`SqliteAccountStore`] backs production; the in-memory store in
//! `memory_store` implements the same contract for tests.

use crate::auth::{
    credentials::hash_password_blocking,
    models::{normalize_email, Account, Role, MIN_AGE, MIN_PASSWORD_LEN},
};
use async_trait::async_trait;
use bcrypt::DEFAULT_COST;
use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, types::Type, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Fields accepted when creating an account
#[derive(Debug, Clone, Default)]
pub struct NewAccount {
    pub email: String,
    pub password: String, // plaintext, hashed before persistence
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: Option<i64>,
    pub role: Role,
}

/// Partial update; `None` leaves the field unchanged
#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: Option<i64>,
    pub role: Option<Role>,
}

impl AccountPatch {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.password.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.age.is_none()
            && self.role.is_none()
    }
}

/// Persistent collection of accounts
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Validate and insert a new account.
    async fn create(&self, new: NewAccount) -> Result<Account, StoreError>;

    /// Look an account up by email (normalized before comparing).
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>, StoreError>;

    /// Every account, oldest first.
    async fn find_all(&self) -> Result<Vec<Account>, StoreError>;

    /// Apply a partial update and return the new state.
    async fn update(&self, id: &str, patch: AccountPatch) -> Result<Account, StoreError>;

    /// Physically remove an account and return the removed record.
    async fn delete(&self, id: &str) -> Result<Account, StoreError>;
}

/// Account store errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    DuplicateEmail,
    NotFound,
    Validation(String),
    Backend(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateEmail => write!(f, "Account with this email already exists"),
            Self::NotFound => write!(f, "Account not found"),
            Self::Validation(msg) => write!(f, "Validation failed: {}", msg),
            Self::Backend(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(err, Some(msg))
                if err.code == ErrorCode::ConstraintViolation && msg.contains("accounts.email") =>
            {
                Self::DuplicateEmail
            }
            _ => Self::Backend(e.to_string()),
        }
    }
}

impl From<bcrypt::BcryptError> for StoreError {
    fn from(e: bcrypt::BcryptError) -> Self {
        Self::Backend(format!("password hashing failed: {}", e))
    }
}

/// Normalize an email and make sure something is left.
pub(crate) fn validate_email(raw: &str) -> Result<String, StoreError> {
    let email = normalize_email(raw);
    if email.is_empty() {
        return Err(StoreError::Validation("email is required".to_string()));
    }
    Ok(email)
}

pub(crate) fn validate_password(password: &str) -> Result<(), StoreError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(StoreError::Validation(format!(
            "password must be at least {} characters long",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

pub(crate) fn validate_age(age: Option<i64>) -> Result<(), StoreError> {
    match age {
        Some(age) if age < MIN_AGE => Err(StoreError::Validation(format!(
            "age must be at least {}",
            MIN_AGE
        ))),
        _ => Ok(()),
    }
}

/// Validate a new account and turn it into a record ready to persist.
/// The password is hashed on the blocking pool, so call this before taking
/// any store lock.
pub(crate) async fn build_account(new: NewAccount, hash_cost: u32) -> Result<Account, StoreError> {
    let email = validate_email(&new.email)?;
    validate_password(&new.password)?;
    validate_age(new.age)?;

    let password_hash = hash_password_blocking(&new.password, hash_cost).await?;

    Ok(Account {
        id: Uuid::new_v4().to_string(),
        email,
        password_hash,
        first_name: new.first_name,
        last_name: new.last_name,
        age: new.age,
        role: new.role,
        created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// A patch whose values passed validation and whose password, if any, is
/// already hashed. Applying it is cheap enough to do under a lock.
#[derive(Debug, Clone, Default)]
pub(crate) struct ValidatedPatch {
    email: Option<String>,
    password_hash: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    age: Option<i64>,
    role: Option<Role>,
}

impl ValidatedPatch {
    /// Write the patch into `account`. `id` and `created_at` are never touched.
    pub(crate) fn apply(self, account: &mut Account) {
        if let Some(email) = self.email {
            account.email = email;
        }
        if let Some(password_hash) = self.password_hash {
            account.password_hash = password_hash;
        }
        if let Some(first_name) = self.first_name {
            account.first_name = Some(first_name);
        }
        if let Some(last_name) = self.last_name {
            account.last_name = Some(last_name);
        }
        if let Some(age) = self.age {
            account.age = Some(age);
        }
        if let Some(role) = self.role {
            account.role = role;
        }
    }
}

/// Validate a patch and hash its new password off the runtime workers.
pub(crate) async fn validate_patch(
    patch: AccountPatch,
    hash_cost: u32,
) -> Result<ValidatedPatch, StoreError> {
    validate_age(patch.age)?;
    let email = patch.email.as_deref().map(validate_email).transpose()?;
    let password_hash = match &patch.password {
        Some(password) => {
            validate_password(password)?;
            Some(hash_password_blocking(password, hash_cost).await?)
        }
        None => None,
    };

    Ok(ValidatedPatch {
        email,
        password_hash,
        first_name: patch.first_name,
        last_name: patch.last_name,
        age: patch.age,
        role: patch.role,
    })
}

const SELECT_COLUMNS: &str =
    "SELECT id, email, password_hash, first_name, last_name, age, role, created_at FROM accounts";

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    let role_str: String = row.get(6)?;
    let role = Role::parse(&role_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            6,
            Type::Text,
            format!("unknown role '{}'", role_str).into(),
        )
    })?;

    Ok(Account {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        age: row.get(5)?,
        role,
        created_at: row.get(7)?,
    })
}

/// Account storage with SQLite backend
pub struct SqliteAccountStore {
    conn: Arc<Mutex<Connection>>,
    hash_cost: u32,
}

impl SqliteAccountStore {
    /// Open (or create) the database file and initialize the schema
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            hash_cost: DEFAULT_COST,
        };
        store.init_db()?;
        Ok(store)
    }

    /// Private in-memory database, mostly for tests
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            hash_cost: DEFAULT_COST,
        };
        store.init_db()?;
        Ok(store)
    }

    /// Override the bcrypt cost used when hashing passwords
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    /// Initialize database schema
    fn init_db(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                first_name TEXT,
                last_name TEXT,
                age INTEGER CHECK (age IS NULL OR age >= 18),
                role TEXT NOT NULL CHECK (role IN ('user', 'admin')),
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        debug!("Account schema ready");
        Ok(())
    }

    fn get_by_id(conn: &Connection, id: &str) -> Result<Option<Account>, StoreError> {
        let account = conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                params![id],
                account_from_row,
            )
            .optional()?;
        Ok(account)
    }
}

#[async_trait]
impl AccountStore for SqliteAccountStore {
    async fn create(&self, new: NewAccount) -> Result<Account, StoreError> {
        let account = build_account(new, self.hash_cost).await?;

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO accounts (id, email, password_hash, first_name, last_name, age, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                account.id,
                account.email,
                account.password_hash,
                account.first_name,
                account.last_name,
                account.age,
                account.role.as_str(),
                account.created_at,
            ],
        )?;

        info!("Created account: {} ({})", account.id, account.role);
        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let email = normalize_email(email);
        let conn = self.conn.lock();
        let account = conn
            .query_row(
                &format!("{} WHERE email = ?1", SELECT_COLUMNS),
                params![email],
                account_from_row,
            )
            .optional()?;
        Ok(account)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>, StoreError> {
        let conn = self.conn.lock();
        Self::get_by_id(&conn, id)
    }

    async fn find_all(&self) -> Result<Vec<Account>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("{} ORDER BY created_at, rowid", SELECT_COLUMNS))?;
        let accounts = stmt
            .query_map([], account_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(accounts)
    }

    async fn update(&self, id: &str, patch: AccountPatch) -> Result<Account, StoreError> {
        let patch = validate_patch(patch, self.hash_cost).await?;

        let conn = self.conn.lock();
        let mut account = Self::get_by_id(&conn, id)?.ok_or(StoreError::NotFound)?;
        patch.apply(&mut account);

        conn.execute(
            "UPDATE accounts
             SET email = ?2, password_hash = ?3, first_name = ?4, last_name = ?5, age = ?6, role = ?7
             WHERE id = ?1",
            params![
                account.id,
                account.email,
                account.password_hash,
                account.first_name,
                account.last_name,
                account.age,
                account.role.as_str(),
            ],
        )?;

        info!("Updated account: {}", account.id);
        Ok(account)
    }

    async fn delete(&self, id: &str) -> Result<Account, StoreError> {
        let conn = self.conn.lock();
        let account = Self::get_by_id(&conn, id)?.ok_or(StoreError::NotFound)?;

        conn.execute("DELETE FROM accounts WHERE id = ?1", params![id])?;

        info!("Deleted account: {}", id);
        Ok(account)
    }
}
