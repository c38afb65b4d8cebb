//! Account Service
//! Mission: Compose store, credentials, tokens and policy into the account operations
//!
//! Every operation is a single authorize-then-act sequence with no state kept
//! between calls. Authorization always uses the account as it is stored now,
//! not the role claim baked into the token.

use crate::auth::{
    account_store::{AccountPatch, AccountStore, NewAccount},
    credentials::CredentialVerifier,
    jwt::JwtHandler,
    models::{
        Account, Claims, IssuedToken, LoginRequest, Role, SignupRequest, UpdateAccountRequest,
        MIN_PASSWORD_LEN,
    },
    policy::{can_act, Action},
};
use crate::error::ServiceError;
use std::sync::Arc;
use tracing::{info, warn};

pub struct AccountService {
    store: Arc<dyn AccountStore>,
    jwt_handler: Arc<JwtHandler>,
    credentials: CredentialVerifier,
}

/// Emails are trimmed before storage, so a blank one counts as absent.
fn present_email(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Passwords are taken verbatim; only an empty one counts as absent.
fn present_password(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl AccountService {
    /// `hash_cost` should match the store's bcrypt cost so failed logins for
    /// unknown emails take as long as wrong passwords.
    pub fn new(
        store: Arc<dyn AccountStore>,
        jwt_handler: Arc<JwtHandler>,
        hash_cost: u32,
    ) -> Result<Self, ServiceError> {
        let credentials = CredentialVerifier::new(store.clone(), hash_cost)
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        Ok(Self {
            store,
            jwt_handler,
            credentials,
        })
    }

    /// Register a new account. The role is always `user`.
    pub async fn signup(&self, request: SignupRequest) -> Result<Account, ServiceError> {
        let (Some(email), Some(password)) = (
            present_email(request.email),
            present_password(request.password),
        ) else {
            return Err(ServiceError::Validation("Fill required fields".to_string()));
        };

        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ServiceError::Validation("Password is too short".to_string()));
        }

        if request.role.is_some() {
            warn!("Ignoring role supplied at signup for {}", email.trim());
        }

        if self.store.find_by_email(&email).await?.is_some() {
            return Err(ServiceError::DuplicateEmail);
        }

        let account = self
            .store
            .create(NewAccount {
                email,
                password,
                first_name: request.first_name,
                last_name: request.last_name,
                age: request.age,
                role: Role::User,
            })
            .await?;

        info!("Signup: {} ({})", account.email, account.id);
        Ok(account)
    }

    /// Check credentials and issue a token.
    pub async fn login(&self, request: LoginRequest) -> Result<IssuedToken, ServiceError> {
        let (Some(email), Some(password)) = (
            present_email(request.email),
            present_password(request.password),
        ) else {
            return Err(ServiceError::Validation("No credentials provided".to_string()));
        };

        let Some(account) = self.credentials.authenticate(&email, &password).await? else {
            warn!("Failed login attempt: {}", email.trim());
            return Err(ServiceError::InvalidCredentials);
        };

        let (token, expires_in) = self.jwt_handler.generate_token(&account)?;

        info!("Login successful: {} ({})", account.email, account.role);
        Ok(IssuedToken {
            token,
            expires_in,
            account,
        })
    }

    /// The account behind a token, as currently stored.
    pub async fn who_am_i(&self, token: &str) -> Result<Account, ServiceError> {
        let claims = self.jwt_handler.validate_token(token)?;
        self.caller(&claims).await
    }

    /// Verify the token, check the caller may update `target_id` and that the
    /// target exists. Returns the caller.
    pub async fn authorize_update(
        &self,
        token: &str,
        target_id: &str,
    ) -> Result<Account, ServiceError> {
        let caller = self.who_am_i(token).await?;

        if !can_act(&caller, Some(target_id), Action::Update) {
            warn!("Account {} not allowed to update {}", caller.id, target_id);
            return Err(ServiceError::NotAuthorized);
        }

        if self.store.find_by_id(target_id).await?.is_none() {
            return Err(ServiceError::NotFound("User to update"));
        }

        Ok(caller)
    }

    /// Validate and store an update already cleared by [`Self::authorize_update`].
    pub async fn apply_update(
        &self,
        caller: &Account,
        target_id: &str,
        request: UpdateAccountRequest,
    ) -> Result<Account, ServiceError> {
        let role = request
            .role
            .as_deref()
            .map(|r| {
                Role::parse(r).ok_or_else(|| ServiceError::Validation(format!("Unknown role '{}'", r)))
            })
            .transpose()?;

        let patch = AccountPatch {
            email: request.email,
            password: request.password,
            first_name: request.first_name,
            last_name: request.last_name,
            age: request.age,
            role,
        };

        let updated = self.store.update(target_id, patch).await?;
        info!("Account {} updated by {}", updated.id, caller.id);
        Ok(updated)
    }

    pub async fn update_account(
        &self,
        token: &str,
        target_id: &str,
        request: UpdateAccountRequest,
    ) -> Result<Account, ServiceError> {
        let caller = self.authorize_update(token, target_id).await?;
        self.apply_update(&caller, target_id, request).await
    }

    pub async fn delete_account(&self, token: &str, target_id: &str) -> Result<Account, ServiceError> {
        let caller = self.who_am_i(token).await?;

        if !can_act(&caller, Some(target_id), Action::Delete) {
            warn!("Account {} not allowed to delete {}", caller.id, target_id);
            return Err(ServiceError::NotAuthorized);
        }

        let deleted = self.store.delete(target_id).await?;
        info!("Account {} deleted by {}", deleted.id, caller.id);
        Ok(deleted)
    }

    /// Every account. Admin only.
    pub async fn list_all(&self, token: &str) -> Result<Vec<Account>, ServiceError> {
        let caller = self.who_am_i(token).await?;

        if !can_act(&caller, None, Action::ListAll) {
            return Err(ServiceError::NotAuthorized);
        }

        Ok(self.store.find_all().await?)
    }

    /// Create an admin account at startup unless the email is already taken.
    /// Returns the new account, or `None` when nothing was created.
    pub async fn seed_admin(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<Account>, ServiceError> {
        if let Some(existing) = self.store.find_by_email(email).await? {
            if !existing.is_admin() {
                warn!("Seed admin email {} belongs to a non-admin account", existing.email);
            }
            return Ok(None);
        }

        let account = self
            .store
            .create(NewAccount {
                email: email.to_string(),
                password: password.to_string(),
                role: Role::Admin,
                ..Default::default()
            })
            .await?;

        info!("Seeded admin account: {}", account.email);
        Ok(Some(account))
    }

    async fn caller(&self, claims: &Claims) -> Result<Account, ServiceError> {
        self.store
            .find_by_id(&claims.sub)
            .await?
            .ok_or(ServiceError::NotFound("User"))
    }
}
