//! Credential Verification
//! Mission: Hash passwords at rest and check login credentials without leaking which part was wrong

use crate::auth::{
    account_store::{AccountStore, StoreError},
    models::Account,
};
use bcrypt::{hash, verify, BcryptError};
use std::sync::Arc;
use tracing::{debug, warn};

/// Hash a plaintext password with a fresh salt.
pub fn hash_password(password: &str, cost: u32) -> Result<String, BcryptError> {
    hash(password, cost)
}

/// Constant-time check of a plaintext password against a stored hash.
/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match verify(password, password_hash) {
        Ok(valid) => valid,
        Err(e) => {
            warn!("Stored password hash could not be verified: {}", e);
            false
        }
    }
}

/// Hash on the blocking pool so bcrypt's work factor never stalls a runtime worker.
pub async fn hash_password_blocking(password: &str, cost: u32) -> Result<String, StoreError> {
    let hashed = tokio::task::spawn_blocking({
        let password = password.to_string();
        move || hash_password(&password, cost)
    })
    .await
    .map_err(|e| StoreError::Backend(format!("password hashing task failed: {}", e)))?;

    Ok(hashed?)
}

/// [`verify_password`] on the blocking pool. A failed task counts as a mismatch.
pub async fn verify_password_blocking(password: &str, password_hash: &str) -> bool {
    let result = tokio::task::spawn_blocking({
        let password = password.to_string();
        let password_hash = password_hash.to_string();
        move || verify_password(&password, &password_hash)
    })
    .await;

    match result {
        Ok(valid) => valid,
        Err(e) => {
            warn!("Password verification task failed: {}", e);
            false
        }
    }
}

/// Looks accounts up by email and verifies their password.
pub struct CredentialVerifier {
    store: Arc<dyn AccountStore>,
    // Verified against when the email is unknown so both failure paths cost the same.
    dummy_hash: String,
}

impl CredentialVerifier {
    pub fn new(store: Arc<dyn AccountStore>, cost: u32) -> Result<Self, BcryptError> {
        let dummy_hash = hash_password("not-a-real-password", cost)?;
        Ok(Self { store, dummy_hash })
    }

    /// Returns the account when email and password match, `None` otherwise.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<Account>, StoreError> {
        match self.store.find_by_email(email).await? {
            Some(account) => {
                if verify_password_blocking(password, &account.password_hash).await {
                    debug!("Credentials accepted for account {}", account.id);
                    Ok(Some(account))
                } else {
                    Ok(None)
                }
            }
            None => {
                let _ = verify_password_blocking(password, &self.dummy_hash).await;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{
        account_store::NewAccount, memory_store::InMemoryAccountStore, models::Role,
    };

    const TEST_COST: u32 = 4;

    async fn verifier_with_account() -> CredentialVerifier {
        let store = Arc::new(InMemoryAccountStore::new().with_hash_cost(TEST_COST));
        store
            .create(NewAccount {
                email: "a@x.com".to_string(),
                password: "pw1".to_string(),
                role: Role::User,
                ..Default::default()
            })
            .await
            .unwrap();
        CredentialVerifier::new(store, TEST_COST).unwrap()
    }

    #[test]
    fn test_hash_is_salted_and_verifiable() {
        let first = hash_password("secret", TEST_COST).unwrap();
        let second = hash_password("secret", TEST_COST).unwrap();

        assert_ne!(first, "secret");
        assert_ne!(first, second);
        assert!(verify_password("secret", &first));
        assert!(verify_password("secret", &second));
        assert!(!verify_password("Secret", &first));
    }

    #[test]
    fn test_garbage_hash_is_a_mismatch() {
        assert!(!verify_password("secret", "not-a-bcrypt-hash"));
    }

    #[tokio::test]
    async fn test_blocking_pool_helpers_agree_with_sync_ones() {
        let hashed = hash_password_blocking("   ", TEST_COST).await.unwrap();

        assert!(verify_password_blocking("   ", &hashed).await);
        assert!(!verify_password_blocking("  ", &hashed).await);
        assert!(!verify_password_blocking("   ", "not-a-bcrypt-hash").await);
    }

    #[tokio::test]
    async fn test_authenticate_matches_normalized_email() {
        let verifier = verifier_with_account().await;

        let account = verifier.authenticate(" A@X.com", "pw1").await.unwrap();
        assert_eq!(account.unwrap().email, "a@x.com");
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email_look_the_same() {
        let verifier = verifier_with_account().await;

        let wrong_password = verifier.authenticate("a@x.com", "PW1").await.unwrap();
        let unknown_email = verifier.authenticate("b@x.com", "pw1").await.unwrap();

        assert!(wrong_password.is_none());
        assert!(unknown_email.is_none());
    }
}
