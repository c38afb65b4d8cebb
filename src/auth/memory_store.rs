//! In-memory account store, used by tests and ephemeral runs.

use crate::auth::{
    account_store::{
        build_account, validate_patch, AccountPatch, AccountStore, NewAccount, StoreError,
    },
    models::{normalize_email, Account},
};
use async_trait::async_trait;
use bcrypt::DEFAULT_COST;
use parking_lot::RwLock;

pub struct InMemoryAccountStore {
    // Insertion order doubles as creation order.
    accounts: RwLock<Vec<Account>>,
    hash_cost: u32,
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(Vec::new()),
            hash_cost: DEFAULT_COST,
        }
    }

    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn create(&self, new: NewAccount) -> Result<Account, StoreError> {
        let account = build_account(new, self.hash_cost).await?;

        let mut accounts = self.accounts.write();
        if accounts.iter().any(|a| a.email == account.email) {
            return Err(StoreError::DuplicateEmail);
        }
        accounts.push(account.clone());
        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let email = normalize_email(email);
        Ok(self.accounts.read().iter().find(|a| a.email == email).cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.read().iter().find(|a| a.id == id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Account>, StoreError> {
        Ok(self.accounts.read().clone())
    }

    async fn update(&self, id: &str, patch: AccountPatch) -> Result<Account, StoreError> {
        let patch = validate_patch(patch, self.hash_cost).await?;

        let mut accounts = self.accounts.write();
        let index = accounts
            .iter()
            .position(|a| a.id == id)
            .ok_or(StoreError::NotFound)?;

        // Work on a copy so a duplicate email leaves the record untouched.
        let mut updated = accounts[index].clone();
        patch.apply(&mut updated);

        if accounts
            .iter()
            .any(|a| a.id != updated.id && a.email == updated.email)
        {
            return Err(StoreError::DuplicateEmail);
        }

        accounts[index] = updated.clone();
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<Account, StoreError> {
        let mut accounts = self.accounts.write();
        let index = accounts
            .iter()
            .position(|a| a.id == id)
            .ok_or(StoreError::NotFound)?;
        Ok(accounts.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::Role;

    fn store() -> InMemoryAccountStore {
        InMemoryAccountStore::new().with_hash_cost(4)
    }

    fn new_account(email: &str) -> NewAccount {
        NewAccount {
            email: email.to_string(),
            password: "pw1".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_same_contract_as_sqlite() {
        let store = store();

        let account = store.create(new_account("a@x.com")).await.unwrap();
        assert_eq!(
            store.create(new_account(" A@X.COM")).await.unwrap_err(),
            StoreError::DuplicateEmail
        );

        let updated = store
            .update(
                &account.id,
                AccountPatch {
                    role: Some(Role::Admin),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.role, Role::Admin);
        assert_eq!(updated.created_at, account.created_at);

        store.delete(&account.id).await.unwrap();
        assert!(store.is_empty());
        assert_eq!(store.delete(&account.id).await.unwrap_err(), StoreError::NotFound);
    }

    #[tokio::test]
    async fn test_failed_update_leaves_record_untouched() {
        let store = store();
        let account = store.create(new_account("a@x.com")).await.unwrap();
        store.create(new_account("b@x.com")).await.unwrap();

        let result = store
            .update(
                &account.id,
                AccountPatch {
                    email: Some("b@x.com".to_string()),
                    first_name: Some("Ada".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert_eq!(result.unwrap_err(), StoreError::DuplicateEmail);

        let reloaded = store.find_by_id(&account.id).await.unwrap().unwrap();
        assert_eq!(reloaded, account);
        assert_eq!(store.len(), 2);
    }
}
