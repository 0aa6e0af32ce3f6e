use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::password::{hash_password, verify_against_dummy, verify_password};
use super::{Account, IdentityDirectory};
use crate::error::{IdentityError, Result};

#[derive(Debug, Clone)]
struct Entry {
    account: Account,
    password_hash: Option<String>,
}

/// Directory held in process memory, for tests and local development
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account that can log in with `password`
    pub async fn add_user(
        &self,
        username: &str,
        password: &str,
        authorities: &[&str],
    ) -> Result<Account> {
        let password_hash = hash_password(password)?;
        let account = Account {
            subject: username.to_string(),
            authorities: authorities.iter().map(|a| a.to_string()).collect(),
            enabled: true,
        };
        self.entries.write().await.insert(
            username.to_string(),
            Entry {
                account: account.clone(),
                password_hash: Some(password_hash),
            },
        );
        Ok(account)
    }

    /// Register an account without credentials (lookup only)
    pub async fn add_account(&self, account: Account) {
        self.entries.write().await.insert(
            account.subject.clone(),
            Entry {
                account,
                password_hash: None,
            },
        );
    }

    pub async fn set_enabled(&self, subject: &str, enabled: bool) {
        if let Some(entry) = self.entries.write().await.get_mut(subject) {
            entry.account.enabled = enabled;
        }
    }

    pub async fn remove(&self, subject: &str) {
        self.entries.write().await.remove(subject);
    }
}

#[async_trait]
impl IdentityDirectory for InMemoryDirectory {
    async fn lookup(&self, subject: &str) -> Result<Option<Account>> {
        Ok(self
            .entries
            .read()
            .await
            .get(subject)
            .map(|entry| entry.account.clone()))
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<Account> {
        let entry = self.entries.read().await.get(username).cloned();
        let (account, hash) = match entry {
            Some(Entry {
                account,
                password_hash: Some(hash),
            }) => (account, hash),
            _ => {
                verify_against_dummy(password);
                return Err(IdentityError::InvalidCredentials);
            }
        };

        if !verify_password(password, &hash)? || !account.enabled {
            return Err(IdentityError::InvalidCredentials);
        }
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_authenticate() {
        let directory = InMemoryDirectory::new();
        directory
            .add_user("alice", "wonderland", &["ROLE_USER"])
            .await
            .unwrap();

        let account = directory.authenticate("alice", "wonderland").await.unwrap();
        assert_eq!(account.authorities, vec!["ROLE_USER".to_string()]);

        assert!(matches!(
            directory.authenticate("alice", "looking-glass").await,
            Err(IdentityError::InvalidCredentials)
        ));
        assert!(matches!(
            directory.authenticate("mallory", "wonderland").await,
            Err(IdentityError::InvalidCredentials)
        ));

        directory.set_enabled("alice", false).await;
        assert!(matches!(
            directory.authenticate("alice", "wonderland").await,
            Err(IdentityError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_unknown_user_costs_a_verification() {
        use std::time::Instant;

        let directory = InMemoryDirectory::new();
        directory
            .add_user("alice", "wonderland", &["ROLE_USER"])
            .await
            .unwrap();

        let started = Instant::now();
        let _ = directory.authenticate("alice", "looking-glass").await;
        let known = started.elapsed();

        let started = Instant::now();
        let _ = directory.authenticate("mallory", "looking-glass").await;
        let unknown = started.elapsed();

        assert!(unknown * 4 >= known, "unknown={:?} known={:?}", unknown, known);
    }

    #[tokio::test]
    async fn test_lookup_without_credentials() {
        let directory = InMemoryDirectory::new();
        directory
            .add_account(Account {
                subject: "svc".to_string(),
                authorities: vec![],
                enabled: true,
            })
            .await;

        assert!(directory.lookup("svc").await.unwrap().is_some());
        assert!(directory.lookup("nobody").await.unwrap().is_none());
        assert!(directory.authenticate("svc", "").await.is_err());
    }
}
