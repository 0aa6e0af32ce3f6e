//! Account directory on the `users` and `user_roles` tables

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::password::{hash_password, verify_against_dummy, verify_password};
use super::{Account, IdentityDirectory};
use crate::error::{IdentityError, Result};

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    password_hash: String,
    enabled: bool,
}

#[derive(Clone)]
pub struct PgIdentityDirectory {
    pool: PgPool,
}

impl PgIdentityDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a user with the given roles; used by seeding and tests
    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        roles: &[&str],
    ) -> Result<Account> {
        if username.trim().is_empty() {
            return Err(IdentityError::Validation("Username must not be empty".to_string()));
        }
        let password_hash = hash_password(password)?;
        let user_id = Uuid::new_v4();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (id, username, password_hash, enabled, created_at)
            VALUES ($1, $2, $3, TRUE, NOW())
            "#,
        )
        .bind(user_id)
        .bind(username)
        .bind(&password_hash)
        .execute(&mut *tx)
        .await?;

        for role in roles {
            sqlx::query("INSERT INTO user_roles (user_id, role) VALUES ($1, $2)")
                .bind(user_id)
                .bind(*role)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(Account {
            subject: username.to_string(),
            authorities: roles.iter().map(|r| r.to_string()).collect(),
            enabled: true,
        })
    }

    pub async fn set_enabled(&self, username: &str, enabled: bool) -> Result<()> {
        sqlx::query("UPDATE users SET enabled = $2 WHERE username = $1")
            .bind(username)
            .bind(enabled)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_user(&self, username: &str) -> Result<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password_hash, enabled FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn roles(&self, user_id: Uuid) -> Result<Vec<String>> {
        let roles = sqlx::query_scalar::<_, String>(
            "SELECT role FROM user_roles WHERE user_id = $1 ORDER BY role",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(roles)
    }

    async fn to_account(&self, row: UserRow) -> Result<Account> {
        Ok(Account {
            authorities: self.roles(row.id).await?,
            subject: row.username,
            enabled: row.enabled,
        })
    }
}

#[async_trait]
impl IdentityDirectory for PgIdentityDirectory {
    async fn lookup(&self, subject: &str) -> Result<Option<Account>> {
        match self.find_user(subject).await? {
            Some(row) => Ok(Some(self.to_account(row).await?)),
            None => Ok(None),
        }
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<Account> {
        let Some(row) = self.find_user(username).await? else {
            verify_against_dummy(password);
            return Err(IdentityError::InvalidCredentials);
        };

        if !verify_password(password, &row.password_hash)? || !row.enabled {
            return Err(IdentityError::InvalidCredentials);
        }
        self.to_account(row).await
    }
}
