//! PostgreSQL revocation store backed by the `auth_tokens` table

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crypto_core::jwt::TokenKind;
use sqlx::{Executor, FromRow, PgPool, Postgres, Transaction};
use tracing::{debug, warn};

use crate::model::TokenRecord;
use crate::store::{RevocationStore, StoreError, StoreResult};

const SCHEMA: &str = include_str!("../migrations/0001_create_auth_tokens.sql");

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, FromRow)]
struct TokenRow {
    id: String,
    subject: String,
    token_kind: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    revoked: bool,
}

impl TryFrom<TokenRow> for TokenRecord {
    type Error = StoreError;

    fn try_from(row: TokenRow) -> Result<Self, Self::Error> {
        let kind: TokenKind = row.token_kind.parse().map_err(|_| {
            StoreError::Unavailable(format!("unknown token_kind in row {}", row.id))
        })?;
        Ok(TokenRecord {
            id: row.id,
            subject: row.subject,
            kind,
            issued_at: row.issued_at,
            expires_at: row.expires_at,
            revoked: row.revoked,
        })
    }
}

fn map_sqlx_error(err: sqlx::Error, id: Option<&str>) -> StoreError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return StoreError::DuplicateId(id.unwrap_or_default().to_string());
        }
    }
    warn!(error = %err, "auth_tokens query failed");
    StoreError::Unavailable(err.to_string())
}

#[derive(Clone)]
pub struct PgRevocationStore {
    pool: PgPool,
}

impl PgRevocationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `auth_tokens` table, indexes and trigger if missing
    pub async fn migrate(pool: &PgPool) -> StoreResult<()> {
        // unprepared execution so the multi-statement script runs as-is
        pool.execute(SCHEMA)
            .await
            .map_err(|e| map_sqlx_error(e, None))?;
        Ok(())
    }

    async fn insert_all(
        tx: &mut Transaction<'_, Postgres>,
        records: &[TokenRecord],
    ) -> StoreResult<()> {
        for record in records {
            sqlx::query(
                r#"
                INSERT INTO auth_tokens (id, subject, token_kind, issued_at, expires_at, revoked)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(&record.id)
            .bind(&record.subject)
            .bind(record.kind.as_str())
            .bind(record.issued_at)
            .bind(record.expires_at)
            .bind(record.revoked)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error(e, Some(&record.id)))?;
        }
        Ok(())
    }
}

#[async_trait]
impl RevocationStore for PgRevocationStore {
    async fn put(&self, record: TokenRecord) -> StoreResult<()> {
        self.put_many(vec![record]).await
    }

    async fn put_many(&self, records: Vec<TokenRecord>) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error(e, None))?;
        Self::insert_all(&mut tx, &records).await?;
        tx.commit().await.map_err(|e| map_sqlx_error(e, None))?;
        Ok(())
    }

    async fn get(&self, id: &str) -> StoreResult<Option<TokenRecord>> {
        let row = sqlx::query_as::<_, TokenRow>(
            r#"
            SELECT id, subject, token_kind, issued_at, expires_at, revoked
            FROM auth_tokens
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, Some(id)))?;

        row.map(TokenRecord::try_from).transpose()
    }

    async fn is_live(&self, id: &str, expected_expiration: DateTime<Utc>) -> StoreResult<bool> {
        let live = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM auth_tokens
                WHERE id = $1
                  AND revoked = FALSE
                  AND expires_at = $2
                  AND expires_at > $3
            )
            "#,
        )
        .bind(id)
        .bind(expected_expiration)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, Some(id)))?;

        Ok(live)
    }

    async fn revoke(&self, id: &str) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE auth_tokens
            SET revoked = TRUE, revoked_at = $2
            WHERE id = $1 AND revoked = FALSE
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, Some(id)))?;

        if result.rows_affected() == 0 {
            debug!(token_id = %id, "revoke changed nothing");
        }
        Ok(())
    }

    async fn revoke_all_for_subject(&self, subject: &str) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE auth_tokens
            SET revoked = TRUE, revoked_at = $2
            WHERE subject = $1 AND revoked = FALSE
            "#,
        )
        .bind(subject)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, None))?;

        Ok(result.rows_affected())
    }

    async fn rotate(&self, old_id: &str, replacements: Vec<TokenRecord>) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error(e, None))?;
        let now = Utc::now();

        // Row lock makes a concurrent rotation of the same id wait, then see revoked = TRUE
        let consumed = sqlx::query(
            r#"
            UPDATE auth_tokens
            SET revoked = TRUE, revoked_at = $2
            WHERE id = $1 AND revoked = FALSE AND expires_at > $2
            "#,
        )
        .bind(old_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error(e, Some(old_id)))?;

        if consumed.rows_affected() == 0 {
            tx.rollback().await.map_err(|e| map_sqlx_error(e, None))?;
            return Err(StoreError::NotLive(old_id.to_string()));
        }

        Self::insert_all(&mut tx, &replacements).await?;
        tx.commit().await.map_err(|e| map_sqlx_error(e, None))?;
        Ok(())
    }

    async fn live_for_subject(&self, subject: &str) -> StoreResult<Vec<TokenRecord>> {
        let rows = sqlx::query_as::<_, TokenRow>(
            r#"
            SELECT id, subject, token_kind, issued_at, expires_at, revoked
            FROM auth_tokens
            WHERE subject = $1 AND revoked = FALSE AND expires_at > $2
            ORDER BY issued_at ASC, id ASC
            "#,
        )
        .bind(subject)
        .bind(Utc::now())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, None))?;

        rows.into_iter().map(TokenRecord::try_from).collect()
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM auth_tokens
            WHERE expires_at <= $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, None))?;

        Ok(result.rows_affected())
    }
}
