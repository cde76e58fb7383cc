use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{PasswordResetToken, TokenStats};
use crate::db::StoreError;

#[async_trait]
pub trait ResetTokenRepo: Send + Sync {
    async fn create(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> Result<PasswordResetToken, StoreError>;
    /// Unused token with `expires_at > now`.
    async fn find_active(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<Option<PasswordResetToken>, StoreError>;
    /// Flips `used` false → true. `None` when the token is missing or already used.
    async fn mark_used(&self, token: &str) -> Result<Option<PasswordResetToken>, StoreError>;
    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64, StoreError>;
    async fn delete_expired(&self, now: OffsetDateTime) -> Result<u64, StoreError>;
    async fn delete_used_or_expired(&self, now: OffsetDateTime) -> Result<u64, StoreError>;
    async fn stats(&self, now: OffsetDateTime) -> Result<TokenStats, StoreError>;
}

#[async_trait]
pub trait RevokedTokenRepo: Send + Sync {
    /// Insert or refresh the denylist entry for `token`.
    async fn revoke(&self, token: &str, expires_at: OffsetDateTime) -> Result<(), StoreError>;
    async fn is_revoked(&self, token: &str, now: OffsetDateTime) -> Result<bool, StoreError>;
    async fn delete_expired(&self, now: OffsetDateTime) -> Result<u64, StoreError>;
}

const RESET_COLUMNS: &str = "id, user_id, token, expires_at, used, created_at";

#[derive(Clone)]
pub struct PgResetTokenRepo {
    db: PgPool,
}

impl PgResetTokenRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ResetTokenRepo for PgResetTokenRepo {
    async fn create(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> Result<PasswordResetToken, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO password_reset_tokens (user_id, token, expires_at)
            VALUES ($1, $2, $3)
            RETURNING {RESET_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, PasswordResetToken>(&sql)
            .bind(user_id)
            .bind(token)
            .bind(expires_at)
            .fetch_one(&self.db)
            .await?;
        Ok(row)
    }

    async fn find_active(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<Option<PasswordResetToken>, StoreError> {
        let sql = format!(
            r#"
            SELECT {RESET_COLUMNS}
              FROM password_reset_tokens
             WHERE token = $1 AND used = FALSE AND expires_at > $2
            "#
        );
        let row = sqlx::query_as::<_, PasswordResetToken>(&sql)
            .bind(token)
            .bind(now)
            .fetch_optional(&self.db)
            .await?;
        Ok(row)
    }

    async fn mark_used(&self, token: &str) -> Result<Option<PasswordResetToken>, StoreError> {
        let sql = format!(
            r#"
            UPDATE password_reset_tokens
               SET used = TRUE
             WHERE token = $1 AND used = FALSE
            RETURNING {RESET_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, PasswordResetToken>(&sql)
            .bind(token)
            .fetch_optional(&self.db)
            .await?;
        Ok(row)
    }

    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query(r#"DELETE FROM password_reset_tokens WHERE user_id = $1"#)
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_expired(&self, now: OffsetDateTime) -> Result<u64, StoreError> {
        let result = sqlx::query(r#"DELETE FROM password_reset_tokens WHERE expires_at < $1"#)
            .bind(now)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_used_or_expired(&self, now: OffsetDateTime) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"DELETE FROM password_reset_tokens WHERE used = TRUE OR expires_at < $1"#,
        )
        .bind(now)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected())
    }

    async fn stats(&self, now: OffsetDateTime) -> Result<TokenStats, StoreError> {
        let stats = sqlx::query_as::<_, TokenStats>(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE used = FALSE AND expires_at > $1) AS active,
                   COUNT(*) FILTER (WHERE used = TRUE) AS used,
                   COUNT(*) FILTER (WHERE expires_at < $1) AS expired
              FROM password_reset_tokens
            "#,
        )
        .bind(now)
        .fetch_one(&self.db)
        .await?;
        Ok(stats)
    }
}

#[derive(Clone)]
pub struct PgRevokedTokenRepo {
    db: PgPool,
}

impl PgRevokedTokenRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RevokedTokenRepo for PgRevokedTokenRepo {
    async fn revoke(&self, token: &str, expires_at: OffsetDateTime) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO revoked_tokens (token, expires_at)
            VALUES ($1, $2)
            ON CONFLICT (token) DO UPDATE SET expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(token)
        .bind(expires_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn is_revoked(&self, token: &str, now: OffsetDateTime) -> Result<bool, StoreError> {
        let revoked: bool = sqlx::query_scalar(
            r#"SELECT EXISTS (SELECT 1 FROM revoked_tokens WHERE token = $1 AND expires_at > $2)"#,
        )
        .bind(token)
        .bind(now)
        .fetch_one(&self.db)
        .await?;
        Ok(revoked)
    }

    async fn delete_expired(&self, now: OffsetDateTime) -> Result<u64, StoreError> {
        let result = sqlx::query(r#"DELETE FROM revoked_tokens WHERE expires_at < $1"#)
            .bind(now)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }
}
