use chrono::{DateTime, Utc};
use eyre::Result;
use sqlx::types::Uuid;
use sqlx::PgPool;

use crate::domain::auth::{PasswordResetToken, PendingRegistration, VerificationCode};

// pending registrations, login codes and reset tokens are all
// consumed with DELETE .. RETURNING so each can be used exactly once
#[cfg_attr(test, faux::create)]
#[derive(Clone)]
pub struct VerificationRepository {
    pool: PgPool,
}

#[cfg_attr(test, faux::methods)]
impl VerificationRepository {
    pub fn new(pool: PgPool) -> Self {
        VerificationRepository { pool }
    }

    pub async fn upsert_pending(
        &self,
        email: String,
        hashed_password: String,
        code: String,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pending_registrations (email, hashed_password, code, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE
            SET hashed_password = $2, code = $3, expires_at = $4
            "#,
        )
        .bind(email)
        .bind(hashed_password)
        .bind(code)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn take_pending(
        &self,
        email: String,
        code: String,
        now: DateTime<Utc>,
    ) -> Result<Option<PendingRegistration>> {
        sqlx::query_as(
            r#"
            DELETE FROM pending_registrations
            WHERE email = $1 AND code = $2 AND expires_at > $3
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(code)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }

    pub async fn upsert_login_code(
        &self,
        email: String,
        code: String,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO verification_codes (email, code, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO UPDATE
            SET code = $2, expires_at = $3
            "#,
        )
        .bind(email)
        .bind(code)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn take_login_code(
        &self,
        email: String,
        code: String,
        now: DateTime<Utc>,
    ) -> Result<Option<VerificationCode>> {
        sqlx::query_as(
            r#"
            DELETE FROM verification_codes
            WHERE email = $1 AND code = $2 AND expires_at > $3
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(code)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }

    pub async fn create_reset_token(
        &self,
        token: Uuid,
        email: String,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO password_reset_tokens (token, email, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(token)
        .bind(email)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn take_reset_token(
        &self,
        token: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<PasswordResetToken>> {
        sqlx::query_as(
            r#"
            DELETE FROM password_reset_tokens
            WHERE token = $1 AND expires_at > $2
            RETURNING *
            "#,
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }

    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<()> {
        sqlx::query("DELETE FROM pending_registrations WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM verification_codes WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM password_reset_tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
