use eyre::Result;
use sqlx::types::Uuid;
use sqlx::{PgPool, Row};

use crate::domain::auth::AuthUser;

#[cfg_attr(test, faux::create)]
#[derive(Clone)]
pub struct AuthUserRepository {
    pool: PgPool,
}

#[cfg_attr(test, faux::methods)]
impl AuthUserRepository {
    pub fn new(pool: PgPool) -> Self {
        AuthUserRepository { pool }
    }

    pub async fn create_user(&self, email: String, hashed_password: String) -> Result<AuthUser> {
        sqlx::query_as(
            r#"
            INSERT INTO users (id, email, hashed_password)
            VALUES ($1, $2, $3) RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<AuthUser>> {
        sqlx::query_as(
            r#"
            SELECT * FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }

    pub async fn get_by_email(&self, email: String) -> Result<Option<AuthUser>> {
        sqlx::query_as(
            r#"
            SELECT * FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }

    pub async fn exists(&self, email: String) -> Result<bool> {
        sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users
                WHERE email = $1
            )
            "#,
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map(|row| row.get(0))
        .map_err(Into::into)
    }

    pub async fn count(&self) -> Result<i64> {
        sqlx::query(
            r#"
            SELECT COUNT(*) FROM users
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map(|row| row.get(0))
        .map_err(Into::into)
    }

    pub async fn update_token(&self, user_id: Uuid, token: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET session_token = $1
            WHERE id = $2
            "#,
        )
        .bind(token)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_by_session_token(&self, token: Uuid) -> Result<Option<AuthUser>> {
        sqlx::query_as(
            r#"
            SELECT * FROM users
            WHERE session_token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }

    pub async fn update_password(&self, user_id: Uuid, hashed_password: String) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET hashed_password = $1, updated_at = now()
            WHERE id = $2
            "#,
        )
        .bind(hashed_password)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn update_password_by_email(
        &self,
        email: String,
        hashed_password: String,
    ) -> Result<u64> {
        sqlx::query(
            r#"
            UPDATE users
            SET hashed_password = $1, updated_at = now()
            WHERE email = $2
            "#,
        )
        .bind(hashed_password)
        .bind(email)
        .execute(&self.pool)
        .await
        .map(|result| result.rows_affected())
        .map_err(Into::into)
    }

    pub async fn delete(&self, user_id: Uuid) -> Result<u64> {
        sqlx::query(
            r#"
            DELETE FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map(|result| result.rows_affected())
        .map_err(Into::into)
    }
}
