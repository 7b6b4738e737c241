use chrono::{DateTime, Utc};
use eyre::Result;
use sqlx::types::Uuid;
use sqlx::PgPool;

use types::domain::FocusSession;
use types::error::Error;

use crate::domain::stats::{CategoryTotals, SessionPoint};

#[cfg_attr(test, faux::create)]
#[derive(Clone)]
pub struct FocusSessionRepository {
    pool: PgPool,
}

#[cfg_attr(test, faux::methods)]
impl FocusSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        FocusSessionRepository { pool }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        time: DateTime<Utc>,
        duration_seconds: i32,
        category: String,
    ) -> Result<FocusSession> {
        sqlx::query_as(
            r#"
            INSERT INTO focus_sessions (user_id, time, duration_seconds, category)
            VALUES ($1, $2, $3, $4)
            RETURNING time, duration_seconds, category
            "#,
        )
        .bind(user_id)
        .bind(time)
        .bind(duration_seconds)
        .bind(category)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                eyre::Report::new(Error::SessionTimeConflict)
            }
            _ => e.into(),
        })
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        category: Option<String>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<FocusSession>> {
        sqlx::query_as(
            r#"
            SELECT time, duration_seconds, category FROM focus_sessions
            WHERE user_id = $1
              AND ($2::varchar IS NULL OR category = $2)
              AND ($3::timestamptz IS NULL OR time >= $3)
              AND ($4::timestamptz IS NULL OR time <= $4)
            ORDER BY time DESC
            OFFSET $5 LIMIT $6
            "#,
        )
        .bind(user_id)
        .bind(category)
        .bind(start)
        .bind(end)
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    pub async fn delete(&self, user_id: Uuid, time: DateTime<Utc>) -> Result<u64> {
        sqlx::query(
            r#"
            DELETE FROM focus_sessions
            WHERE user_id = $1 AND time = $2
            "#,
        )
        .bind(user_id)
        .bind(time)
        .execute(&self.pool)
        .await
        .map(|result| result.rows_affected())
        .map_err(Into::into)
    }

    pub async fn category_totals(
        &self,
        user_id: Uuid,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<CategoryTotals>> {
        sqlx::query_as(
            r#"
            SELECT category,
                   COALESCE(SUM(duration_seconds), 0)::BIGINT AS total_time_seconds,
                   COUNT(*)::BIGINT AS session_count,
                   COALESCE(AVG(duration_seconds), 0)::DOUBLE PRECISION AS average_time_seconds
            FROM focus_sessions
            WHERE user_id = $1
              AND ($2::timestamptz IS NULL OR time >= $2)
              AND ($3::timestamptz IS NULL OR time <= $3)
            GROUP BY category
            ORDER BY category
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    pub async fn points_between(
        &self,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        category: Option<String>,
    ) -> Result<Vec<SessionPoint>> {
        sqlx::query_as(
            r#"
            SELECT time, duration_seconds FROM focus_sessions
            WHERE user_id = $1 AND time >= $2 AND time < $3
              AND ($4::varchar IS NULL OR category = $4)
            ORDER BY time
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .bind(category)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }
}
