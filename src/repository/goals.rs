use eyre::Result;
use sqlx::types::Uuid;
use sqlx::PgPool;

use types::domain::FocusGoal;

#[cfg_attr(test, faux::create)]
#[derive(Clone)]
pub struct GoalRepository {
    pool: PgPool,
}

#[cfg_attr(test, faux::methods)]
impl GoalRepository {
    pub fn new(pool: PgPool) -> Self {
        GoalRepository { pool }
    }

    pub async fn upsert(
        &self,
        user_id: Uuid,
        category: String,
        goal_time_per_week_seconds: i32,
    ) -> Result<FocusGoal> {
        sqlx::query_as(
            r#"
            INSERT INTO focus_goals (user_id, category, goal_time_per_week_seconds)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, category) DO UPDATE
            SET goal_time_per_week_seconds = $3
            RETURNING category, goal_time_per_week_seconds
            "#,
        )
        .bind(user_id)
        .bind(category)
        .bind(goal_time_per_week_seconds)
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<FocusGoal>> {
        sqlx::query_as(
            r#"
            SELECT category, goal_time_per_week_seconds FROM focus_goals
            WHERE user_id = $1
            ORDER BY category
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    pub async fn delete(&self, user_id: Uuid, category: String) -> Result<u64> {
        sqlx::query(
            r#"
            DELETE FROM focus_goals
            WHERE user_id = $1 AND category = $2
            "#,
        )
        .bind(user_id)
        .bind(category)
        .execute(&self.pool)
        .await
        .map(|result| result.rows_affected())
        .map_err(Into::into)
    }
}
