use eyre::Result;
use sqlx::types::Uuid;
use sqlx::PgPool;

use types::domain::Category;

// seeded for every new account; plain rows, not a closed set
pub const DEFAULT_CATEGORIES: [&str; 5] = ["Work", "Study", "Reading", "Exercise", "Meditation"];

#[cfg_attr(test, faux::create)]
#[derive(Clone)]
pub struct CategoryRepository {
    pool: PgPool,
}

#[cfg_attr(test, faux::methods)]
impl CategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        CategoryRepository { pool }
    }

    // returns 0 when the category already exists
    pub async fn insert_new(&self, user_id: Uuid, category: String) -> Result<u64> {
        sqlx::query(
            r#"
            INSERT INTO categories (user_id, category)
            VALUES ($1, $2)
            ON CONFLICT (user_id, category) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(category)
        .execute(&self.pool)
        .await
        .map(|result| result.rows_affected())
        .map_err(Into::into)
    }

    pub async fn ensure(&self, user_id: Uuid, category: String) -> Result<()> {
        self.insert_new(user_id, category).await?;
        Ok(())
    }

    pub async fn seed_defaults(&self, user_id: Uuid) -> Result<()> {
        for category in DEFAULT_CATEGORIES {
            self.ensure(user_id, category.to_string()).await?;
        }
        Ok(())
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Category>> {
        sqlx::query_as(
            r#"
            SELECT category FROM categories
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
            DELETE FROM categories
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
