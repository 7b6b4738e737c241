use std::sync::Arc;

use chrono::{DateTime, Utc};
use eyre::{ensure, Result};
use sqlx::types::Uuid;

use types::domain::{Category, FocusGoal, FocusSession, SessionQuery};
use types::error::Error;

use crate::repository::categories::CategoryRepository;
use crate::repository::goals::GoalRepository;
use crate::repository::sessions::FocusSessionRepository;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 500;
const MAX_GOAL_SECONDS: i32 = 604_800; // one week

#[derive(Clone)]
pub struct TrackingService {
    pub session_repository: Arc<FocusSessionRepository>,
    pub goal_repository: GoalRepository,
    pub category_repository: Arc<CategoryRepository>,
}

impl TrackingService {
    pub async fn log_session(
        &self,
        user_id: Uuid,
        category: String,
        duration_seconds: i32,
        time: Option<DateTime<Utc>>,
    ) -> Result<FocusSession> {
        let category = trimmed(category)?;
        ensure!(duration_seconds >= 1, Error::InvalidFocusTime);
        self.category_repository
            .ensure(user_id, category.clone())
            .await?;
        self.session_repository
            .create(
                user_id,
                time.unwrap_or_else(Utc::now),
                duration_seconds,
                category,
            )
            .await
    }

    pub async fn list_sessions(
        &self,
        user_id: Uuid,
        query: SessionQuery,
    ) -> Result<Vec<FocusSession>> {
        let skip = query.skip.unwrap_or(0).max(0);
        let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        self.session_repository
            .list(user_id, query.category, query.start, query.end, skip, limit)
            .await
    }

    pub async fn delete_session(&self, user_id: Uuid, time: DateTime<Utc>) -> Result<()> {
        let deleted = self.session_repository.delete(user_id, time).await?;
        ensure!(deleted > 0, Error::SessionNotFound);
        Ok(())
    }

    pub async fn upsert_goal(
        &self,
        user_id: Uuid,
        category: String,
        goal_time_per_week_seconds: i32,
    ) -> Result<FocusGoal> {
        let category = trimmed(category)?;
        ensure!(
            (1..=MAX_GOAL_SECONDS).contains(&goal_time_per_week_seconds),
            Error::GoalOutOfRange
        );
        self.goal_repository
            .upsert(user_id, category, goal_time_per_week_seconds)
            .await
    }

    pub async fn list_goals(&self, user_id: Uuid) -> Result<Vec<FocusGoal>> {
        self.goal_repository.list(user_id).await
    }

    pub async fn delete_goal(&self, user_id: Uuid, category: String) -> Result<()> {
        let deleted = self.goal_repository.delete(user_id, category).await?;
        ensure!(deleted > 0, Error::GoalNotFound);
        Ok(())
    }

    pub async fn create_category(&self, user_id: Uuid, category: String) -> Result<Category> {
        let category = trimmed(category)?;
        let inserted = self
            .category_repository
            .insert_new(user_id, category.clone())
            .await?;
        ensure!(inserted > 0, Error::CategoryAlreadyExists);
        Ok(Category { category })
    }

    pub async fn list_categories(&self, user_id: Uuid) -> Result<Vec<Category>> {
        self.category_repository.list(user_id).await
    }

    // the category's goal goes with it; sessions already logged under
    // the name stay, so history survives the deletion
    pub async fn delete_category(&self, user_id: Uuid, category: String) -> Result<()> {
        let deleted = self
            .category_repository
            .delete(user_id, category.clone())
            .await?;
        ensure!(deleted > 0, Error::CategoryNotFound);
        self.goal_repository.delete(user_id, category).await?;
        Ok(())
    }
}

// category names are compared case-sensitively, with surrounding
// whitespace stripped before any check
fn trimmed(category: String) -> Result<String> {
    let category = category.trim().to_string();
    ensure!(!category.is_empty(), Error::EmptyCategory);
    Ok(category)
}
