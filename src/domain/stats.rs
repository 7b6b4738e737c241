use sqlx::types::chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct CategoryTotals {
    pub category: String,
    pub total_time_seconds: i64,
    pub session_count: i64,
    pub average_time_seconds: f64,
}

#[derive(Debug, Clone, FromRow)]
pub struct SessionPoint {
    pub time: DateTime<Utc>,
    pub duration_seconds: i32,
}
