use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum_macros::AsRefStr;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Validate, Deserialize, Serialize)]
pub struct SignupRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
}

#[derive(Debug, Validate, Deserialize, Serialize)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct VerifyRegistrationRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Validate, Deserialize, Serialize)]
pub struct RequestCodeRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CodeLoginRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Validate, Deserialize, Serialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    #[validate(length(min = 8))]
    pub new_password: String,
}

#[derive(Debug, Validate, Deserialize, Serialize)]
pub struct RequestPasswordResetRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Validate, Deserialize, Serialize)]
pub struct ResetPasswordRequest {
    pub token: Uuid,
    #[validate(length(min = 8))]
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateSessionRequest {
    pub category: String,
    pub duration_seconds: i32,
    pub time: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SessionQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub category: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UpsertGoalRequest {
    pub category: String,
    pub goal_time_per_week_seconds: i32,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateCategoryRequest {
    pub category: String,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct StatsQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct GraphQuery {
    pub time_range: TimeRange,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    Week,
    Month,
    #[serde(rename = "6month")]
    SixMonth,
    Ytd,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct FocusSession {
    pub time: DateTime<Utc>,
    pub duration_seconds: i32,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct FocusGoal {
    pub category: String,
    pub goal_time_per_week_seconds: i32,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Category {
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub category: String,
    pub total_time_seconds: i64,
    pub session_count: i64,
    pub average_time_seconds: f64,
    pub goal_time_per_week_seconds: Option<i32>,
    pub progress_percentage: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStats {
    pub email: String,
    pub total_focus_time_seconds: i64,
    pub total_sessions: i64,
    pub categories: Vec<CategoryStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDataPoint {
    pub date: String,
    pub focus_time_seconds: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphData {
    pub data_points: Vec<GraphDataPoint>,
    pub time_range: TimeRange,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct StartTimerRequest {
    pub category: String,
    pub mode: StartMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StartMode {
    Stopwatch,
    Pomodoro {
        work_minutes: u32,
        break_minutes: u32,
        cycles: u32,
    },
}

#[derive(Debug, Clone, Copy, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ClientEvent {
    Start,
    Pause,
    Resume,
    Reset,
    Save,
    State,
}

#[derive(Debug, Clone, Copy, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ServiceEvent {
    Timer,
    Tick,
    WorkComplete,
    BreakComplete,
    AllComplete,
    Saved,
    ServiceError,
}
