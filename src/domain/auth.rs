use sqlx::types::chrono::{DateTime, Utc};
use sqlx::types::Uuid;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub hashed_password: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct PendingRegistration {
    pub email: String,
    pub hashed_password: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct VerificationCode {
    pub email: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct PasswordResetToken {
    pub email: String,
}
