use axum::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Either email format is invalid or password length is less than 8")]
    InvalidEmailOrPassword,
    #[error("Email already exists")]
    EmailAlreadyExists,
    #[error("Account limit reached, registration is currently unavailable")]
    AccountLimitReached,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Invalid or expired verification code")]
    InvalidVerificationCode,
    #[error("Invalid or expired reset token")]
    InvalidResetToken,
    #[error("User not found")]
    UserNotFound,
    #[error("A focus session already exists at this time")]
    SessionTimeConflict,
    #[error("Focus session not found")]
    SessionNotFound,
    #[error("Focus time must be at least 1 second")]
    InvalidFocusTime,
    #[error("Weekly goal must be between 1 second and 168 hours")]
    GoalOutOfRange,
    #[error("Focus goal not found")]
    GoalNotFound,
    #[error("Category already exists")]
    CategoryAlreadyExists,
    #[error("Category not found")]
    CategoryNotFound,
    #[error("Category name must not be empty")]
    EmptyCategory,
    #[error("Work, break and cycle counts must all be at least 1")]
    InvalidTimerSettings,
    #[error("A timer is already running")]
    TimerAlreadyRunning,
    #[error("No active timer")]
    NoActiveTimer,
    #[error("Timer is not running")]
    TimerNotRunning,
    #[error("Timer is not paused")]
    TimerNotPaused,
    #[error("Timer must run for at least 1 second before saving")]
    NothingToSave,
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidEmailOrPassword => StatusCode::BAD_REQUEST,
            Error::EmailAlreadyExists => StatusCode::CONFLICT,
            Error::AccountLimitReached => StatusCode::FORBIDDEN,
            Error::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Error::InvalidVerificationCode => StatusCode::UNAUTHORIZED,
            Error::InvalidResetToken => StatusCode::UNAUTHORIZED,
            Error::UserNotFound => StatusCode::NOT_FOUND,
            Error::SessionTimeConflict => StatusCode::CONFLICT,
            Error::SessionNotFound => StatusCode::NOT_FOUND,
            Error::InvalidFocusTime => StatusCode::BAD_REQUEST,
            Error::GoalOutOfRange => StatusCode::BAD_REQUEST,
            Error::GoalNotFound => StatusCode::NOT_FOUND,
            Error::CategoryAlreadyExists => StatusCode::CONFLICT,
            Error::CategoryNotFound => StatusCode::NOT_FOUND,
            Error::EmptyCategory => StatusCode::BAD_REQUEST,
            Error::InvalidTimerSettings => StatusCode::BAD_REQUEST,
            Error::TimerAlreadyRunning => StatusCode::CONFLICT,
            Error::NoActiveTimer => StatusCode::NOT_FOUND,
            Error::TimerNotRunning => StatusCode::BAD_REQUEST,
            Error::TimerNotPaused => StatusCode::BAD_REQUEST,
            Error::NothingToSave => StatusCode::BAD_REQUEST,
        }
    }

    pub fn into_response_tuple(self) -> (StatusCode, String) {
        (self.status_code(), self.to_string())
    }
}
