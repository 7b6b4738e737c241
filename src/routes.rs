use chrono::{DateTime, Utc};
use eyre::{ContextCompat, Result};
use sqlx::types::Uuid;
use validator::Validate;

use types::domain::{
    Category, ChangePasswordRequest, CodeLoginRequest, CreateCategoryRequest, CreateSessionRequest,
    FocusGoal, FocusSession, GraphData, GraphQuery, LoginRequest, RequestCodeRequest,
    RequestPasswordResetRequest, ResetPasswordRequest, SessionQuery, SignupRequest, StatsQuery,
    StartTimerRequest, UpsertGoalRequest, UserProfile, UserStats, VerifyRegistrationRequest,
};
use types::error::Error;
use types::state::SharedTimerState;

use crate::service::auth::AuthService;
use crate::service::stats::StatsService;
use crate::service::timer::TimerService;
use crate::service::tracking::TrackingService;

#[derive(Clone)]
pub struct Api {
    pub auth_service: AuthService,
    pub tracking_service: TrackingService,
    pub stats_service: StatsService,
    pub timer_service: TimerService,
}

impl Api {
    pub async fn signup(&self, request: SignupRequest) -> Result<()> {
        request
            .validate()
            .map_err(|_| Error::InvalidEmailOrPassword)?;
        self.auth_service
            .register(request.email, request.password)
            .await
    }

    pub async fn verify_registration(&self, request: VerifyRegistrationRequest) -> Result<Uuid> {
        self.auth_service
            .verify_registration(request.email, request.code)
            .await
    }

    pub async fn login(&self, request: LoginRequest) -> Result<Uuid> {
        request
            .validate()
            .map_err(|_| Error::InvalidEmailOrPassword)?;
        self.auth_service
            .login(request.email, request.password)
            .await
    }

    pub async fn request_login_code(&self, request: RequestCodeRequest) -> Result<()> {
        request
            .validate()
            .map_err(|_| Error::InvalidEmailOrPassword)?;
        self.auth_service.request_login_code(request.email).await
    }

    pub async fn login_with_code(&self, request: CodeLoginRequest) -> Result<Uuid> {
        self.auth_service
            .login_with_code(request.email, request.code)
            .await
    }

    pub async fn change_password(&self, user_id: Uuid, request: ChangePasswordRequest) -> Result<()> {
        request
            .validate()
            .map_err(|_| Error::InvalidEmailOrPassword)?;
        self.auth_service
            .change_password(user_id, request.current_password, request.new_password)
            .await
    }

    pub async fn request_password_reset(&self, request: RequestPasswordResetRequest) -> Result<()> {
        request
            .validate()
            .map_err(|_| Error::InvalidEmailOrPassword)?;
        self.auth_service.request_password_reset(request.email).await
    }

    pub async fn reset_password(&self, request: ResetPasswordRequest) -> Result<()> {
        request
            .validate()
            .map_err(|_| Error::InvalidEmailOrPassword)?;
        self.auth_service
            .reset_password(request.token, request.new_password)
            .await
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>> {
        let user = self.auth_service.get(user_id).await?;
        Ok(user.map(|user| UserProfile {
            email: user.email,
            created_at: user.created_at,
        }))
    }

    pub async fn delete_account(&self, user_id: Uuid) -> Result<()> {
        // drop any running timer with the account
        self.timer_service.timer_repository.stop_ticker(user_id);
        let _ = self.timer_service.timer_repository.remove(user_id);
        self.auth_service.delete_account(user_id).await
    }

    pub async fn authenticate_token(&self, token: Uuid) -> Result<Uuid> {
        let user = self
            .auth_service
            .get_user_by_session_token(token)
            .await?
            .wrap_err(Error::InvalidCredentials)?;
        Ok(user.id)
    }

    pub async fn create_session(
        &self,
        user_id: Uuid,
        request: CreateSessionRequest,
    ) -> Result<FocusSession> {
        self.tracking_service
            .log_session(
                user_id,
                request.category,
                request.duration_seconds,
                request.time,
            )
            .await
    }

    pub async fn list_sessions(
        &self,
        user_id: Uuid,
        query: SessionQuery,
    ) -> Result<Vec<FocusSession>> {
        self.tracking_service.list_sessions(user_id, query).await
    }

    pub async fn delete_session(&self, user_id: Uuid, time: DateTime<Utc>) -> Result<()> {
        self.tracking_service.delete_session(user_id, time).await
    }

    pub async fn upsert_goal(&self, user_id: Uuid, request: UpsertGoalRequest) -> Result<FocusGoal> {
        self.tracking_service
            .upsert_goal(
                user_id,
                request.category,
                request.goal_time_per_week_seconds,
            )
            .await
    }

    pub async fn list_goals(&self, user_id: Uuid) -> Result<Vec<FocusGoal>> {
        self.tracking_service.list_goals(user_id).await
    }

    pub async fn delete_goal(&self, user_id: Uuid, category: String) -> Result<()> {
        self.tracking_service.delete_goal(user_id, category).await
    }

    pub async fn create_category(
        &self,
        user_id: Uuid,
        request: CreateCategoryRequest,
    ) -> Result<Category> {
        self.tracking_service
            .create_category(user_id, request.category)
            .await
    }

    pub async fn list_categories(&self, user_id: Uuid) -> Result<Vec<Category>> {
        self.tracking_service.list_categories(user_id).await
    }

    pub async fn delete_category(&self, user_id: Uuid, category: String) -> Result<()> {
        self.tracking_service
            .delete_category(user_id, category)
            .await
    }

    pub async fn get_stats(&self, user_id: Uuid, query: StatsQuery) -> Result<UserStats> {
        let user = self
            .auth_service
            .get(user_id)
            .await?
            .wrap_err(Error::UserNotFound)?;
        self.stats_service
            .stats(user_id, user.email, query.start, query.end)
            .await
    }

    pub async fn weekly_stats(&self, user_id: Uuid) -> Result<UserStats> {
        let user = self
            .auth_service
            .get(user_id)
            .await?
            .wrap_err(Error::UserNotFound)?;
        self.stats_service.weekly_stats(user_id, user.email).await
    }

    pub async fn graph_data(&self, user_id: Uuid, query: GraphQuery) -> Result<GraphData> {
        self.stats_service.graph_data(user_id, query).await
    }

    pub async fn start_timer(
        &self,
        user_id: Uuid,
        request: StartTimerRequest,
    ) -> Result<SharedTimerState> {
        self.timer_service.start(user_id, request).await
    }

    pub async fn pause_timer(&self, user_id: Uuid) -> Result<SharedTimerState> {
        self.timer_service.pause(user_id).await
    }

    pub async fn resume_timer(&self, user_id: Uuid) -> Result<SharedTimerState> {
        self.timer_service.resume(user_id).await
    }

    pub async fn reset_timer(&self, user_id: Uuid) -> Result<SharedTimerState> {
        self.timer_service.reset(user_id).await
    }

    pub async fn save_timer(&self, user_id: Uuid) -> Result<FocusSession> {
        self.timer_service.save(user_id).await
    }
}
