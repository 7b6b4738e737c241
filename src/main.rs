use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use eyre::Result;
use log::{debug, error, info};
use refinery::config::Config;
use socketioxide::extract::Extension as SocketExtension;
use socketioxide::extract::{Data, HttpExtension, SocketRef};
use socketioxide::SocketIo;
use sqlx::types::Uuid;
use sqlx::PgPool;
use tower_http::services::ServeDir;

use crate::extensions::ExtractUserFromToken;
use crate::repository::auth::AuthUserRepository;
use crate::repository::categories::CategoryRepository;
use crate::repository::goals::GoalRepository;
use crate::repository::sessions::FocusSessionRepository;
use crate::repository::timers::ActiveTimerRepository;
use crate::repository::verification::VerificationRepository;
use crate::routes::Api;
use crate::service::auth::AuthService;
use crate::service::stats::StatsService;
use crate::service::timer::{TimerService, TIMER_NAMESPACE};
use crate::service::tracking::TrackingService;
use types::domain::{
    ChangePasswordRequest, ClientEvent, CodeLoginRequest, CreateCategoryRequest,
    CreateSessionRequest, GraphQuery, LoginRequest, RequestCodeRequest, RequestPasswordResetRequest,
    ResetPasswordRequest, ServiceEvent, SessionQuery, SignupRequest, StartTimerRequest, StatsQuery,
    UpsertGoalRequest, VerifyRegistrationRequest,
};
use types::state::Timestamped;

mod domain;
mod extensions;
mod repository;
mod routes;
mod service;

refinery::embed_migrations!("migrations");

#[tokio::main]
async fn main() -> Result<()> {
    // setup log
    env_logger::init();
    info!("server starts with logging");

    // run migrations
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL is not set");
    let mut config = Config::from_str(&database_url)?;
    migrations::runner().run_async(&mut config).await?;
    let pool = PgPool::connect(&database_url).await?;

    // repositories
    let auth_repository = AuthUserRepository::new(pool.clone());
    let verification_repository = VerificationRepository::new(pool.clone());
    let session_repository = Arc::new(FocusSessionRepository::new(pool.clone()));
    let goal_repository = GoalRepository::new(pool.clone());
    let category_repository = Arc::new(CategoryRepository::new(pool.clone()));
    let timer_repository = ActiveTimerRepository::new();

    // setting up websocket
    let (socket_layer, io) = SocketIo::new_layer();
    io.ns(TIMER_NAMESPACE, timer_connection_handler);

    // services
    let auth_service = AuthService {
        auth_repository,
        verification_repository,
        category_repository: category_repository.clone(),
    };
    auth_service.purge_expired().await?;
    let tracking_service = TrackingService {
        session_repository: session_repository.clone(),
        goal_repository: goal_repository.clone(),
        category_repository: category_repository.clone(),
    };
    let stats_service = StatsService {
        session_repository: session_repository.clone(),
        goal_repository,
    };
    let timer_service = TimerService {
        timer_repository,
        session_repository,
        category_repository,
        io,
    };

    // API
    let api = Api {
        auth_service,
        tracking_service,
        stats_service,
        timer_service,
    };

    // routes
    let router = Router::new()
        .route("/health", get(health))
        .route("/signup", post(signup))
        .route("/verify", post(verify_registration))
        .route("/login", post(login))
        .route("/request-code", post(request_login_code))
        .route("/login-with-code", post(login_with_code))
        .route("/change-password", post(change_password))
        .route("/request-password-reset", post(request_password_reset))
        .route("/reset-password", post(reset_password))
        .route("/profile", get(get_profile))
        .route("/account", delete(delete_account))
        .route("/sessions", post(create_session))
        .route("/sessions", get(list_sessions))
        .route("/sessions/{timestamp}", delete(delete_session))
        .route("/goals", post(upsert_goal))
        .route("/goals", get(list_goals))
        .route("/goals/{category}", delete(delete_goal))
        .route("/categories", post(create_category))
        .route("/categories", get(list_categories))
        .route("/categories/{category}", delete(delete_category))
        .route("/stats", get(get_stats))
        .route("/stats/weekly", get(weekly_stats))
        .route("/graph", get(graph_data))
        .fallback_service(ServeDir::new("public"))
        .layer(socket_layer)
        .layer(Extension(api));

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
    axum::serve(listener, router).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    StatusCode::OK
}

async fn signup(
    Extension(api): Extension<Api>,
    Json(payload): Json<SignupRequest>,
) -> impl IntoResponse {
    match api.signup(payload).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => report_into_response(e).into_response(),
    }
}

async fn verify_registration(
    Extension(api): Extension<Api>,
    Json(payload): Json<VerifyRegistrationRequest>,
) -> impl IntoResponse {
    match api.verify_registration(payload).await {
        Ok(token) => (StatusCode::CREATED, token.to_string()).into_response(),
        Err(e) => report_into_response(e).into_response(),
    }
}

async fn login(
    Extension(api): Extension<Api>,
    Json(payload): Json<LoginRequest>,
) -> impl IntoResponse {
    match api.login(payload).await {
        Ok(token) => (StatusCode::OK, token.to_string()),
        Err(e) => report_into_response(e),
    }
}

async fn request_login_code(
    Extension(api): Extension<Api>,
    Json(payload): Json<RequestCodeRequest>,
) -> impl IntoResponse {
    match api.request_login_code(payload).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => report_into_response(e).into_response(),
    }
}

async fn login_with_code(
    Extension(api): Extension<Api>,
    Json(payload): Json<CodeLoginRequest>,
) -> impl IntoResponse {
    match api.login_with_code(payload).await {
        Ok(token) => (StatusCode::OK, token.to_string()),
        Err(e) => report_into_response(e),
    }
}

async fn change_password(
    ExtractUserFromToken(user_id): ExtractUserFromToken,
    Extension(api): Extension<Api>,
    Json(payload): Json<ChangePasswordRequest>,
) -> impl IntoResponse {
    match api.change_password(user_id, payload).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => report_into_response(e).into_response(),
    }
}

async fn request_password_reset(
    Extension(api): Extension<Api>,
    Json(payload): Json<RequestPasswordResetRequest>,
) -> impl IntoResponse {
    match api.request_password_reset(payload).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => report_into_response(e).into_response(),
    }
}

async fn reset_password(
    Extension(api): Extension<Api>,
    Json(payload): Json<ResetPasswordRequest>,
) -> impl IntoResponse {
    match api.reset_password(payload).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => report_into_response(e).into_response(),
    }
}

async fn get_profile(
    Extension(api): Extension<Api>,
    ExtractUserFromToken(user_id): ExtractUserFromToken,
) -> impl IntoResponse {
    match api.get_profile(user_id).await {
        Ok(Some(profile)) => (StatusCode::OK, Json(profile)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => report_into_response(e).into_response(),
    }
}

async fn delete_account(
    ExtractUserFromToken(user_id): ExtractUserFromToken,
    Extension(api): Extension<Api>,
) -> impl IntoResponse {
    match api.delete_account(user_id).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => report_into_response(e).into_response(),
    }
}

async fn create_session(
    ExtractUserFromToken(user_id): ExtractUserFromToken,
    Extension(api): Extension<Api>,
    Json(payload): Json<CreateSessionRequest>,
) -> impl IntoResponse {
    match api.create_session(user_id, payload).await {
        Ok(session) => (StatusCode::CREATED, Json(session)).into_response(),
        Err(e) => report_into_response(e).into_response(),
    }
}

async fn list_sessions(
    ExtractUserFromToken(user_id): ExtractUserFromToken,
    Extension(api): Extension<Api>,
    Query(query): Query<SessionQuery>,
) -> impl IntoResponse {
    match api.list_sessions(user_id, query).await {
        Ok(sessions) => (StatusCode::OK, Json(sessions)).into_response(),
        Err(e) => report_into_response(e).into_response(),
    }
}

async fn delete_session(
    ExtractUserFromToken(user_id): ExtractUserFromToken,
    Extension(api): Extension<Api>,
    Path(timestamp): Path<DateTime<Utc>>,
) -> impl IntoResponse {
    match api.delete_session(user_id, timestamp).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => report_into_response(e).into_response(),
    }
}

async fn upsert_goal(
    ExtractUserFromToken(user_id): ExtractUserFromToken,
    Extension(api): Extension<Api>,
    Json(payload): Json<UpsertGoalRequest>,
) -> impl IntoResponse {
    match api.upsert_goal(user_id, payload).await {
        Ok(goal) => (StatusCode::CREATED, Json(goal)).into_response(),
        Err(e) => report_into_response(e).into_response(),
    }
}

async fn list_goals(
    ExtractUserFromToken(user_id): ExtractUserFromToken,
    Extension(api): Extension<Api>,
) -> impl IntoResponse {
    match api.list_goals(user_id).await {
        Ok(goals) => (StatusCode::OK, Json(goals)).into_response(),
        Err(e) => report_into_response(e).into_response(),
    }
}

async fn delete_goal(
    ExtractUserFromToken(user_id): ExtractUserFromToken,
    Extension(api): Extension<Api>,
    Path(category): Path<String>,
) -> impl IntoResponse {
    match api.delete_goal(user_id, category).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => report_into_response(e).into_response(),
    }
}

async fn create_category(
    ExtractUserFromToken(user_id): ExtractUserFromToken,
    Extension(api): Extension<Api>,
    Json(payload): Json<CreateCategoryRequest>,
) -> impl IntoResponse {
    match api.create_category(user_id, payload).await {
        Ok(category) => (StatusCode::CREATED, Json(category)).into_response(),
        Err(e) => report_into_response(e).into_response(),
    }
}

async fn list_categories(
    ExtractUserFromToken(user_id): ExtractUserFromToken,
    Extension(api): Extension<Api>,
) -> impl IntoResponse {
    match api.list_categories(user_id).await {
        Ok(categories) => (StatusCode::OK, Json(categories)).into_response(),
        Err(e) => report_into_response(e).into_response(),
    }
}

async fn delete_category(
    ExtractUserFromToken(user_id): ExtractUserFromToken,
    Extension(api): Extension<Api>,
    Path(category): Path<String>,
) -> impl IntoResponse {
    match api.delete_category(user_id, category).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => report_into_response(e).into_response(),
    }
}

async fn get_stats(
    ExtractUserFromToken(user_id): ExtractUserFromToken,
    Extension(api): Extension<Api>,
    Query(query): Query<StatsQuery>,
) -> impl IntoResponse {
    match api.get_stats(user_id, query).await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => report_into_response(e).into_response(),
    }
}

async fn weekly_stats(
    ExtractUserFromToken(user_id): ExtractUserFromToken,
    Extension(api): Extension<Api>,
) -> impl IntoResponse {
    match api.weekly_stats(user_id).await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => report_into_response(e).into_response(),
    }
}

async fn graph_data(
    ExtractUserFromToken(user_id): ExtractUserFromToken,
    Extension(api): Extension<Api>,
    Query(query): Query<GraphQuery>,
) -> impl IntoResponse {
    match api.graph_data(user_id, query).await {
        Ok(data) => (StatusCode::OK, Json(data)).into_response(),
        Err(e) => report_into_response(e).into_response(),
    }
}

async fn on_start_timer(
    s: SocketRef,
    SocketExtension(user_id): SocketExtension<Uuid>,
    Data(request): Data<StartTimerRequest>,
    HttpExtension(api): HttpExtension<Api>,
) {
    match api.start_timer(user_id, request).await {
        Ok(state) => debug!("User {} started a {} timer", user_id, state.status),
        Err(e) => emit_service_error(&s, e),
    }
}

async fn on_pause_timer(
    s: SocketRef,
    SocketExtension(user_id): SocketExtension<Uuid>,
    HttpExtension(api): HttpExtension<Api>,
) {
    match api.pause_timer(user_id).await {
        Ok(_) => debug!("User {} paused their timer", user_id),
        Err(e) => emit_service_error(&s, e),
    }
}

async fn on_resume_timer(
    s: SocketRef,
    SocketExtension(user_id): SocketExtension<Uuid>,
    HttpExtension(api): HttpExtension<Api>,
) {
    match api.resume_timer(user_id).await {
        Ok(_) => debug!("User {} resumed their timer", user_id),
        Err(e) => emit_service_error(&s, e),
    }
}

async fn on_reset_timer(
    s: SocketRef,
    SocketExtension(user_id): SocketExtension<Uuid>,
    HttpExtension(api): HttpExtension<Api>,
) {
    match api.reset_timer(user_id).await {
        Ok(_) => debug!("User {} reset their timer", user_id),
        Err(e) => emit_service_error(&s, e),
    }
}

async fn on_save_timer(
    s: SocketRef,
    SocketExtension(user_id): SocketExtension<Uuid>,
    HttpExtension(api): HttpExtension<Api>,
) {
    match api.save_timer(user_id).await {
        Ok(session) => debug!(
            "User {} saved a session of {} seconds",
            user_id, session.duration_seconds
        ),
        Err(e) => emit_service_error(&s, e),
    }
}

async fn on_timer_state(
    s: SocketRef,
    SocketExtension(user_id): SocketExtension<Uuid>,
    HttpExtension(api): HttpExtension<Api>,
) {
    let state = api.timer_service.state(user_id);
    let _ = s.emit(ServiceEvent::Timer, &Timestamped::new(state));
}

async fn timer_connection_handler(
    s: SocketRef,
    Data(token): Data<Uuid>,
    HttpExtension(api): HttpExtension<Api>,
) {
    let user_id = match api.authenticate_token(token).await {
        Ok(user_id) => user_id,
        Err(e) => {
            debug!("timer socket rejected: {:?}", e);
            return;
        }
    };
    debug!("User {} connected to the timer channel", user_id);
    s.extensions.insert(user_id);
    s.join(user_id.to_string());
    s.on(ClientEvent::Start.as_ref().to_string(), on_start_timer);
    s.on(ClientEvent::Pause.as_ref().to_string(), on_pause_timer);
    s.on(ClientEvent::Resume.as_ref().to_string(), on_resume_timer);
    s.on(ClientEvent::Reset.as_ref().to_string(), on_reset_timer);
    s.on(ClientEvent::Save.as_ref().to_string(), on_save_timer);
    s.on(ClientEvent::State.as_ref().to_string(), on_timer_state);

    // replay the current machine so a reconnecting client picks up
    // where it left off
    let state = api.timer_service.state(user_id);
    let _ = s.emit(ServiceEvent::Timer, &Timestamped::new(state));
}

fn emit_service_error(s: &SocketRef, e: eyre::Report) {
    let (_, message) = report_into_response(e);
    let _ = s.emit(ServiceEvent::ServiceError, &message);
}

fn report_into_response(e: eyre::Report) -> (StatusCode, String) {
    error!("Error occurred: {:?}", e);
    match e.downcast::<types::error::Error>() {
        Ok(error) => error.into_response_tuple(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "".to_string()),
    }
}
