use std::str::FromStr;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Extension;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use log::debug;
use tap::TapFallible;
use uuid::Uuid;

use crate::routes::Api;

/// Resolves the bearer session token to the account that owns it;
/// every per-user route authenticates through this.
#[derive(Debug, Clone)]
pub struct ExtractUserFromToken(pub Uuid);

impl<S> FromRequestParts<S> for ExtractUserFromToken
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(req: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(req, state)
            .await
            .ok_or(StatusCode::UNAUTHORIZED)
            .tap_err(|_| debug!("request carried no usable bearer token"))?;
        let Extension(api) = Extension::<Api>::from_request_parts(req, state)
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        let user_id = api
            .authenticate_token(token)
            .await
            .tap_err(|e| debug!("session token rejected: {:?}", e))
            .map_err(|_| StatusCode::UNAUTHORIZED)?;
        Ok(ExtractUserFromToken(user_id))
    }
}

async fn bearer_token<S: Send + Sync>(req: &mut Parts, state: &S) -> Option<Uuid> {
    let TypedHeader(Authorization(bearer)) =
        TypedHeader::<Authorization<Bearer>>::from_request_parts(req, state)
            .await
            .ok()?;
    Uuid::from_str(bearer.token()).ok()
}
