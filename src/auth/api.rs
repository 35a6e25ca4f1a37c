//! Authentication API Endpoints
//! Mission: Provide login, token refresh and registration endpoints

use crate::app::AppState;
use crate::auth::{
    gate::Credentials,
    middleware::bearer_token,
    models::{AuthTokenResponse, LoginRequest, UserClaim},
    validation::validate_registration,
};
use crate::error::ApiError;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::LOCATION, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use tracing::info;

/// Login endpoint - POST /api/login
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthTokenResponse>, ApiError> {
    let credentials = payload.ok().and_then(|Json(body)| {
        Some(Credentials {
            username: body.username?,
            password: body.password?,
        })
    });

    let auth_token = state.gate.login(credentials).await?;

    Ok(Json(AuthTokenResponse { auth_token }))
}

/// Refresh endpoint - POST /api/login/refresh
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AuthTokenResponse>, ApiError> {
    let auth_token = state.gate.refresh(bearer_token(&headers))?;

    Ok(Json(AuthTokenResponse { auth_token }))
}

/// Registration endpoint - POST /api/users
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let body = payload.map(|Json(body)| body).unwrap_or(Value::Null);
    let registration = validate_registration(&body)?;

    let claim: UserClaim = state.gate.register(registration).await?;

    info!(user_id = %claim.id, username = %claim.username, "User registered");

    Ok((
        StatusCode::CREATED,
        [(LOCATION, format!("/api/users/{}", claim.id))],
        Json(claim),
    ))
}
