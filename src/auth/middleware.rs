//! Authentication Middleware
//! Mission: Protect API endpoints with JWT validation

use crate::app::AppState;
use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

/// Pull the token out of `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Auth middleware that validates JWT tokens and stores the caller's
/// [`UserClaim`](crate::auth::models::UserClaim) in the request extensions
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claim = state.gate.authenticate_token(bearer_token(req.headers()))?;

    req.extensions_mut().insert(claim);

    Ok(next.run(req).await)
}
