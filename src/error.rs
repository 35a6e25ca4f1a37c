//! API Errors
//! Mission: One error type for every handler, translated to a status code at the boundary

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::auth::jwt::TokenError;
use crate::auth::password::HashError;
use crate::db::StoreError;
use crate::notes::ownership::OwnershipError;

/// Why an authentication attempt was rejected.
///
/// Both variants render the same `AuthenticationError` name; callers never
/// learn whether the username, the password or the token was at fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No credentials were supplied at all
    BadRequest,
    /// Credentials were supplied but did not check out
    Unauthorized,
}

#[derive(Debug)]
pub enum ApiError {
    /// Malformed registration input, reported with the offending field
    Validation {
        message: String,
        location: Option<String>,
    },
    /// Malformed note/folder/tag input
    BadRequest(String),
    Authentication(AuthFailure),
    Ownership(OwnershipError),
    Conflict(String),
    NotFound,
    /// Details go to the log, never to the client
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>, location: &str) -> Self {
        ApiError::Validation {
            message: message.into(),
            location: Some(location.to_string()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Authentication(AuthFailure::BadRequest) => StatusCode::BAD_REQUEST,
            ApiError::Authentication(AuthFailure::Unauthorized) => StatusCode::UNAUTHORIZED,
            ApiError::Ownership(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "ValidationError",
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::Authentication(_) => "AuthenticationError",
            ApiError::Ownership(_) => "OwnershipError",
            ApiError::Conflict(_) => "ConflictError",
            ApiError::NotFound => "NotFoundError",
            ApiError::Internal(_) => "InternalError",
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Validation { message, .. } => message.clone(),
            ApiError::BadRequest(message) => message.clone(),
            ApiError::Authentication(AuthFailure::BadRequest) => "Bad Request".to_string(),
            ApiError::Authentication(AuthFailure::Unauthorized) => "Unauthorized".to_string(),
            ApiError::Ownership(err) => err.to_string(),
            ApiError::Conflict(message) => message.clone(),
            ApiError::NotFound => "Not Found".to_string(),
            ApiError::Internal(_) => "Internal Server Error".to_string(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Internal(detail) => write!(f, "{}: {}", self.name(), detail),
            _ => write!(f, "{}: {}", self.name(), self.message()),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            error!(detail = %detail, "Request failed with internal error");
        }

        let status = self.status();
        let mut body = json!({
            "name": self.name(),
            "message": self.message(),
            "status": status.as_u16(),
        });
        if let ApiError::Validation {
            location: Some(location),
            ..
        } = &self
        {
            body["location"] = json!(location);
        }

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(message) => ApiError::Conflict(message),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<HashError> for ApiError {
    fn from(err: HashError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired | TokenError::Invalid => {
                ApiError::Authentication(AuthFailure::Unauthorized)
            }
            TokenError::Signing(detail) => ApiError::Internal(detail),
        }
    }
}

impl From<OwnershipError> for ApiError {
    fn from(err: OwnershipError) -> Self {
        ApiError::Ownership(err)
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("blocking task failed: {err}"))
    }
}
