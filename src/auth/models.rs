//! Authentication Models
//! Mission: Define user, claim and token data structures

use serde::{Deserialize, Serialize};

/// User account as stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub fullname: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // bcrypt hash - never serialize
    #[serde(skip_serializing)]
    pub created_at: String,
}

impl User {
    /// Public projection carried in tokens and returned to clients
    pub fn claim(&self) -> UserClaim {
        UserClaim {
            id: self.id.clone(),
            username: self.username.clone(),
            fullname: self.fullname.clone(),
        }
    }
}

/// Fields needed to persist a new user. The digest is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub fullname: String,
    pub password_hash: String,
}

/// The caller's identity as seen by every handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaim {
    pub id: String,
    pub username: String,
    pub fullname: String,
}

/// JWT Claims payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user: UserClaim,
    pub sub: String, // subject (username)
    pub iat: i64,
    pub exp: i64, // expiration timestamp
    pub jti: String,
}

/// Login request body. Fields are optional so a partial body is an
/// authentication failure rather than a deserialization error.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Login and refresh response
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthTokenResponse {
    #[serde(rename = "authToken")]
    pub auth_token: String,
}
