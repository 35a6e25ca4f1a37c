//! Authentication Gate
//! Mission: Resolve who is calling, from a password or from a token, and mint tokens

use crate::auth::{
    jwt::TokenIssuer,
    models::{NewUser, UserClaim},
    password::PasswordHasher,
    user_store::CredentialStore,
    validation::{check_password_bytes, Registration},
};
use crate::error::{ApiError, AuthFailure};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Username/password pair from a login request
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Every authentication decision goes through here. Unknown users, wrong
/// passwords, expired tokens and forged tokens all come back as the same
/// `Unauthorized` error.
pub struct AuthGate {
    store: Arc<dyn CredentialStore>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenIssuer>,
}

impl AuthGate {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenIssuer>,
    ) -> Self {
        Self {
            store,
            hasher,
            tokens,
        }
    }

    /// Password path: look the user up and check the password
    pub async fn authenticate_password(
        &self,
        credentials: Option<Credentials>,
    ) -> Result<UserClaim, ApiError> {
        let Credentials { username, password } =
            credentials.ok_or(ApiError::Authentication(AuthFailure::BadRequest))?;

        let Some(user) = self.store.find_by_username(&username).await? else {
            warn!(username = %username, "Failed login attempt");
            return Err(ApiError::Authentication(AuthFailure::Unauthorized));
        };

        let hasher = self.hasher.clone();
        let digest = user.password_hash.clone();
        let valid =
            tokio::task::spawn_blocking(move || hasher.verify(&password, &digest)).await??;

        if !valid {
            warn!(username = %username, "Failed login attempt");
            return Err(ApiError::Authentication(AuthFailure::Unauthorized));
        }

        Ok(user.claim())
    }

    /// Token path: accept a still-valid bearer token
    pub fn authenticate_token(&self, token: Option<&str>) -> Result<UserClaim, ApiError> {
        let token = token.ok_or(ApiError::Authentication(AuthFailure::BadRequest))?;

        self.tokens.verify(token).map_err(|e| {
            debug!(reason = %e, "Rejected bearer token");
            ApiError::Authentication(AuthFailure::Unauthorized)
        })
    }

    pub fn issue(&self, claim: &UserClaim) -> Result<String, ApiError> {
        Ok(self.tokens.issue(claim)?)
    }

    /// Verify credentials and mint a token for them
    pub async fn login(&self, credentials: Option<Credentials>) -> Result<String, ApiError> {
        let claim = self.authenticate_password(credentials).await?;
        let token = self.issue(&claim)?;
        info!(username = %claim.username, "Login successful");
        Ok(token)
    }

    /// Mint a replacement for a valid token. The old token is left alone and
    /// stays valid until its own expiry.
    pub fn refresh(&self, token: Option<&str>) -> Result<String, ApiError> {
        let claim = self.authenticate_token(token)?;
        let token = self.issue(&claim)?;
        debug!(username = %claim.username, "Token refreshed");
        Ok(token)
    }

    /// Hash the password and persist a validated registration
    pub async fn register(&self, registration: Registration) -> Result<UserClaim, ApiError> {
        let Registration {
            username,
            password,
            fullname,
        } = registration;
        check_password_bytes(&password)?;

        let hasher = self.hasher.clone();
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password)).await??;

        let user = self
            .store
            .create_user(NewUser {
                username,
                fullname,
                password_hash,
            })
            .await?;

        Ok(user.claim())
    }
}
