//! JWT Token Handler
//! Mission: Generate and validate JWT tokens securely

use crate::auth::models::{Claims, UserClaim};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use tracing::debug;
use uuid::Uuid;

/// Why a token could not be issued or accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    Expired,
    /// Bad signature, bad structure or inconsistent claims
    Invalid,
    /// Encoding failed on our side
    Signing(String),
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Expired => write!(f, "token expired"),
            TokenError::Invalid => write!(f, "token invalid"),
            TokenError::Signing(detail) => write!(f, "failed to sign token: {detail}"),
        }
    }
}

impl std::error::Error for TokenError {}

/// Mints and checks bearer tokens carrying a [`UserClaim`]
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, claim: &UserClaim) -> Result<String, TokenError>;

    fn verify(&self, token: &str) -> Result<UserClaim, TokenError>;
}

/// HS256 JWT handler
pub struct JwtHandler {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry: Duration,
}

impl JwtHandler {
    /// Create a new JWT handler with secret key and token lifetime
    pub fn new(secret: &str, expiry: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry,
        }
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        // strict expiry, no clock skew allowance
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation
    }
}

impl TokenIssuer for JwtHandler {
    fn issue(&self, claim: &UserClaim) -> Result<String, TokenError> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(self.expiry)
            .ok_or_else(|| TokenError::Signing("expiry overflows timestamp".to_string()))?;

        let claims = Claims {
            user: claim.clone(),
            sub: claim.username.clone(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        debug!(
            "Generating JWT for user {} ({}), expires in {}s",
            claim.username,
            claim.id,
            self.expiry.num_seconds()
        );

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    fn verify(&self, token: &str) -> Result<UserClaim, TokenError> {
        let decoded = decode::<Claims>(token, &self.decoding_key, &Self::validation()).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            },
        )?;

        let claims = decoded.claims;
        if claims.sub != claims.user.username {
            return Err(TokenError::Invalid);
        }

        debug!("Validated JWT for user {}", claims.user.username);

        Ok(claims.user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_claim() -> UserClaim {
        UserClaim {
            id: Uuid::new_v4().to_string(),
            username: "testUser".to_string(),
            fullname: "Test Test".to_string(),
        }
    }

    fn handler() -> JwtHandler {
        JwtHandler::new("test-secret-key-12345", Duration::days(7))
    }

    #[test]
    fn test_jwt_generation_and_validation() {
        let handler = handler();
        let claim = create_test_claim();

        let token = handler.issue(&claim).unwrap();
        assert!(!token.is_empty());

        let verified = handler.verify(&token).unwrap();
        assert_eq!(verified, claim);
    }

    #[test]
    fn test_payload_shape() {
        let handler = handler();
        let claim = create_test_claim();
        let token = handler.issue(&claim).unwrap();

        let decoded = decode::<serde_json::Value>(
            &token,
            &DecodingKey::from_secret(b"test-secret-key-12345"),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();
        let payload = decoded.claims;

        assert_eq!(payload["sub"], "testUser");
        let user = payload["user"].as_object().unwrap();
        let mut keys: Vec<&str> = user.keys().map(|k| k.as_str()).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["fullname", "id", "username"]);
        assert!(payload["exp"].as_i64().unwrap() > payload["iat"].as_i64().unwrap());
    }

    #[test]
    fn test_invalid_token_rejected() {
        let handler = handler();
        assert_eq!(
            handler.verify("invalid.token.here"),
            Err(TokenError::Invalid)
        );
    }

    #[test]
    fn test_different_secrets_reject() {
        let handler1 = JwtHandler::new("secret1", Duration::days(7));
        let handler2 = JwtHandler::new("secret2", Duration::days(7));

        let token = handler1.issue(&create_test_claim()).unwrap();
        assert_eq!(handler2.verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_expired_token_rejected() {
        let expired = JwtHandler::new("test-secret-key-12345", Duration::seconds(-10));
        let token = expired.issue(&create_test_claim()).unwrap();

        assert_eq!(handler().verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_reissue_yields_distinct_token() {
        let handler = handler();
        let claim = create_test_claim();

        let first = handler.issue(&claim).unwrap();
        let second = handler.issue(&handler.verify(&first).unwrap()).unwrap();

        assert_ne!(first, second);
        assert_eq!(handler.verify(&second).unwrap(), claim);
        // the original stays valid on its own
        assert_eq!(handler.verify(&first).unwrap(), claim);
    }

    #[test]
    fn test_subject_mismatch_rejected() {
        let claims = Claims {
            user: create_test_claim(),
            sub: "someoneElse".to_string(),
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret-key-12345"),
        )
        .unwrap();

        assert_eq!(handler().verify(&token), Err(TokenError::Invalid));
    }
}
