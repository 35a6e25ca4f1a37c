//! Authentication Module
//! Mission: Password hashing, JWT issuance and the per-request identity gate

pub mod api;
pub mod gate;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod user_store;
pub mod validation;

pub use gate::AuthGate;
pub use jwt::{JwtHandler, TokenIssuer};
pub use middleware::auth_middleware;
pub use password::{BcryptHasher, PasswordHasher};
pub use user_store::CredentialStore;
