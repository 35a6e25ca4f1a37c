//! Password Hashing
//! Mission: Never store or compare a plaintext password

/// bcrypt work factor for every digest this service produces
pub const BCRYPT_COST: u32 = 10;

/// bcrypt reads at most this many bytes of input and ignores the rest
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Hashing failure. Never carries the plaintext.
#[derive(Debug)]
pub enum HashError {
    Bcrypt(bcrypt::BcryptError),
    /// Input longer than bcrypt can take without truncating, in bytes
    TooLong(usize),
}

impl std::fmt::Display for HashError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashError::Bcrypt(err) => write!(f, "password hashing failed: {err}"),
            HashError::TooLong(len) => write!(
                f,
                "password is {len} bytes, bcrypt takes at most {MAX_PASSWORD_BYTES}"
            ),
        }
    }
}

impl std::error::Error for HashError {}

impl From<bcrypt::BcryptError> for HashError {
    fn from(err: bcrypt::BcryptError) -> Self {
        HashError::Bcrypt(err)
    }
}

/// One-way salted hashing. Both operations are CPU bound; async callers
/// should run them on the blocking pool.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String, HashError>;

    /// `Ok(false)` for a well-formed digest that does not match
    fn verify(&self, plaintext: &str, digest: &str) -> Result<bool, HashError>;
}

#[derive(Debug, Clone, Default)]
pub struct BcryptHasher;

impl PasswordHasher for BcryptHasher {
    fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return Err(HashError::TooLong(plaintext.len()));
        }
        Ok(bcrypt::hash(plaintext, BCRYPT_COST)?)
    }

    fn verify(&self, plaintext: &str, digest: &str) -> Result<bool, HashError> {
        // bcrypt would compare only the first 72 bytes
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return Ok(false);
        }
        Ok(bcrypt::verify(plaintext, digest)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hasher = BcryptHasher;
        let digest = hasher.hash("examplePass").unwrap();

        assert_ne!(digest, "examplePass");
        assert!(hasher.verify("examplePass", &digest).unwrap());
        assert!(!hasher.verify("examplePass2", &digest).unwrap());
    }

    #[test]
    fn test_hash_is_salted() {
        let hasher = BcryptHasher;
        let first = hasher.hash("password123").unwrap();
        let second = hasher.hash("password123").unwrap();

        assert_ne!(first, second);
        assert!(hasher.verify("password123", &first).unwrap());
        assert!(hasher.verify("password123", &second).unwrap());
    }

    #[test]
    fn test_digest_uses_fixed_cost() {
        let digest = BcryptHasher.hash("password123").unwrap();
        assert!(digest.starts_with("$2b$10$"));
    }

    #[test]
    fn test_refuses_input_bcrypt_would_truncate() {
        let hasher = BcryptHasher;
        // 72 characters, 144 bytes
        let long = "é".repeat(72);
        assert!(matches!(hasher.hash(&long), Err(HashError::TooLong(144))));

        let stored = "é".repeat(36);
        let digest = hasher.hash(&stored).unwrap();
        assert!(hasher.verify(&stored, &digest).unwrap());
        let same_prefix = format!("{stored}totally-different");
        assert!(!hasher.verify(&same_prefix, &digest).unwrap());
    }

    #[test]
    fn test_malformed_digest_is_an_error() {
        assert!(BcryptHasher.verify("password123", "not-a-digest").is_err());
    }
}
