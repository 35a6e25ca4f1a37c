//! Registration Validation
//! Mission: Reject malformed sign-up bodies field by field before any hashing

use crate::auth::password::MAX_PASSWORD_BYTES;
use crate::error::ApiError;
use serde_json::{Map, Value};

const REQUIRED_FIELDS: &[&str] = &["username", "password"];
const STRING_FIELDS: &[&str] = &["username", "password", "fullname"];
const TRIMMED_FIELDS: &[&str] = &["username", "password"];

struct SizeLimit {
    field: &'static str,
    min: Option<usize>,
    max: Option<usize>,
}

const SIZED_FIELDS: &[SizeLimit] = &[
    SizeLimit {
        field: "username",
        min: Some(1),
        max: None,
    },
    SizeLimit {
        field: "password",
        min: Some(8),
        max: Some(72),
    },
];

/// A sign-up request that passed every field check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub fullname: String,
}

/// Check `body` against the registration rules. The first failing rule wins.
pub fn validate_registration(body: &Value) -> Result<Registration, ApiError> {
    let empty = Map::new();
    let fields = body.as_object().unwrap_or(&empty);

    if let Some(missing) = REQUIRED_FIELDS
        .iter()
        .find(|field| !fields.contains_key(**field))
    {
        return Err(ApiError::validation(
            format!("Missing '{missing}' in request body"),
            missing,
        ));
    }

    if let Some(non_string) = STRING_FIELDS
        .iter()
        .find(|field| fields.get(**field).is_some_and(|v| !v.is_string()))
    {
        return Err(ApiError::validation(
            "Incorrect field type: expected string",
            non_string,
        ));
    }

    let text = |field: &str| fields.get(field).and_then(Value::as_str).unwrap_or("");

    if let Some(untrimmed) = TRIMMED_FIELDS
        .iter()
        .find(|field| text(**field).trim() != text(**field))
    {
        return Err(ApiError::validation(
            format!("Field: '{untrimmed}' cannot start or end with whitespace"),
            untrimmed,
        ));
    }

    for limit in SIZED_FIELDS {
        let len = text(limit.field).chars().count();
        if let Some(min) = limit.min.filter(|min| len < *min) {
            return Err(ApiError::validation(
                format!("Must be at least {min} characters long"),
                limit.field,
            ));
        }
        if let Some(max) = limit.max.filter(|max| len > *max) {
            return Err(ApiError::validation(
                format!("Must be at most {max} characters long"),
                limit.field,
            ));
        }
    }

    check_password_bytes(text("password"))?;

    Ok(Registration {
        username: text("username").to_string(),
        password: text("password").to_string(),
        fullname: text("fullname").trim().to_string(),
    })
}

/// bcrypt ignores everything past 72 bytes, so multibyte passwords that fit
/// the character limit can still be too long
pub fn check_password_bytes(password: &str) -> Result<(), ApiError> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(ApiError::validation(
            format!("Must be at most {MAX_PASSWORD_BYTES} bytes long"),
            "password",
        ));
    }
    Ok(())
}
