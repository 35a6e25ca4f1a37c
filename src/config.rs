//! Server configuration
//!
//! Every setting is a CLI flag with an environment variable fallback.
//! `.env` files are loaded first so they feed the same variables.

use chrono::Duration;
use clap::Parser;
use dotenv::dotenv;
use std::path::{Path, PathBuf};

/// Used when `JWT_SECRET` is unset. Fine for local runs, never for production.
pub const DEV_JWT_SECRET: &str = "dev-secret-change-in-production-minimum-32-characters";

#[derive(Parser, Debug, Clone)]
#[command(name = "noteful")]
#[command(about = "Noteful API - notes, folders and tags behind JWT authentication")]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind: String,

    /// SQLite database file
    #[arg(long, env = "DATABASE_PATH", default_value = "noteful.db")]
    pub database_path: PathBuf,

    /// HMAC secret for signing tokens
    #[arg(long, env = "JWT_SECRET", default_value = DEV_JWT_SECRET, hide_env_values = true)]
    pub jwt_secret: String,

    /// Token lifetime, e.g. `7d`, `12h`, `30m` or plain seconds
    #[arg(long, env = "JWT_EXPIRY", default_value = "7d", value_parser = parse_expiry)]
    pub jwt_expiry: Duration,
}

impl Config {
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

/// Parse `<n>[s|m|h|d]`. A bare number is seconds.
pub fn parse_expiry(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let (digits, unit) = match raw.char_indices().last() {
        Some((i, c)) if c.is_ascii_alphabetic() => (&raw[..i], Some(c)),
        _ => (raw, None),
    };

    let amount: i64 = digits
        .parse()
        .map_err(|_| format!("invalid expiry `{raw}`"))?;
    if amount <= 0 {
        return Err(format!("expiry must be positive, got `{raw}`"));
    }

    let duration = match unit {
        None | Some('s') => Duration::try_seconds(amount),
        Some('m') => Duration::try_minutes(amount),
        Some('h') => Duration::try_hours(amount),
        Some('d') => Duration::try_days(amount),
        Some(other) => return Err(format!("unknown expiry unit `{other}`")),
    };
    duration.ok_or_else(|| format!("expiry `{raw}` is out of range"))
}

/// Load `.env` from the working directory, then from the crate root
pub fn load_env() {
    let _ = dotenv();

    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}
