// src/config.rs

use std::env;
use dotenvy::dotenv;

/// Default number of visibility-loss violations tolerated before an attempt
/// is force-submitted.
pub const DEFAULT_VIOLATION_LIMIT: u32 = 2;

/// How long a finished attempt stays in the session registry so repeated
/// submit calls keep resolving to the stored result.
pub const FINISHED_ATTEMPT_RETENTION_SECS: u64 = 3600;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,

    /// Visibility-loss violations tolerated before forced submission.
    pub violation_limit: u32,

    /// When true, the first visibility loss submits the attempt immediately.
    /// The product has not signed off on this, so it defaults to off.
    pub force_submit_on_hide: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86400);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let violation_limit = env::var("VIOLATION_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_VIOLATION_LIMIT);

        let force_submit_on_hide = env::var("FORCE_SUBMIT_ON_HIDE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            violation_limit,
            force_submit_on_hide,
        }
    }
}
