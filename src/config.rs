// src/config.rs

use std::env;
use dotenvy::dotenv;

/// Grace window (seconds) after the deadline during which a final submission is still accepted.
pub const SUBMIT_GRACE_SECONDS: i64 = 2;

pub const MIN_DURATION_MINUTES: i64 = 5;
pub const MAX_DURATION_MINUTES: i64 = 180;
pub const MIN_QUESTION_COUNT: i64 = 5;
pub const MAX_QUESTION_COUNT: i64 = 100;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    pub port: u16,
    pub submit_grace_seconds: i64,
    /// Interval of the background expiry sweep. `None` keeps expiry purely lazy.
    pub expiry_sweep_seconds: Option<u64>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let port = env::var("APP_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let submit_grace_seconds = env::var("SUBMIT_GRACE_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(SUBMIT_GRACE_SECONDS);

        let expiry_sweep_seconds = env::var("EXPIRY_SWEEP_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|secs| *secs > 0);

        Self {
            database_url,
            jwt_secret,
            rust_log,
            port,
            submit_grace_seconds,
            expiry_sweep_seconds,
        }
    }
}
