use chrono::{DateTime, FixedOffset, Offset, Utc};
use dotenvy::dotenv;
use std::env;
use thiserror::Error;

const MIN_SESSION_SECRET_LEN: usize = 16;
const MAX_UTC_OFFSET_HOURS: i32 = 23;

#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub db_host:            String,
    pub db_port:            u16,
    pub db_name:            String,
    pub db_user:            String,
    pub db_password:        String,
    pub db_max_connections: u32,

    // Backend
    pub backend_host:       String,
    pub backend_port:       u16,

    // Session
    pub session_secret:       String,
    pub session_max_age_secs: i64,

    // Files
    pub public_dir:         String,
    pub upload_dir:         String,
    pub max_upload_bytes:   usize,

    // Booking dates are recorded in the business timezone (Asia/Bangkok by default)
    pub business_utc_offset_hours: i32,

    // Optional first admin account, created on startup when both are set
    pub seed_admin_email:    Option<String>,
    pub seed_admin_password: Option<String>,

    // App
    pub app_env:            String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. `from_env` passes
    /// `std::env::var`; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| -> Result<String, ConfigError> {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingVar(key.to_string()))
        };
        let or_default = |key: &str, default: &str| -> String {
            lookup(key).filter(|v| !v.is_empty()).unwrap_or_else(|| default.into())
        };

        let session_secret = require("SESSION_SECRET")?;
        if session_secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(ConfigError::InvalidValue(
                "SESSION_SECRET".into(),
                format!("must be at least {MIN_SESSION_SECRET_LEN} characters"),
            ));
        }

        let business_utc_offset_hours: i32 = parse_or(&lookup, "BUSINESS_UTC_OFFSET_HOURS", 7)?;
        if !(-MAX_UTC_OFFSET_HOURS..=MAX_UTC_OFFSET_HOURS).contains(&business_utc_offset_hours) {
            return Err(ConfigError::InvalidValue(
                "BUSINESS_UTC_OFFSET_HOURS".into(),
                format!("{business_utc_offset_hours} is outside -{MAX_UTC_OFFSET_HOURS}..={MAX_UTC_OFFSET_HOURS}"),
            ));
        }

        Ok(Self {
            db_host:            or_default("DB_HOST", "db"),
            db_port:            parse_or(&lookup, "DB_PORT", 3306)?,
            db_name:            require("DB_NAME")?,
            db_user:            require("DB_USER")?,
            db_password:        lookup("DB_PASSWORD").unwrap_or_default(),
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,

            backend_host:       or_default("BACKEND_HOST", "0.0.0.0"),
            backend_port:       parse_or(&lookup, "BACKEND_PORT", 8080)?,

            session_secret,
            session_max_age_secs: parse_or(&lookup, "SESSION_MAX_AGE_SECS", 3600)?,

            public_dir:         or_default("PUBLIC_DIR", "public"),
            upload_dir:         or_default("UPLOAD_DIR", "public/uploads"),
            max_upload_bytes:   parse_or(&lookup, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,

            business_utc_offset_hours,

            seed_admin_email:    lookup("SEED_ADMIN_EMAIL").filter(|v| !v.is_empty()),
            seed_admin_password: lookup("SEED_ADMIN_PASSWORD").filter(|v| !v.is_empty()),

            app_env:            or_default("APP_ENV", "development"),
        })
    }

    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }

    /// Fixed offset of the business timezone. `from_lookup` bounds the hours;
    /// a hand-built config with an out-of-range value gets UTC.
    pub fn business_offset(&self) -> FixedOffset {
        self.business_utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix())
    }

    /// Current wall-clock time in the business timezone.
    pub fn business_now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.business_offset())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(key.to_string(), raw)),
    }
}
