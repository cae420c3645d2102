use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use chrono_tz::Tz;
use dotenvy::dotenv;

use crate::model::attendance::AttendancePolicy;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,

    // Rate limiting
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Attendance rules
    pub timezone: Tz,
    pub late_cutoff_hour: u32,
    pub zone_cache_ttl_secs: u64,

    // Logging
    pub log_dir: String,
    pub log_level: tracing::Level,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn parsed_or<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse::<T>()
        .map_err(|e| anyhow!("{key}={raw} is invalid: {e}"))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let late_cutoff_hour: u32 = parsed_or("LATE_CUTOFF_HOUR", "9")?;
        if late_cutoff_hour > 23 {
            return Err(anyhow!("LATE_CUTOFF_HOUR must be between 0 and 23"));
        }

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,

            rate_protected_per_min: parsed_or("RATE_PROTECTED_PER_MIN", "1000")?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            timezone: parsed_or("ATTENDANCE_TIMEZONE", "UTC")?,
            late_cutoff_hour,
            zone_cache_ttl_secs: parsed_or("ZONE_CACHE_TTL_SECS", "30")?,

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: parsed_or("LOG_LEVEL", "DEBUG")?,
        })
    }

    pub fn attendance_policy(&self) -> AttendancePolicy {
        AttendancePolicy {
            timezone: self.timezone,
            late_cutoff_hour: self.late_cutoff_hour,
        }
    }
}
