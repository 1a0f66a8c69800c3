use std::{env, fmt::Display, str::FromStr};

use thiserror::Error;
use tracing::info;

pub const MIN_TOKEN_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is required")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub auth_jwt_secret: String,
    pub check_in_token_secret: String,
    pub check_in_token_ttl_minutes: i64,
    pub token_leeway_seconds: u64,
    pub public_base_url: String,
}

// Secrets stay out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &self.database_url)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("check_in_token_ttl_minutes", &self.check_in_token_ttl_minutes)
            .field("token_leeway_seconds", &self.token_leeway_seconds)
            .field("public_base_url", &self.public_base_url)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            database_url: required("DATABASE_URL")?,
            host: try_load("HOST", "127.0.0.1")?,
            port: try_load("PORT", "3000")?,
            auth_jwt_secret: required("AUTH_JWT_SECRET")?,
            check_in_token_secret: required("CHECK_IN_TOKEN_SECRET")?,
            check_in_token_ttl_minutes: try_load("CHECK_IN_TOKEN_TTL_MINUTES", "720")?,
            token_leeway_seconds: try_load("TOKEN_LEEWAY_SECONDS", "0")?,
            public_base_url: try_load("PUBLIC_BASE_URL", "http://localhost:3000")?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.check_in_token_secret.len() < MIN_TOKEN_SECRET_LEN {
            return Err(ConfigError::Invalid {
                key: "CHECK_IN_TOKEN_SECRET",
                reason: format!("must be at least {MIN_TOKEN_SECRET_LEN} bytes"),
            });
        }
        if self.auth_jwt_secret.is_empty() {
            return Err(ConfigError::Missing("AUTH_JWT_SECRET"));
        }
        if self.check_in_token_ttl_minutes <= 0 {
            return Err(ConfigError::Invalid {
                key: "CHECK_IN_TOKEN_TTL_MINUTES",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    pub fn check_in_url(&self, token: &str) -> String {
        format!(
            "{}/check-in?token={}",
            self.public_base_url.trim_end_matches('/'),
            token
        )
    }
}

/// Settings for the token prune job. It never signs or verifies anything,
/// so it does not need the secrets.
#[derive(Debug, Clone)]
pub struct PruneConfig {
    pub database_url: String,
    pub grace_hours: i64,
}

impl PruneConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            database_url: required("DATABASE_URL")?,
            grace_hours: try_load("PRUNE_GRACE_HOURS", "24")?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grace_hours < 0 {
            return Err(ConfigError::Invalid {
                key: "PRUNE_GRACE_HOURS",
                reason: "must not be negative".to_string(),
            });
        }
        Ok(())
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        host: "127.0.0.1".to_string(),
        port: 3000,
        auth_jwt_secret: "session-secret-for-tests".to_string(),
        check_in_token_secret: "check-in-secret-for-tests-0123456789abcdef".to_string(),
        check_in_token_ttl_minutes: 720,
        token_leeway_seconds: 0,
        public_base_url: "https://meetcheck.test/".to_string(),
    }
}
