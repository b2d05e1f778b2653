use std::time::Duration;

use axum::http::HeaderValue;
use ispsync_core::sync::DEFAULT_PROVIDER_TIMEOUT;

use crate::auth::jwt::JwtConfig;

/// Startup configuration error. The binary refuses to start on any of these.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in the environment")]
    Missing(&'static str),

    #[error("{var} has an invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Read `var`, falling back to `default` when unset.
pub(crate) fn env_or(var: &'static str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.to_string())
}

/// Read a required, non-empty variable.
pub(crate) fn env_required(var: &'static str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(var)),
    }
}

/// Read and parse `var`, falling back to `default` when unset.
pub(crate) fn env_parse<T>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            value: raw,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins, from the comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    /// How long shutdown waits for background tasks to drain.
    pub shutdown_timeout_secs: u64,
    pub jwt: JwtConfig,
    pub sync: SyncConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                 |
    /// |-------------------------|-------------------------|
    /// | `HOST`                  | `0.0.0.0`               |
    /// | `PORT`                  | `3000`                  |
    /// | `CORS_ORIGINS`          | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                    |
    ///
    /// See [`JwtConfig::from_env`] and [`SyncConfig::from_env`] for the rest.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env_or("HOST", "0.0.0.0");
        let port = env_parse("PORT", 3000u16)?;
        let cors_origins = parse_origins(&env_or("CORS_ORIGINS", "http://localhost:5173"))?;
        let request_timeout_secs = env_parse("REQUEST_TIMEOUT_SECS", 30u64)?;
        let shutdown_timeout_secs = env_parse("SHUTDOWN_TIMEOUT_SECS", 30u64)?;
        let sync = SyncConfig::from_env()?;
        check_timeouts(request_timeout_secs, sync.provider_timeout)?;

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt: JwtConfig::from_env()?,
            sync,
        })
    }
}

/// The provider call must finish before the HTTP timeout answers the
/// request, otherwise the caller gets an empty 408 instead of the outcome.
fn check_timeouts(request_timeout_secs: u64, provider_timeout: Duration) -> Result<(), ConfigError> {
    if provider_timeout >= Duration::from_secs(request_timeout_secs) {
        return Err(ConfigError::Invalid {
            var: "PROVIDER_TIMEOUT_SECS",
            value: provider_timeout.as_secs().to_string(),
            reason: format!("must be shorter than REQUEST_TIMEOUT_SECS ({request_timeout_secs})"),
        });
    }
    Ok(())
}

fn parse_origins(raw: &str) -> Result<Vec<String>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map(|_| origin.to_string())
                .map_err(|e| ConfigError::Invalid {
                    var: "CORS_ORIGINS",
                    value: origin.to_string(),
                    reason: e.to_string(),
                })
        })
        .collect()
}

/// Sync engine settings.
#[derive(Clone)]
pub struct SyncConfig {
    /// Upper bound on one provider call.
    pub provider_timeout: Duration,
    /// Master secret for sealing integration passwords.
    pub credentials_secret: String,
}

impl SyncConfig {
    /// | Env Var                 | Required | Default |
    /// |-------------------------|----------|---------|
    /// | `PROVIDER_TIMEOUT_SECS` | no       | `15`    |
    /// | `CREDENTIALS_SECRET`    | **yes**  | --      |
    pub fn from_env() -> Result<Self, ConfigError> {
        let secs = env_parse("PROVIDER_TIMEOUT_SECS", DEFAULT_PROVIDER_TIMEOUT.as_secs())?;
        if secs == 0 {
            return Err(ConfigError::Invalid {
                var: "PROVIDER_TIMEOUT_SECS",
                value: secs.to_string(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(Self {
            provider_timeout: Duration::from_secs(secs),
            credentials_secret: env_required("CREDENTIALS_SECRET")?,
        })
    }
}

impl std::fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncConfig")
            .field("provider_timeout", &self.provider_timeout)
            .finish_non_exhaustive()
    }
}
