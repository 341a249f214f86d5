//! Process configuration, read from environment variables.
//!
//! | variable | default |
//! |----------|---------|
//! | `BIND_ADDR` | `0.0.0.0:3000` |
//! | `JWT_SECRET` | insecure development secret (logged as a warning) |
//! | `TOKEN_TTL_HOURS` | `24` |
//! | `DATABASE_URL` | unset: in-memory storage |
//! | `ADMIN_EMAIL` / `ADMIN_PASSWORD` | unset: no admin bootstrap |
//! | `ADMIN_USERNAME` | `admin` |
//! | `CORS_ALLOWED_ORIGINS` | unset or `*`: any origin; otherwise a comma-separated list |

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEV_JWT_SECRET: &str = "dev-insecure-secret";
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("{present} is set but {missing} is not")]
    Incomplete {
        present: &'static str,
        missing: &'static str,
    },
}

/// Administrator account to create at startup if it does not exist yet.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminBootstrap {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub database_url: Option<String>,
    pub admin: Option<AdminBootstrap>,
    /// Browser origins allowed to call the API; empty means any origin.
    pub cors_origins: Vec<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("token_ttl", &self.token_ttl)
            .field("database", &self.database_url.as_ref().map(|_| "postgres"))
            .field("admin", &self.admin)
            .field("cors_origins", &self.cors_origins)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_raw = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                key: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set; using an insecure development secret");
            DEV_JWT_SECRET.to_string()
        });

        let token_ttl = match get("TOKEN_TTL_HOURS") {
            None => Duration::hours(DEFAULT_TOKEN_TTL_HOURS),
            Some(raw) => {
                let hours = raw
                    .trim()
                    .parse::<i64>()
                    .ok()
                    .filter(|h| (1..=24 * 365).contains(h))
                    .ok_or_else(|| ConfigError::Invalid {
                        key: "TOKEN_TTL_HOURS",
                        reason: format!("expected hours between 1 and 8760, got {raw:?}"),
                    })?;
                Duration::hours(hours)
            }
        };

        let admin = match (get("ADMIN_EMAIL"), get("ADMIN_PASSWORD")) {
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::Incomplete {
                    present: "ADMIN_EMAIL",
                    missing: "ADMIN_PASSWORD",
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::Incomplete {
                    present: "ADMIN_PASSWORD",
                    missing: "ADMIN_EMAIL",
                });
            }
            (Some(email), Some(password)) => Some(AdminBootstrap {
                username: get("ADMIN_USERNAME").unwrap_or_else(|| "admin".to_string()),
                email,
                password,
            }),
        };

        let cors_origins = match get("CORS_ALLOWED_ORIGINS") {
            None => Vec::new(),
            Some(raw) => parse_origins(&raw)?,
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            token_ttl,
            database_url: get("DATABASE_URL"),
            admin,
            cors_origins,
        })
    }
}

fn parse_origins(raw: &str) -> Result<Vec<String>, ConfigError> {
    let origins: Vec<String> = raw
        .split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect();
    if origins.iter().any(|o| o == "*") {
        return Ok(Vec::new());
    }
    if let Some(bad) = origins
        .iter()
        .find(|o| !(o.starts_with("http://") || o.starts_with("https://")) || o.contains(' '))
    {
        return Err(ConfigError::Invalid {
            key: "CORS_ALLOWED_ORIGINS",
            reason: format!("expected http(s) origins, got {bad:?}"),
        });
    }
    Ok(origins)
}
