//! Environment-driven configuration.
//!
//! `DATABASE_URL`            Supabase Postgres connection string (required)
//! `DB_MAX_CONNECTIONS`      pool ceiling (default 10)
//! `DB_MIN_CONNECTIONS`      pool floor (default 1)
//! `DB_ACQUIRE_TIMEOUT_SECS` pool acquire timeout (default 5)
//! `DB_REQUIRE_SSL`          require TLS to the database (default true)
//! `DB_RUN_MIGRATIONS`       apply `migrations/` on startup (default false)
//! `AUTH_MODE`               `jwt` (default) or `remote`
//! `SUPABASE_JWT_SECRET`     HS256 secret, required in `jwt` mode
//! `SUPABASE_URL`            project URL, required in `remote` mode
//! `SUPABASE_ANON_KEY`       project anon key, required in `remote` mode
//! `BIND_ADDR`               listen address (default 0.0.0.0:3000)
//! `RATE_LIMIT_PER_MINUTE`   POST requests per token per minute (default 60)

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::db::connection::DbConfig;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// How bearer tokens are turned into identities.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthConfig {
    Jwt { secret: String },
    Remote { supabase_url: Url, anon_key: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DbConfig,
    pub auth: AuthConfig,
    pub bind_addr: SocketAddr,
    pub rate_limit_per_minute: NonZeroU32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database = DbConfig {
            url: get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", 10)?,
            min_connections: parse_or(&get, "DB_MIN_CONNECTIONS", 1)?,
            acquire_timeout: Duration::from_secs(parse_or(&get, "DB_ACQUIRE_TIMEOUT_SECS", 5)?),
            require_ssl: parse_or(&get, "DB_REQUIRE_SSL", true)?,
            run_migrations: parse_or(&get, "DB_RUN_MIGRATIONS", false)?,
        };
        if database.min_connections > database.max_connections {
            return Err(ConfigError::Invalid {
                key: "DB_MIN_CONNECTIONS",
                reason: "exceeds DB_MAX_CONNECTIONS".into(),
            });
        }

        let mode = get("AUTH_MODE").unwrap_or_else(|| "jwt".into());
        let auth = match mode.to_ascii_lowercase().as_str() {
            "jwt" => AuthConfig::Jwt {
                secret: get("SUPABASE_JWT_SECRET")
                    .ok_or(ConfigError::Missing("SUPABASE_JWT_SECRET"))?,
            },
            "remote" => {
                let raw = get("SUPABASE_URL").ok_or(ConfigError::Missing("SUPABASE_URL"))?;
                let supabase_url = Url::parse(&raw).map_err(|e| ConfigError::Invalid {
                    key: "SUPABASE_URL",
                    reason: e.to_string(),
                })?;
                AuthConfig::Remote {
                    supabase_url,
                    anon_key: get("SUPABASE_ANON_KEY")
                        .ok_or(ConfigError::Missing("SUPABASE_ANON_KEY"))?,
                }
            }
            other => {
                return Err(ConfigError::Invalid {
                    key: "AUTH_MODE",
                    reason: format!("expected `jwt` or `remote`, got `{other}`"),
                });
            }
        };

        let bind_addr = parse_or(&get, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?;
        let rate_limit = parse_or(&get, "RATE_LIMIT_PER_MINUTE", 60u32)?;
        let rate_limit_per_minute =
            NonZeroU32::new(rate_limit).ok_or_else(|| ConfigError::Invalid {
                key: "RATE_LIMIT_PER_MINUTE",
                reason: "must be at least 1".into(),
            })?;

        Ok(Self {
            database,
            auth,
            bind_addr,
            rate_limit_per_minute,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
    }
}
