//! Demo server configuration, read from `WARDEN_*` environment variables.

use std::net::SocketAddr;

use thiserror::Error;
use tracing::warn;

use warden_perm::Permission;
use warden_providers::ProvidersConfig;

use crate::app::demo::DemoUser;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 15 * 60;
pub const MAX_TOKEN_TTL_SECS: i64 = 30 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },

    #[error(transparent)]
    Providers(#[from] warden_providers::ConfigError),
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub token_ttl: chrono::Duration,
    pub demo_users: Vec<DemoUser>,
    pub providers: ProvidersConfig,
}

impl ApiConfig {
    /// Reads:
    ///
    /// - `WARDEN_BIND_ADDR` (default `0.0.0.0:8080`)
    /// - `WARDEN_TOKEN_TTL_SECS` (default 900, at most 30 days)
    /// - `WARDEN_DEMO_USERS`: `user:password:perm|perm,other:password:`
    /// - everything [`ProvidersConfig::from_env`] reads
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.providers = ProvidersConfig::from_env()?;
        Ok(config)
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind_addr = lookup("WARDEN_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_owned())
            .parse()
            .map_err(|e| ConfigError::InvalidValue {
                var: "WARDEN_BIND_ADDR",
                reason: format!("{e}"),
            })?;

        let ttl_secs = match lookup("WARDEN_TOKEN_TTL_SECS") {
            Some(raw) => raw.trim().parse::<i64>().map_err(|e| ConfigError::InvalidValue {
                var: "WARDEN_TOKEN_TTL_SECS",
                reason: format!("{e}"),
            })?,
            None => DEFAULT_TOKEN_TTL_SECS,
        };
        if !(1..=MAX_TOKEN_TTL_SECS).contains(&ttl_secs) {
            return Err(ConfigError::InvalidValue {
                var: "WARDEN_TOKEN_TTL_SECS",
                reason: format!("must be between 1 and {MAX_TOKEN_TTL_SECS}"),
            });
        }

        let demo_users = match lookup("WARDEN_DEMO_USERS") {
            Some(raw) => parse_demo_users(&raw)?,
            None => {
                warn!("WARDEN_DEMO_USERS not set; password login will reject everyone");
                Vec::new()
            }
        };

        Ok(Self {
            bind_addr,
            token_ttl: chrono::Duration::seconds(ttl_secs),
            demo_users,
            providers: ProvidersConfig::default(),
        })
    }
}

fn parse_demo_users(raw: &str) -> Result<Vec<DemoUser>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let mut fields = entry.splitn(3, ':');
            let (Some(username), Some(password)) = (fields.next(), fields.next()) else {
                return Err(ConfigError::InvalidValue {
                    var: "WARDEN_DEMO_USERS",
                    reason: "expected user:password[:perm|perm]".to_owned(),
                });
            };
            if username.is_empty() {
                return Err(ConfigError::InvalidValue {
                    var: "WARDEN_DEMO_USERS",
                    reason: "empty username".to_owned(),
                });
            }
            let permissions = fields
                .next()
                .unwrap_or_default()
                .split('|')
                .filter(|p| !p.is_empty())
                .map(|p| Permission::new(p.to_owned()))
                .collect();

            Ok(DemoUser {
                username: username.to_owned(),
                password: password.to_owned(),
                permissions,
            })
        })
        .collect()
}
