//! Environment configuration

use crate::state_machine::SessionContext;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000";
pub const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
    #[error("{name} must not be empty")]
    Empty { name: &'static str },
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Base URL; `/chat` and `/health` are appended
    pub endpoint: String,
    pub db_path: PathBuf,
    pub export_dir: PathBuf,
    pub max_message_length: usize,
    pub health_interval: Duration,
}

impl ChatConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = match lookup("CHATLINE_ENDPOINT") {
            Some(value) if value.trim().is_empty() => {
                return Err(ConfigError::Empty {
                    name: "CHATLINE_ENDPOINT",
                });
            }
            Some(value) => value.trim().trim_end_matches('/').to_string(),
            None => DEFAULT_ENDPOINT.to_string(),
        };

        let db_path = lookup("CHATLINE_DB_PATH").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".chatline").join("history.db")
            },
            PathBuf::from,
        );

        let export_dir =
            lookup("CHATLINE_EXPORT_DIR").map_or_else(|| PathBuf::from("."), PathBuf::from);

        let max_message_length = parse_positive(
            &lookup,
            "CHATLINE_MAX_MESSAGE_LENGTH",
            SessionContext::default().max_message_length,
        )?;

        let health_interval = Duration::from_secs(parse_positive(
            &lookup,
            "CHATLINE_HEALTH_INTERVAL_SECS",
            DEFAULT_HEALTH_INTERVAL.as_secs(),
        )?);

        Ok(Self {
            endpoint,
            db_path,
            export_dir,
            max_message_length,
            health_interval,
        })
    }

    /// Session limits; protocol constants keep their defaults
    pub fn session_context(&self) -> SessionContext {
        SessionContext {
            max_message_length: self.max_message_length,
            ..SessionContext::default()
        }
    }
}

fn parse_positive<F, N>(lookup: &F, name: &'static str, default: N) -> Result<N, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    N: std::str::FromStr + PartialOrd + Default,
{
    let Some(raw) = lookup(name) else {
        return Ok(default);
    };
    match raw.trim().parse::<N>() {
        Ok(n) if n > N::default() => Ok(n),
        _ => Err(ConfigError::InvalidNumber { name, value: raw }),
    }
}
