//! Environment-driven configuration

use crate::state_machine::state::UserId;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_DB_PATH: &str = "lacore_simple_v2.db";
pub const DEFAULT_CATALOG_PATH: &str = "products.json";
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{var} has an invalid value: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Bot configuration
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub bot_token: String,
    /// Users allowed past `/start`
    pub admin_ids: HashSet<UserId>,
    pub db_path: PathBuf,
    pub catalog_path: PathBuf,
    /// Directory holding `arialbd.ttf` and `arial.ttf`
    pub font_dir: Option<PathBuf>,
    pub poll_timeout: Duration,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the configuration from any variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bot_token = lookup("BOT_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .ok_or(ConfigError::Missing("BOT_TOKEN"))?;

        let admin_ids = match lookup("LACORE_ADMIN_IDS") {
            Some(raw) => parse_admin_ids(&raw)?,
            None => HashSet::new(),
        };

        let poll_timeout = match lookup("LACORE_POLL_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::Invalid {
                    var: "LACORE_POLL_TIMEOUT_SECS",
                    value: raw,
                })?,
            None => Duration::from_secs(DEFAULT_POLL_TIMEOUT_SECS),
        };

        Ok(Self {
            bot_token,
            admin_ids,
            db_path: lookup("LACORE_DB_PATH")
                .unwrap_or_else(|| DEFAULT_DB_PATH.to_string())
                .into(),
            catalog_path: lookup("LACORE_CATALOG_PATH")
                .unwrap_or_else(|| DEFAULT_CATALOG_PATH.to_string())
                .into(),
            font_dir: lookup("LACORE_FONT_DIR")
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from),
            poll_timeout,
        })
    }
}

/// Comma-separated user ids. Blank entries are skipped.
fn parse_admin_ids(raw: &str) -> Result<HashSet<UserId>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse::<UserId>().map_err(|_| ConfigError::Invalid {
                var: "LACORE_ADMIN_IDS",
                value: id.to_string(),
            })
        })
        .collect()
}
