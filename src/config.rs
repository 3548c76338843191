use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use thiserror::Error;

use crate::ballot_box::DEFAULT_BALLOT_FILE;
use crate::db;

const MODE: &str = "STRAWPOLL_MODE";
const BIND: &str = "STRAWPOLL_BIND";
const PORT: &str = "STRAWPOLL_PORT";
const MAX_CONNECTIONS: &str = "STRAWPOLL_MAX_CONNECTIONS";
const BALLOT_FILE: &str = "STRAWPOLL_BALLOT_FILE";
const BLOCKED_ADDRESSES: &str = "STRAWPOLL_BLOCKED_ADDRESSES";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set in database mode")]
    Missing(&'static str),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Many polls in PostgreSQL.
    Database { db_url: String, max_connections: u32 },
    /// One implicit poll in a JSON file.
    BallotBox { ballot_file: PathBuf, blocked_addresses: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub mode: Mode,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::load(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn load(var: impl Fn(&str) -> Option<String>) -> Result<Config, ConfigError> {
        let mode = match var(MODE).as_deref().map(str::trim) {
            None | Some("") | Some("database") => Mode::Database {
                db_url: var(db::ENV_KEY).ok_or(ConfigError::Missing(db::ENV_KEY))?,
                max_connections: parse_or(&var, MAX_CONNECTIONS, 4)?,
            },
            Some("ballot_box") => Mode::BallotBox {
                ballot_file: var(BALLOT_FILE)
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_BALLOT_FILE)),
                blocked_addresses: var(BLOCKED_ADDRESSES)
                    .map(|list| list.split(',')
                        .map(str::trim)
                        .filter(|a| !a.is_empty())
                        .map(str::to_owned)
                        .collect())
                    .unwrap_or_default(),
            },
            Some(other) => return Err(ConfigError::Invalid {
                key: MODE,
                message: format!("unknown mode [{}], expected database or ballot_box", other),
            }),
        };

        Ok(Config {
            bind: var(BIND).unwrap_or_else(|| "127.0.0.1".to_owned()),
            port: parse_or(&var, PORT, 8080)?,
            mode,
        })
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where T: FromStr + Display, T::Err: Display {
    match var(key) {
        None => {
            info!("{} not set, using default: {}", key, default);
            Ok(default)
        }
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: e.to_string(),
        }),
    }
}
