//! Backend selection and connection settings.
//!
//! Read once at startup from the environment:
//! - `DB_TYPE`: `postgres`, `postgresql` or `server` selects the server engine;
//!   `sqlite`, `embedded` or unset selects the embedded engine
//! - `DB_HOST`, `DB_PORT`, `DB_NAME`, `DB_USER`, `DB_PASSWORD`
//! - `DB_POOL_SIZE`, `DB_CONNECT_TIMEOUT_MS`, `DB_ACQUIRE_TIMEOUT_MS`
//! - `DB_PATH`: embedded database file (`:memory:` for a private in-memory database)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{PropDbError, Result};

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 5432;
const DEFAULT_DATABASE: &str = "property_management";
const DEFAULT_USER: &str = "postgres";
const DEFAULT_POOL_SIZE: usize = 10;
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_ACQUIRE_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_DB_PATH: &str = "./data/property_management.db";

/// Which backend the process runs against, chosen once.
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseConfig {
    Server(ServerConfig),
    Embedded(EmbeddedConfig),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub pool_size: usize,
    pub connect_timeout: Duration,
    pub acquire_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database: DEFAULT_DATABASE.to_string(),
            user: DEFAULT_USER.to_string(),
            password: String::new(),
            pool_size: DEFAULT_POOL_SIZE,
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            acquire_timeout: Duration::from_millis(DEFAULT_ACQUIRE_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedConfig {
    pub path: PathBuf,
}

impl EmbeddedConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// A private database that lives as long as the gateway.
    pub fn in_memory() -> Self {
        Self::new(crate::drivers::IN_MEMORY)
    }
}

impl Default for EmbeddedConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DB_PATH)
    }
}

impl DatabaseConfig {
    /// Read the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend = get("DB_TYPE").map(|v| v.trim().to_ascii_lowercase());
        match backend.as_deref() {
            None | Some("sqlite") | Some("embedded") => {
                let path = get("DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
                Ok(DatabaseConfig::Embedded(EmbeddedConfig::new(path)))
            }
            Some("postgres") | Some("postgresql") | Some("server") => {
                let defaults = ServerConfig::default();
                let pool_size = parse_or("DB_POOL_SIZE", get("DB_POOL_SIZE"), defaults.pool_size)?;
                if pool_size == 0 {
                    return Err(PropDbError::InvalidConfig(
                        "DB_POOL_SIZE must be at least 1".to_string(),
                    ));
                }
                Ok(DatabaseConfig::Server(ServerConfig {
                    host: get("DB_HOST").unwrap_or(defaults.host),
                    port: parse_or("DB_PORT", get("DB_PORT"), defaults.port)?,
                    database: get("DB_NAME").unwrap_or(defaults.database),
                    user: get("DB_USER").unwrap_or(defaults.user),
                    password: get("DB_PASSWORD").unwrap_or(defaults.password),
                    pool_size,
                    connect_timeout: Duration::from_millis(parse_or(
                        "DB_CONNECT_TIMEOUT_MS",
                        get("DB_CONNECT_TIMEOUT_MS"),
                        DEFAULT_CONNECT_TIMEOUT_MS,
                    )?),
                    acquire_timeout: Duration::from_millis(parse_or(
                        "DB_ACQUIRE_TIMEOUT_MS",
                        get("DB_ACQUIRE_TIMEOUT_MS"),
                        DEFAULT_ACQUIRE_TIMEOUT_MS,
                    )?),
                }))
            }
            Some(other) => Err(PropDbError::InvalidConfig(format!(
                "unknown DB_TYPE '{}' (expected postgres or sqlite)",
                other
            ))),
        }
    }
}

fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T> {
    match value {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            PropDbError::InvalidConfig(format!("{} has invalid value '{}'", key, raw))
        }),
    }
}
