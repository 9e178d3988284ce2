//! Environment-driven configuration for storage and logging.
//!
//! # Responsibility
//! - Resolve the database location and credentials handed to the storage provider.
//! - Resolve logger level and destination.
//!
//! # Invariants
//! - Credentials are carried opaquely and never included in `Debug` output.
//! - Parsing is pure: `from_lookup` never touches the process environment.

use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_DB_URL: &str = "CLIENTDB_URL";
pub const ENV_DB_USER: &str = "CLIENTDB_USER";
pub const ENV_DB_PASSWORD: &str = "CLIENTDB_PASSWORD";
pub const ENV_LOG_LEVEL: &str = "CLIENTDB_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "CLIENTDB_LOG_DIR";

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, message: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(key) => write!(f, "missing required setting `{key}`"),
            Self::Invalid { key, message } => write!(f, "invalid setting `{key}`: {message}"),
        }
    }
}

impl Error for ConfigError {}

/// Where the SQLite database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageTarget {
    Memory,
    File(PathBuf),
}

impl StorageTarget {
    /// Parses `sqlite::memory:`, `:memory:`, `sqlite://<path>`, `sqlite:<path>` or a bare path.
    pub fn parse(url: &str) -> ConfigResult<Self> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::Invalid {
                key: ENV_DB_URL,
                message: "value cannot be empty".to_string(),
            });
        }

        let path = trimmed
            .strip_prefix("sqlite://")
            .or_else(|| trimmed.strip_prefix("sqlite:"))
            .unwrap_or(trimmed);

        match path {
            ":memory:" => Ok(Self::Memory),
            "" => Err(ConfigError::Invalid {
                key: ENV_DB_URL,
                message: format!("`{trimmed}` names no database path"),
            }),
            file => Ok(Self::File(PathBuf::from(file))),
        }
    }
}

/// Connection settings consumed by the storage provider.
#[derive(Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub target: StorageTarget,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl Debug for StorageConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("target", &self.target)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl StorageConfig {
    pub fn in_memory() -> Self {
        Self {
            target: StorageTarget::Memory,
            user: None,
            password: None,
        }
    }

    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            target: StorageTarget::File(path.as_ref().to_path_buf()),
            user: None,
            password: None,
        }
    }

    /// Loads settings from the process environment, after reading `.env` if present.
    pub fn from_env() -> ConfigResult<Self> {
        load_dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = non_blank(lookup(ENV_DB_URL)).ok_or(ConfigError::Missing(ENV_DB_URL))?;

        Ok(Self {
            target: StorageTarget::parse(&url)?,
            user: non_blank(lookup(ENV_DB_USER)),
            password: lookup(ENV_DB_PASSWORD).filter(|value| !value.is_empty()),
        })
    }
}

/// Logger settings; `log_dir = None` logs to stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: crate::logging::default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl LoggingConfig {
    pub fn from_env() -> ConfigResult<Self> {
        load_dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let level = non_blank(lookup(ENV_LOG_LEVEL))
            .unwrap_or_else(|| crate::logging::default_log_level().to_string());

        let log_dir = match non_blank(lookup(ENV_LOG_DIR)) {
            Some(dir) => {
                let path = PathBuf::from(dir.trim());
                if !path.is_absolute() {
                    return Err(ConfigError::Invalid {
                        key: ENV_LOG_DIR,
                        message: format!("must be an absolute path, got `{}`", path.display()),
                    });
                }
                Some(path)
            }
            None => None,
        };

        Ok(Self { level, log_dir })
    }
}

fn load_dotenv() {
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            log::warn!("event=config_load module=config status=warn error={err}");
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}
