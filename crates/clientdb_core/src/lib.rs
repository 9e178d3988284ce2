//! Data access layer for client records backed by SQLite.
//!
//! Callers open a [`db::ConnectionPool`] through [`db::open_pool`] and inject it
//! into [`SqliteClientDao::try_new`].

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;

pub use config::{ConfigError, LoggingConfig, StorageConfig, StorageTarget};
pub use db::{open_pool, open_pool_in_memory, ConnectionPool, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::client::{Client, ClientId, ClientUpdate, ClientValidationError, Gender};
pub use repo::client_repo::{ClientDao, RepoError, RepoResult, SqliteClientDao};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
