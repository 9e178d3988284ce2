//! Connection pool bootstrap for SQLite.
//!
//! # Responsibility
//! - Build file or in-memory pools from `StorageConfig`.
//! - Configure pragmas on every pooled connection.
//! - Run schema migrations before returning a usable pool.
//!
//! # Invariants
//! - Every pooled connection has `foreign_keys=ON`, a busy timeout and the
//!   application SQL functions.
//! - File databases run in WAL mode.
//! - In-memory pools hold exactly one connection that is never recycled,
//!   otherwise the database would vanish with it.

use super::functions::register_functions;
use super::migrations::apply_migrations;
use super::DbResult;
use crate::config::{StorageConfig, StorageTarget};
use log::{error, info};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::time::{Duration, Instant};

/// Shared handle injected into DAO constructors.
pub type ConnectionPool = r2d2::Pool<SqliteConnectionManager>;
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

const FILE_POOL_MAX_SIZE: u32 = 4;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const CHECKOUT_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens the database described by `config` and applies pending migrations.
///
/// `user` and `password` are ignored by SQLite.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_pool(config: &StorageConfig) -> DbResult<ConnectionPool> {
    match &config.target {
        StorageTarget::Memory => open_pool_in_memory(),
        StorageTarget::File(path) => {
            let manager =
                SqliteConnectionManager::file(path).with_init(configure_file_connection);
            build_pool(manager, FILE_POOL_MAX_SIZE, "file")
        }
    }
}

/// Opens a private in-memory database and applies all migrations.
pub fn open_pool_in_memory() -> DbResult<ConnectionPool> {
    let manager = SqliteConnectionManager::memory().with_init(configure_connection);
    build_pool(manager, 1, "memory")
}

fn build_pool(
    manager: SqliteConnectionManager,
    max_size: u32,
    mode: &'static str,
) -> DbResult<ConnectionPool> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode} pool_size={max_size}");

    let pool = match r2d2::Pool::builder()
        .max_size(max_size)
        .idle_timeout(None)
        .max_lifetime(None)
        .connection_timeout(CHECKOUT_TIMEOUT)
        .build(manager)
    {
        Ok(pool) => pool,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={err}",
                started_at.elapsed().as_millis()
            );
            return Err(err.into());
        }
    };

    match migrate_pool(&pool) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={mode} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(pool)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_bootstrap_failed error={err}",
                started_at.elapsed().as_millis()
            );
            Err(err)
        }
    }
}

fn migrate_pool(pool: &ConnectionPool) -> DbResult<()> {
    let mut conn = pool.get()?;
    apply_migrations(&mut conn)
}

fn configure_file_connection(conn: &mut Connection) -> Result<(), rusqlite::Error> {
    configure_connection(conn)?;
    conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get::<_, String>(0))?;
    Ok(())
}

fn configure_connection(conn: &mut Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    register_functions(conn)
}
