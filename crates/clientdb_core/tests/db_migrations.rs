use clientdb_core::db::migrations::{apply_migrations, latest_version};
use clientdb_core::db::{open_pool, open_pool_in_memory, register_functions, DbError};
use clientdb_core::{RepoError, SqliteClientDao, StorageConfig};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

fn raw_memory_pool(setup_sql: &str) -> r2d2::Pool<SqliteConnectionManager> {
    let pool = r2d2::Pool::builder()
        .max_size(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .build(SqliteConnectionManager::memory())
        .unwrap();
    pool.get().unwrap().execute_batch(setup_sql).unwrap();
    pool
}

#[test]
fn open_pool_in_memory_applies_all_migrations() {
    let pool = open_pool_in_memory().unwrap();
    let conn = pool.get().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "client");
}

#[test]
fn open_pool_honours_memory_target() {
    let pool = open_pool(&StorageConfig::in_memory()).unwrap();
    assert_eq!(pool.max_size(), 1);
    assert_table_exists(&pool.get().unwrap(), "client");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clients.db");

    let first = open_pool(&StorageConfig::file(&path)).unwrap();
    assert_eq!(schema_version(&first.get().unwrap()), latest_version());
    drop(first);

    let second = open_pool(&StorageConfig::file(&path)).unwrap();
    assert_eq!(schema_version(&second.get().unwrap()), latest_version());
    assert_table_exists(&second.get().unwrap(), "client");
}

#[test]
fn file_connections_use_wal_and_foreign_keys() {
    let dir = tempfile::tempdir().unwrap();
    let pool = open_pool(&StorageConfig::file(dir.path().join("clients.db"))).unwrap();
    let conn = pool.get().unwrap();

    let journal: String = conn
        .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
        .unwrap();
    let foreign_keys: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(journal.to_ascii_lowercase(), "wal");
    assert_eq!(foreign_keys, 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_pool(&StorageConfig::file(&path)).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn dao_rejects_uninitialized_pool() {
    let pool = raw_memory_pool("PRAGMA user_version = 0;");

    match SqliteClientDao::try_new(pool) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert_eq!(expected_version, latest_version()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn dao_rejects_pool_without_client_table() {
    let pool = raw_memory_pool(&format!("PRAGMA user_version = {};", latest_version()));

    assert!(matches!(
        SqliteClientDao::try_new(pool),
        Err(RepoError::MissingRequiredTable("client"))
    ));
}

#[test]
fn dao_rejects_pool_missing_required_column() {
    let pool = raw_memory_pool(&format!(
        "CREATE TABLE client (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT,
            birthday TEXT
        );
        PRAGMA user_version = {};",
        latest_version()
    ));

    assert!(matches!(
        SqliteClientDao::try_new(pool),
        Err(RepoError::MissingRequiredColumn {
            table: "client",
            column: "gender"
        })
    ));
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}

#[test]
fn dao_rejects_pool_without_fold_function() {
    let pool = raw_memory_pool(&format!(
        "CREATE TABLE client (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT,
            birthday TEXT,
            gender TEXT
        );
        PRAGMA user_version = {};",
        latest_version()
    ));

    assert!(matches!(
        SqliteClientDao::try_new(pool),
        Err(RepoError::MissingRequiredFunction("client_fold"))
    ));
}

#[test]
fn dao_accepts_raw_pool_once_functions_are_registered() {
    let pool = r2d2::Pool::builder()
        .max_size(1)
        .build(SqliteConnectionManager::memory().with_init(|conn| register_functions(conn)))
        .unwrap();
    apply_migrations(&mut pool.get().unwrap()).unwrap();

    assert!(SqliteClientDao::try_new(pool).is_ok());
}
