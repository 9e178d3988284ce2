//! Client DAO contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide lifecycle operations over the `client` table.
//! - Encode optional columns as SQL NULL and decode them back to `None`.
//!
//! # Invariants
//! - Identifiers come from the insert itself (`RETURNING id`), never from a
//!   follow-up `max(id)` read.
//! - `save` checks and writes inside one immediate transaction; a record whose
//!   id is not in the table gets a fresh storage-assigned id.
//! - Name search folds case with Unicode rules via `client_fold`.
//! - Read paths reject unparseable persisted values instead of masking them.
//! - Client field values are never written to logs.

use crate::db::migrations::{current_version, latest_version};
use crate::db::{ConnectionPool, DbError, PooledConnection, FOLD_FUNCTION};
use crate::model::client::{Client, ClientId, ClientUpdate, ClientValidationError, Gender};
use chrono::NaiveDate;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const CLIENT_TABLE: &str = "client";
const CLIENT_COLUMNS: &[&str] = &["id", "name", "birthday", "gender"];
const BIRTHDAY_FORMAT: &str = "%Y-%m-%d";

const INSERT_SQL: &str = "INSERT INTO client (name, birthday, gender)
    VALUES (?1, ?2, ?3)
    RETURNING id;";
const SAVE_UPDATE_SQL: &str = "UPDATE client
    SET name = ?1, birthday = ?2, gender = ?3
    WHERE id = ?4
    RETURNING id;";
const SELECT_BY_ID_SQL: &str = "SELECT id, name, birthday, gender FROM client WHERE id = ?1;";
const SELECT_ALL_SQL: &str = "SELECT id, name, birthday, gender FROM client ORDER BY id;";
const SEARCH_BY_NAME_SQL: &str = "SELECT id, name, birthday, gender
    FROM client
    WHERE instr(client_fold(name), client_fold(?1)) > 0
    ORDER BY id;";
const UPDATE_SQL: &str = "UPDATE client
    SET name = ?1, birthday = ?2, gender = ?3
    WHERE id = ?4;";
const DELETE_BY_ID_SQL: &str = "DELETE FROM client WHERE id = ?1;";
const EXISTS_SQL: &str = "SELECT EXISTS(SELECT 1 FROM client WHERE id = ?1);";
const COUNT_SQL: &str = "SELECT COUNT(*) FROM client;";
const CLEAR_SQL: &str = "DELETE FROM client;";

pub type RepoResult<T> = Result<T, RepoError>;

/// Error returned by client DAO operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ClientValidationError),
    Db(DbError),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredFunction(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted client data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}; open it through the db module"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table `{table}` is missing"),
            Self::MissingRequiredFunction(name) => {
                write!(f, "required SQL function `{name}` is not registered")
            }
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column `{table}.{column}` is missing")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ClientValidationError> for RepoError {
    fn from(value: ClientValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<r2d2::Error> for RepoError {
    fn from(value: r2d2::Error) -> Self {
        Self::Db(DbError::Pool(value))
    }
}

/// Data access contract for client records.
pub trait ClientDao {
    /// Inserts a new row and returns the identifier generated for it.
    ///
    /// Any `client.id` is ignored.
    fn create(&self, client: &Client) -> RepoResult<ClientId>;
    /// Returns `None` when no row has this id.
    fn get_by_id(&self, id: ClientId) -> RepoResult<Option<Client>>;
    /// Returns every row ordered by id.
    fn get_all(&self) -> RepoResult<Vec<Client>>;
    /// Overwrites every column of the row with `update.id`.
    ///
    /// Updating an id with no row is a no-op.
    fn update(&self, update: &ClientUpdate) -> RepoResult<()>;
    /// Removes the row if present. Missing rows are not an error.
    fn delete_by_id(&self, id: ClientId) -> RepoResult<()>;
    /// Substring match on name, case-insensitive under Unicode lowercasing.
    ///
    /// The query is matched literally; rows with no name never match.
    fn search_by_name(&self, query: &str) -> RepoResult<Vec<Client>>;
    fn exists(&self, id: ClientId) -> RepoResult<bool>;
    /// Overwrites the row when `client.id` exists, otherwise creates a new row.
    ///
    /// Returns the existing id or the freshly assigned one.
    fn save(&self, client: &Client) -> RepoResult<ClientId>;
    /// Deletes every row.
    fn clear(&self) -> RepoResult<()>;
    fn count(&self) -> RepoResult<u64>;
}

/// SQLite-backed client DAO.
///
/// Each call checks out its own pooled connection; statements are cached per
/// connection, so concurrent callers never share parameter bindings.
#[derive(Clone)]
pub struct SqliteClientDao {
    pool: ConnectionPool,
}

impl SqliteClientDao {
    /// Wraps a pool after verifying its schema was bootstrapped by [`crate::db`].
    pub fn try_new(pool: ConnectionPool) -> RepoResult<Self> {
        let conn = pool.get()?;
        ensure_schema(&conn)?;
        drop(conn);
        Ok(Self { pool })
    }

    fn conn(&self) -> RepoResult<PooledConnection> {
        Ok(self.pool.get()?)
    }
}

impl ClientDao for SqliteClientDao {
    fn create(&self, client: &Client) -> RepoResult<ClientId> {
        let conn = self.conn()?;
        let id = insert_client(&conn, client)?;

        debug!("event=client_create module=repo status=ok id={id}");
        Ok(id)
    }

    fn get_by_id(&self, id: ClientId) -> RepoResult<Option<Client>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(SELECT_BY_ID_SQL)?;
        let mut rows = stmt.query([id])?;

        match rows.next()? {
            Some(row) => Ok(Some(parse_client_row(row)?)),
            None => Ok(None),
        }
    }

    fn get_all(&self) -> RepoResult<Vec<Client>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(SELECT_ALL_SQL)?;
        let mut rows = stmt.query([])?;
        let mut clients = Vec::new();

        while let Some(row) = rows.next()? {
            clients.push(parse_client_row(row)?);
        }

        Ok(clients)
    }

    fn update(&self, update: &ClientUpdate) -> RepoResult<()> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(UPDATE_SQL)?;
        let updated = stmt.execute(params![
            update.name.as_str(),
            format_birthday(update.birthday),
            update.gender.as_str(),
            update.id,
        ])?;

        debug!(
            "event=client_update module=repo status=ok id={} updated={updated}",
            update.id
        );
        Ok(())
    }

    fn delete_by_id(&self, id: ClientId) -> RepoResult<()> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(DELETE_BY_ID_SQL)?;
        let removed = stmt.execute([id])?;

        debug!("event=client_delete module=repo status=ok id={id} removed={removed}");
        Ok(())
    }

    fn search_by_name(&self, query: &str) -> RepoResult<Vec<Client>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(SEARCH_BY_NAME_SQL)?;
        let mut rows = stmt.query([query])?;
        let mut clients = Vec::new();

        while let Some(row) = rows.next()? {
            clients.push(parse_client_row(row)?);
        }

        Ok(clients)
    }

    fn exists(&self, id: ClientId) -> RepoResult<bool> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(EXISTS_SQL)?;
        let exists = stmt.query_row([id], |row| row.get::<_, bool>(0))?;
        Ok(exists)
    }

    fn save(&self, client: &Client) -> RepoResult<ClientId> {
        let Some(requested_id) = client.id else {
            return self.create(client);
        };

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let updated: Option<ClientId> = tx
            .prepare_cached(SAVE_UPDATE_SQL)?
            .query_row(
                params![
                    client.name.as_deref(),
                    client.birthday.map(format_birthday),
                    client.gender.map(Gender::as_str),
                    requested_id,
                ],
                |row| row.get(0),
            )
            .optional()?;
        let (id, created) = match updated {
            Some(id) => (id, false),
            None => (insert_client(&tx, client)?, true),
        };
        tx.commit()?;

        debug!("event=client_save module=repo status=ok id={id} created={created}");
        Ok(id)
    }

    fn clear(&self) -> RepoResult<()> {
        let conn = self.conn()?;
        let removed = conn.prepare_cached(CLEAR_SQL)?.execute([])?;

        debug!("event=client_clear module=repo status=ok removed={removed}");
        Ok(())
    }

    fn count(&self) -> RepoResult<u64> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(COUNT_SQL)?;
        let count = stmt.query_row([], |row| row.get::<_, i64>(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count `{count}`")))
    }
}

/// Inserts `client` ignoring its id and returns the id SQLite generated.
fn insert_client(conn: &Connection, client: &Client) -> RepoResult<ClientId> {
    let mut stmt = conn.prepare_cached(INSERT_SQL)?;
    let id = stmt.query_row(
        params![
            client.name.as_deref(),
            client.birthday.map(format_birthday),
            client.gender.map(Gender::as_str),
        ],
        |row| row.get(0),
    )?;
    Ok(id)
}

fn ensure_schema(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let table_exists: bool = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1
        );",
        [CLIENT_TABLE],
        |row| row.get(0),
    )?;
    if !table_exists {
        return Err(RepoError::MissingRequiredTable(CLIENT_TABLE));
    }

    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1);")?;
    let present = stmt
        .query_map([CLIENT_TABLE], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    for &column in CLIENT_COLUMNS {
        if !present.iter().any(|name| name == column) {
            return Err(RepoError::MissingRequiredColumn {
                table: CLIENT_TABLE,
                column,
            });
        }
    }

    conn.query_row(&format!("SELECT {FOLD_FUNCTION}('');"), [], |_| Ok(()))
        .map_err(|_| RepoError::MissingRequiredFunction(FOLD_FUNCTION))?;

    Ok(())
}

fn parse_client_row(row: &Row<'_>) -> RepoResult<Client> {
    let id: ClientId = row.get("id")?;

    let birthday = match row.get::<_, Option<String>>("birthday")? {
        Some(value) => Some(parse_birthday(&value).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid birthday `{value}` in client.birthday for id {id}"
            ))
        })?),
        None => None,
    };

    let gender = match row.get::<_, Option<String>>("gender")? {
        Some(value) => Some(value.parse::<Gender>().map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid gender `{value}` in client.gender for id {id}"
            ))
        })?),
        None => None,
    };

    Ok(Client {
        id: Some(id),
        name: row.get("name")?,
        birthday,
        gender,
    })
}

fn format_birthday(date: NaiveDate) -> String {
    date.format(BIRTHDAY_FORMAT).to_string()
}

fn parse_birthday(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, BIRTHDAY_FORMAT).ok()
}
