//! Application-defined SQL functions registered on every pooled connection.
//!
//! # Invariants
//! - `client_fold(NULL)` is NULL; any other value is lowercased with Unicode
//!   rules, so name search is case-insensitive beyond ASCII.

use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

/// SQL name of the Unicode case-folding function.
pub const FOLD_FUNCTION: &str = "client_fold";

/// Registers every application function on `conn`.
pub fn register_functions(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.create_scalar_function(
        FOLD_FUNCTION,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|text| text.to_lowercase()))
        },
    )
}
