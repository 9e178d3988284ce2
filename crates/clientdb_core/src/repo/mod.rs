//! Data access layer for client records.
//!
//! # Responsibility
//! - Define the DAO contract used by callers.
//! - Keep SQLite query details behind that contract.
//!
//! # Invariants
//! - Not-found on read, update or delete is a value (`None` / no-op), not an error.

pub mod client_repo;
