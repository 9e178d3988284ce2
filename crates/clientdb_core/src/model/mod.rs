//! Client domain model.
//!
//! # Responsibility
//! - Define the record type persisted by the DAO layer.
//! - Keep optional columns as explicit `Option` values.

pub mod client;
