//! Local audit journal of administrative operations.
//!
//! - `model`: the rows the journal stores and returns.
//! - `repo`: SQL-only functions over a SQLite pool.
//!
//! Callers import from `aula_admin::db`; the repository API is re-exported.

pub mod model;
pub mod repo;

pub use repo::*;

pub use model::{AuditEntry, AuditOutcome, NewAuditEntry};
