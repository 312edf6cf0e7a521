//! pglike — PostgreSQL-flavored SQL on an embedded SQLite engine.
//!
//! The core is [`sql::translate`]: a token-level rewriter that turns a
//! PostgreSQL statement into a SQLite-compatible one in a single pass of
//! ordered sub-passes. [`SqliteBackend`] is the driver-style shim around it:
//! it translates every statement, emulates sequences, registers the
//! PG-compatible runtime functions, and classifies engine errors into
//! SQLSTATE codes.

pub mod backend;
pub mod error;
pub mod sql;

pub use backend::sqlite::{QueryResult, SqliteBackend};
pub use error::PgError;
pub use sql::translate;
