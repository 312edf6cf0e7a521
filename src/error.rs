use thiserror::Error;

/// A PostgreSQL-compatible error carrying a 5-character SQLSTATE code.
///
/// The embedded engine reports errors as free text; callers that speak PG
/// semantics want SQLSTATE codes, so the message is classified by substring
/// into the closest PG code. The engine stays the source of truth for what
/// actually went wrong.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct PgError {
    code: &'static str,
    message: String,
    #[source]
    source: Option<rusqlite::Error>,
}

impl PgError {
    pub fn new(code: &'static str, message: impl Into<String>) -> PgError {
        PgError {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// The 5-character SQLSTATE error code.
    pub fn sqlstate(&self) -> &str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<rusqlite::Error> for PgError {
    fn from(err: rusqlite::Error) -> PgError {
        let message = err.to_string();
        PgError {
            code: classify_sqlite_error(&message),
            message,
            source: Some(err),
        }
    }
}

/// Maps a SQLite error message to a PG SQLSTATE code.
fn classify_sqlite_error(msg: &str) -> &'static str {
    let lower = msg.to_lowercase();

    if lower.contains("unique constraint") {
        "23505" // unique_violation
    } else if lower.contains("not null constraint") {
        "23502" // not_null_violation
    } else if lower.contains("foreign key constraint") {
        "23503" // foreign_key_violation
    } else if lower.contains("check constraint") {
        "23514" // check_violation
    } else if lower.contains("no such table") {
        "42P01" // undefined_table
    } else if lower.contains("no such column") {
        "42703" // undefined_column
    } else if lower.contains("syntax error") {
        "42601" // syntax_error
    } else {
        "XX000" // internal_error
    }
}
