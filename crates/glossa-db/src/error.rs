//! Error types for glossa-db.

use miette::Diagnostic;
use thiserror::Error;

/// Database error type for glossa-db operations.
#[derive(Error, Diagnostic, Debug)]
pub enum DbError {
    #[error("Database connection failed: {0}")]
    #[diagnostic(
        code(glossa_db::connection),
        help("Check if the database file exists and is accessible")
    )]
    ConnectionError(String),

    #[error("Database query failed: {0}")]
    #[diagnostic(
        code(glossa_db::query),
        help("Inspect the statement logged at debug level (-vv)")
    )]
    QueryError(#[from] rusqlite::Error),

    #[error("Refusing to {operation} without a WHERE clause")]
    #[diagnostic(
        code(glossa_db::missing_where),
        help("Set a condition with `filter` or `where_raw` before updating or deleting")
    )]
    MissingWhere { operation: &'static str },

    #[error("Invalid identifier: `{0}`")]
    #[diagnostic(
        code(glossa_db::invalid_identifier),
        help("Identifiers may only contain letters, digits, underscores and dots")
    )]
    InvalidIdentifier(String),

    #[error("Thread lock poison error")]
    #[diagnostic(
        code(glossa_db::poison),
        help("This is an internal error, please report it")
    )]
    Poisoned,
}

/// Result type alias for glossa-db operations.
pub type Result<T> = std::result::Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_where_display() {
        let err = DbError::MissingWhere {
            operation: "delete",
        };
        assert_eq!(err.to_string(), "Refusing to delete without a WHERE clause");
    }

    #[test]
    fn test_invalid_identifier_display() {
        let err = DbError::InvalidIdentifier("name; DROP TABLE x".into());
        assert_eq!(err.to_string(), "Invalid identifier: `name; DROP TABLE x`");
    }
}
