//! Error types for glossa-core.

use glossa_config::error::ConfigError;
use glossa_db::error::DbError;
use miette::Diagnostic;
use thiserror::Error;

use crate::{registry::Method, status::StatusCode};

/// Core error type for entity and module operations.
#[derive(Error, Diagnostic, Debug)]
pub enum CoreError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DbError),

    #[error("Invalid input: {0}")]
    #[diagnostic(code(glossa::validation))]
    Validation(String),

    #[error("Entry '{0}' not found")]
    #[diagnostic(
        code(glossa::not_found),
        help("Look entries up by numeric id or by alias")
    )]
    NotFound(String),

    #[error("Data entry '{0}' not found")]
    #[diagnostic(code(glossa::data_not_found))]
    DataNotFound(String),

    #[error("An entry with alias '{0}' already exists")]
    #[diagnostic(
        code(glossa::conflict),
        help("Choose a different alias or update the existing entry")
    )]
    Conflict(String),

    #[error("Method {method} is not supported here")]
    #[diagnostic(code(glossa::unsupported))]
    Unsupported { method: Method },

    #[error("Table '{0}' does not belong to this module")]
    #[diagnostic(
        code(glossa::table_not_found),
        help("Check the module's data_tables and the configured catalog")
    )]
    TableNotFound(String),

    #[error("Module '{0}' not found")]
    #[diagnostic(
        code(glossa::module_not_found),
        help("Use a numeric id or the bundle.alias form, e.g. 'content.pages'")
    )]
    ModuleNotFound(String),
}

impl CoreError {
    /// Status code reported to clients for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Config(_) | Self::Database(_) => StatusCode::DbFail,
            Self::Validation(_) => StatusCode::InputInvalid,
            Self::NotFound(_) => StatusCode::EntryNotFound,
            Self::DataNotFound(_) => StatusCode::DataNotFound,
            Self::Conflict(_) => StatusCode::EntryExists,
            Self::Unsupported { .. } => StatusCode::MethodUnsupported,
            Self::TableNotFound(_) => StatusCode::TableNotFound,
            Self::ModuleNotFound(_) => StatusCode::ModuleNotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            CoreError::Validation("alias".into()).status(),
            StatusCode::InputInvalid
        );
        assert_eq!(
            CoreError::Conflict("home".into()).status(),
            StatusCode::EntryExists
        );
        assert_eq!(
            CoreError::Database(DbError::Poisoned).status(),
            StatusCode::DbFail
        );
        assert_eq!(
            CoreError::Unsupported {
                method: Method::Put
            }
            .status(),
            StatusCode::MethodUnsupported
        );
    }

    #[test]
    fn test_display() {
        let err = CoreError::Unsupported {
            method: Method::Delete,
        };
        assert_eq!(err.to_string(), "Method DELETE is not supported here");
        assert_eq!(
            CoreError::ModuleNotFound("pages".into()).to_string(),
            "Module 'pages' not found"
        );
    }
}
