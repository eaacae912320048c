//! Accumulated clause state of a statement under construction.

use serde_json::Value;

use super::{
    bind::ArgumentBuckets,
    clause::{FromClause, JoinClause, LimitClause, OrderClause},
};
use crate::{error::DbError, error::Result, helpers::is_identifier};

/// Everything a [`super::QueryBuilder`] has collected since the last execution.
///
/// `Default` is the cleared state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryState {
    pub select: Option<String>,
    pub from: Option<FromClause>,
    pub joins: Vec<JoinClause>,
    pub conditions: Vec<String>,
    pub orders: Vec<OrderClause>,
    pub limit: Option<LimitClause>,
    pub args: ArgumentBuckets,
}

impl QueryState {
    pub fn is_empty(&self) -> bool {
        *self == QueryState::default()
    }

    pub fn has_where(&self) -> bool {
        !self.conditions.is_empty()
    }

    /// Renders the WHERE clause, parenthesizing conditions when more than one
    /// was added.
    pub(crate) fn where_sql(&self) -> Option<String> {
        match self.conditions.as_slice() {
            [] => None,
            [single] => Some(format!("WHERE {}", single)),
            many => Some(format!(
                "WHERE {}",
                many.iter()
                    .map(|c| format!("({})", c))
                    .collect::<Vec<_>>()
                    .join(" AND ")
            )),
        }
    }
}

/// Final statement text and its positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStatement {
    pub sql: String,
    pub args: Vec<Value>,
}

pub(crate) fn ensure_identifier(name: &str) -> Result<()> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(DbError::InvalidIdentifier(name.to_string()))
    }
}
