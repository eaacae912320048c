//! Core traits that power the query builder.
//!
//! These traits define the contract for:
//! - Building SQL boolean fragments with bound values (`Expression`)
//! - Converting result rows into Rust types (`FromRow`)

use serde_json::Value;

use crate::{error::Result, helpers::Row};

/// A type that renders to a SQL fragment with `?` placeholders.
///
/// When `to_sql` is called, it appends one bound value to `params` for every
/// placeholder it emits, in emission order.
pub trait Expression {
    /// Converts this expression into a SQL fragment and appends bound parameters.
    ///
    /// # Example
    ///
    /// ```rust
    /// use glossa_db::predicate::Predicate;
    /// use glossa_db::traits::Expression as _;
    ///
    /// let expr = Predicate::gt("views", 10);
    /// let mut params = vec![];
    /// let sql = expr.to_sql(&mut params);
    /// assert_eq!(sql, "views > ?");
    /// assert_eq!(params, vec![serde_json::json!(10)]);
    /// ```
    fn to_sql(&self, params: &mut Vec<Value>) -> String;

    /// Renders into a fresh parameter list.
    fn compile(&self) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let sql = self.to_sql(&mut params);
        (sql, params)
    }
}

/// A trait for types that can be constructed from a result row.
///
/// # Example
///
/// ```rust
/// use glossa_db::{FromRow, Row};
///
/// struct Page {
///     alias: String,
/// }
///
/// impl FromRow for Page {
///     fn from_row(row: &Row) -> glossa_db::error::Result<Self> {
///         Ok(Page {
///             alias: row
///                 .get("alias")
///                 .and_then(|v| v.as_str())
///                 .unwrap_or_default()
///                 .to_string(),
///         })
///     }
/// }
/// ```
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> Result<Self>;
}
