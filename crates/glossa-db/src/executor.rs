//! The statement execution primitive the builder runs against.

use rusqlite::{params_from_iter, Connection, Transaction};
use serde_json::Value;

use crate::{
    error::Result,
    helpers::{from_value_ref, Row, SqlParam},
};

/// Executes compiled statement text with positional arguments.
///
/// Implemented for [`rusqlite::Connection`] and [`rusqlite::Transaction`];
/// tests may provide recording implementations.
pub trait Executor {
    /// Runs a statement that returns rows.
    fn query(&self, sql: &str, args: &[Value]) -> Result<Vec<Row>>;

    /// Runs a statement that modifies data, returning the number of affected rows.
    fn execute(&self, sql: &str, args: &[Value]) -> Result<usize>;

    /// Primary key generated by the most recent successful INSERT.
    fn last_insert_id(&self) -> i64;
}

impl Executor for Connection {
    fn query(&self, sql: &str, args: &[Value]) -> Result<Vec<Row>> {
        let mut stmt = self.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query(params_from_iter(args.iter().map(SqlParam)))?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut map = Row::new();
            for (idx, name) in columns.iter().enumerate() {
                map.insert(name.clone(), from_value_ref(row.get_ref(idx)?));
            }
            result.push(map);
        }

        Ok(result)
    }

    fn execute(&self, sql: &str, args: &[Value]) -> Result<usize> {
        let mut stmt = self.prepare(sql)?;
        Ok(stmt.execute(params_from_iter(args.iter().map(SqlParam)))?)
    }

    fn last_insert_id(&self) -> i64 {
        self.last_insert_rowid()
    }
}

impl Executor for Transaction<'_> {
    fn query(&self, sql: &str, args: &[Value]) -> Result<Vec<Row>> {
        Executor::query(&**self, sql, args)
    }

    fn execute(&self, sql: &str, args: &[Value]) -> Result<usize> {
        Executor::execute(&**self, sql, args)
    }

    fn last_insert_id(&self) -> i64 {
        self.last_insert_rowid()
    }
}
