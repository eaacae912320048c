use tracing::debug;

use super::{
    bind::{ArgumentBuckets, Bucket},
    state::{ensure_identifier, CompiledStatement, QueryState},
};
use crate::{error::Result, helpers::Row};

impl QueryState {
    /// Builds `INSERT INTO table (a, b) VALUES (?, ?)` from `values` in
    /// iteration order.
    ///
    /// Only the insert bucket is bound; other collected clauses do not apply to
    /// an INSERT and are ignored.
    pub fn compile_insert(&self, table: &str, values: &Row) -> Result<CompiledStatement> {
        ensure_identifier(table)?;
        for column in values.keys() {
            ensure_identifier(column)?;
        }

        if !self.args.is_empty() || self.has_where() {
            debug!("Ignoring collected clauses for INSERT INTO {}", table);
        }

        let columns = values.keys().map(String::as_str).collect::<Vec<_>>().join(", ");
        let placeholders = vec!["?"; values.len()].join(", ");

        let mut args = ArgumentBuckets::default();
        args.extend(Bucket::Insert, values.values().cloned());

        Ok(CompiledStatement {
            sql: format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table, columns, placeholders
            ),
            args: args.bind(),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::DbError;

    #[test]
    fn test_compile_insert() {
        let values = json!({ "alias": "home", "bundle": "core", "views": 3 });
        let compiled = QueryState::default()
            .compile_insert("pages", values.as_object().unwrap())
            .unwrap();

        assert_eq!(
            compiled.sql,
            "INSERT INTO pages (alias, bundle, views) VALUES (?, ?, ?)"
        );
        assert_eq!(compiled.args, vec![json!("home"), json!("core"), json!(3)]);
    }

    #[test]
    fn test_compile_insert_rejects_bad_column() {
        let values = json!({ "alias) VALUES (1); --": "x" });
        let result = QueryState::default().compile_insert("pages", values.as_object().unwrap());
        assert!(matches!(result, Err(DbError::InvalidIdentifier(_))));
    }
}
