//! SELECT compilation.

use super::state::{ensure_identifier, CompiledStatement, QueryState};
use crate::error::Result;

impl QueryState {
    /// Assembles a SELECT in fixed clause order: select, from, join, where,
    /// order, limit.
    ///
    /// Only join, where and order text carries placeholders, so binding the
    /// buckets in priority order lines values up with them.
    pub fn compile_select(&self) -> Result<CompiledStatement> {
        let mut parts = vec![format!(
            "SELECT {}",
            self.select.as_deref().unwrap_or("*")
        )];

        if let Some(from) = &self.from {
            ensure_identifier(&from.table)?;
            if let Some(alias) = &from.alias {
                ensure_identifier(alias)?;
            }
            parts.push(from.to_string());
        }

        for join in &self.joins {
            ensure_identifier(&join.table)?;
            if let Some(alias) = &join.alias {
                ensure_identifier(alias)?;
            }
            parts.push(join.to_string());
        }

        if let Some(where_sql) = self.where_sql() {
            parts.push(where_sql);
        }

        if !self.orders.is_empty() {
            let orders = self
                .orders
                .iter()
                .map(|o| format!("{} {}", o.expression, o.direction.as_sql()))
                .collect::<Vec<_>>();
            parts.push(format!("ORDER BY {}", orders.join(", ")));
        }

        if let Some(limit) = &self.limit {
            parts.push(limit.to_string());
        }

        Ok(CompiledStatement {
            sql: parts.join(" "),
            args: self.args.bind(),
        })
    }
}
