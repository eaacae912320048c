use super::{
    bind::{ArgumentBuckets, Bucket},
    state::{ensure_identifier, CompiledStatement, QueryState},
};
use crate::error::{DbError, Result};

impl QueryState {
    /// Builds `DELETE FROM table WHERE ...`; a missing condition is an error.
    pub fn compile_delete(&self, table: &str) -> Result<CompiledStatement> {
        ensure_identifier(table)?;
        let where_sql = self.where_sql().ok_or(DbError::MissingWhere {
            operation: "delete",
        })?;

        let mut args = ArgumentBuckets::default();
        args.extend(Bucket::Where, self.args.get(Bucket::Where).iter().cloned());

        Ok(CompiledStatement {
            sql: format!("DELETE FROM {} {}", table, where_sql),
            args: args.bind(),
        })
    }
}
