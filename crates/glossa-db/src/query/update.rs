use super::{
    bind::{ArgumentBuckets, Bucket},
    state::{ensure_identifier, CompiledStatement, QueryState},
};
use crate::{
    error::{DbError, Result},
    helpers::Row,
};

impl QueryState {
    /// Builds `UPDATE table SET a = ?, b = ? WHERE ...`.
    ///
    /// Fails with [`DbError::MissingWhere`] when no condition was collected.
    pub fn compile_update(&self, table: &str, values: &Row) -> Result<CompiledStatement> {
        ensure_identifier(table)?;
        let where_sql = self.where_sql().ok_or(DbError::MissingWhere {
            operation: "update",
        })?;

        let mut sets = Vec::with_capacity(values.len());
        for column in values.keys() {
            ensure_identifier(column)?;
            sets.push(format!("{} = ?", column));
        }

        let mut args = ArgumentBuckets::default();
        args.extend(Bucket::Update, values.values().cloned());
        args.extend(Bucket::Where, self.args.get(Bucket::Where).iter().cloned());

        Ok(CompiledStatement {
            sql: format!("UPDATE {} SET {} {}", table, sets.join(", "), where_sql),
            args: args.bind(),
        })
    }
}
