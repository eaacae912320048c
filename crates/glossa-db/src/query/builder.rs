//! The fluent query builder.

use std::mem;

use serde_json::{Map, Value};
use tracing::debug;

use super::{
    bind::Bucket,
    clause::{Direction, FromClause, JoinClause, JoinType, LimitClause, OrderClause},
    state::{CompiledStatement, QueryState},
};
use crate::{
    error::Result,
    executor::Executor,
    helpers::{is_identifier, Row},
    predicate::Filter,
    traits::Expression,
};

/// Outcome of the last execution.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// Rows returned by [`QueryBuilder::run`].
    Rows(Vec<Row>),
    /// Whether the last insert/update/delete wrote anything.
    Written(bool),
}

/// Projection accepted by [`QueryBuilder::select`]: a string or a list of fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection(String);

impl From<&str> for Projection {
    fn from(fields: &str) -> Self {
        Projection(fields.to_string())
    }
}

impl From<String> for Projection {
    fn from(fields: String) -> Self {
        Projection(fields)
    }
}

impl From<&[&str]> for Projection {
    fn from(fields: &[&str]) -> Self {
        Projection(fields.join(", "))
    }
}

impl<const N: usize> From<[&str; N]> for Projection {
    fn from(fields: [&str; N]) -> Self {
        Projection(fields.join(", "))
    }
}

impl From<Vec<String>> for Projection {
    fn from(fields: Vec<String>) -> Self {
        Projection(fields.join(", "))
    }
}

/// A SQL statement builder over an [`Executor`].
///
/// Clause methods accumulate into a [`QueryState`]; `run`, `insert`, `update`
/// and `delete` take that state out (leaving it cleared whether or not
/// execution succeeds), compile it and execute it.
///
/// # Example
///
/// ```rust
/// use glossa_db::QueryBuilder;
/// use rusqlite::Connection;
/// use serde_json::json;
///
/// let conn = Connection::open_in_memory().unwrap();
/// conn.execute_batch("CREATE TABLE pages (id INTEGER PRIMARY KEY, alias TEXT, views INTEGER)")
///     .unwrap();
///
/// let mut qb = QueryBuilder::new(&conn);
/// let row = json!({ "alias": "home", "views": 12 });
/// qb.insert("pages", row.as_object().unwrap()).unwrap();
///
/// let filter = json!({ "views>": 10, "!alias": "about" });
/// let rows = qb
///     .select(["id", "alias"])
///     .from("pages", None)
///     .filter(filter.as_object().unwrap())
///     .order("alias", "DESC")
///     .limit(10, None)
///     .run()
///     .unwrap()
///     .rows()
///     .to_vec();
///
/// assert_eq!(rows.len(), 1);
/// assert_eq!(rows[0]["alias"], json!("home"));
/// ```
pub struct QueryBuilder<'e, E: ?Sized> {
    executor: &'e E,
    state: QueryState,
    last_query: Option<String>,
    result: Option<QueryOutcome>,
}

impl<'e, E: Executor + ?Sized> QueryBuilder<'e, E> {
    pub fn new(executor: &'e E) -> Self {
        Self {
            executor,
            state: QueryState::default(),
            last_query: None,
            result: None,
        }
    }

    pub fn executor(&self) -> &'e E {
        self.executor
    }

    /// Sets the projection.
    pub fn select(&mut self, fields: impl Into<Projection>) -> &mut Self {
        self.state.select = Some(fields.into().0);
        self
    }

    pub fn from(&mut self, table: &str, alias: Option<&str>) -> &mut Self {
        self.state.from = Some(FromClause {
            table: table.to_string(),
            alias: alias.map(String::from),
        });
        self
    }

    /// Appends a join. `values` bind the placeholders in `on`; an unknown
    /// `kind` is treated as `LEFT`.
    pub fn join<I>(
        &mut self,
        table: &str,
        on: &str,
        alias: Option<&str>,
        values: I,
        kind: &str,
    ) -> &mut Self
    where
        I: IntoIterator<Item = Value>,
    {
        self.state.args.extend(Bucket::Join, values);
        self.state.joins.push(JoinClause {
            kind: JoinType::parse_lenient(kind),
            table: table.to_string(),
            alias: alias.map(String::from),
            on: on.to_string(),
        });
        self
    }

    /// Adds a raw condition. The caller guarantees `values` match the
    /// placeholders in `fragment`.
    ///
    /// Conditions accumulate: each call adds one more, and all of them are
    /// joined with `AND`.
    pub fn where_raw<I>(&mut self, fragment: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = Value>,
    {
        self.state.args.extend(Bucket::Where, values);
        self.state.conditions.push(fragment.to_string());
        self
    }

    /// Compiles a filter mapping and adds it as a condition.
    ///
    /// A mapping that compiles to nothing leaves the where clause untouched.
    pub fn filter(&mut self, filter: &Map<String, Value>) -> &mut Self {
        self.where_filter(&Filter::parse(filter))
    }

    pub fn where_filter(&mut self, filter: &Filter) -> &mut Self {
        let mut params = Vec::with_capacity(filter.arity());
        let fragment = filter.to_sql(&mut params);
        if !fragment.is_empty() {
            self.where_raw(&fragment, params);
        }
        self
    }

    /// Orders by a column. Invalid column names make this a no-op. `DESC` in
    /// any letter case sorts descending, anything else ascending.
    pub fn order(&mut self, column: &str, direction: &str) -> &mut Self {
        if !is_identifier(column) {
            debug!("Ignoring ORDER BY on invalid column `{}`", column);
            return self;
        }

        self.state.orders.push(OrderClause {
            expression: column.to_string(),
            direction: Direction::parse_lenient(direction),
        });
        self
    }

    /// Orders by a caller-supplied expression whose placeholders are bound by `values`.
    pub fn order_raw<I>(&mut self, expression: &str, direction: Direction, values: I) -> &mut Self
    where
        I: IntoIterator<Item = Value>,
    {
        self.state.args.extend(Bucket::Order, values);
        self.state.orders.push(OrderClause {
            expression: expression.to_string(),
            direction,
        });
        self
    }

    /// Sets the limit. A non-positive `count` becomes 1; `offset` is only
    /// emitted when positive.
    pub fn limit(&mut self, count: i64, offset: Option<i64>) -> &mut Self {
        let count = if count > 0 { count.unsigned_abs() } else { 1 };
        let offset = offset.filter(|o| *o > 0).map(i64::unsigned_abs);
        self.state.limit = Some(LimitClause { count, offset });
        self
    }

    /// Compiles and executes the collected SELECT, storing the rows.
    pub fn run(&mut self) -> Result<&mut Self> {
        let state = mem::take(&mut self.state);
        self.result = None;

        let compiled = state.compile_select()?;
        let rows = self.query(&compiled)?;
        self.result = Some(QueryOutcome::Rows(rows));
        Ok(self)
    }

    /// Inserts `values` into `table`.
    ///
    /// Returns `Ok(None)` without touching the database when `values` is
    /// empty, otherwise the generated primary key.
    pub fn insert(&mut self, table: &str, values: &Row) -> Result<Option<i64>> {
        let state = mem::take(&mut self.state);
        self.result = None;

        if values.is_empty() {
            self.result = Some(QueryOutcome::Written(false));
            return Ok(None);
        }

        let compiled = state.compile_insert(table, values)?;
        self.execute(&compiled)?;
        self.result = Some(QueryOutcome::Written(true));
        Ok(Some(self.executor.last_insert_id()))
    }

    /// Updates rows matching the collected where clause.
    ///
    /// Returns `Ok(None)` when `values` is empty, otherwise the affected row
    /// count. Fails without executing when no where clause was set.
    pub fn update(&mut self, table: &str, values: &Row) -> Result<Option<usize>> {
        let state = mem::take(&mut self.state);
        self.result = None;

        let compiled = state.compile_update(table, values)?;
        if values.is_empty() {
            self.result = Some(QueryOutcome::Written(false));
            return Ok(None);
        }

        let affected = self.execute(&compiled)?;
        self.result = Some(QueryOutcome::Written(affected > 0));
        Ok(Some(affected))
    }

    /// Deletes rows matching the collected where clause.
    pub fn delete(&mut self, table: &str) -> Result<usize> {
        let state = mem::take(&mut self.state);
        self.result = None;

        let compiled = state.compile_delete(table)?;
        let affected = self.execute(&compiled)?;
        self.result = Some(QueryOutcome::Written(affected > 0));
        Ok(affected)
    }

    pub fn result(&self) -> Option<&QueryOutcome> {
        self.result.as_ref()
    }

    /// Rows of the last SELECT, or an empty slice.
    pub fn rows(&self) -> &[Row] {
        match &self.result {
            Some(QueryOutcome::Rows(rows)) => rows,
            _ => &[],
        }
    }

    /// Takes the rows of the last SELECT out of the builder.
    pub fn take_rows(&mut self) -> Vec<Row> {
        match self.result.take() {
            Some(QueryOutcome::Rows(rows)) => rows,
            other => {
                self.result = other;
                Vec::new()
            }
        }
    }

    /// Text of the last compiled statement, placeholders not substituted.
    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    /// Resets all clauses and argument buckets.
    pub fn clear(&mut self) -> &mut Self {
        self.state = QueryState::default();
        self
    }

    fn query(&mut self, compiled: &CompiledStatement) -> Result<Vec<Row>> {
        self.trace(compiled);
        self.executor.query(&compiled.sql, &compiled.args)
    }

    fn execute(&mut self, compiled: &CompiledStatement) -> Result<usize> {
        self.trace(compiled);
        self.executor.execute(&compiled.sql, &compiled.args)
    }

    fn trace(&mut self, compiled: &CompiledStatement) {
        debug!(
            "Executing `{}` with {} argument(s)",
            compiled.sql,
            compiled.args.len()
        );
        self.last_query = Some(compiled.sql.clone());
    }
}
