//! Default CRUD over a bilingual entity.
//!
//! An entity lives in a primary table `t` (with `id` and `alias` columns) and a
//! companion table `t_lang` holding one row per locale, keyed by `(id_, locale)`
//! where `id_` references `t.id`.
//!
//! Two-table writes run inside a single transaction and are rolled back as a
//! whole when any statement fails.

use std::{fmt, sync::LazyLock};

use glossa_db::{
    helpers::{as_integer, scalar_text, to_json, Row},
    Database, Executor, QueryBuilder,
};
use percent_encoding::percent_decode_str;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{error::CoreError, CoreResult};

static ID_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(!?)id(-in|[<>!%])?$").expect("unable to compile id filter key regex")
});

pub fn lang_table(table: &str) -> String {
    format!("{}_lang", table)
}

/// Lookup key of an entity: a numeric id or an alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKey {
    Id(i64),
    Alias(String),
}

impl EntityKey {
    /// A key made only of ASCII digits is an id, anything else an alias.
    pub fn parse(key: &str) -> Self {
        if !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = key.parse() {
                return EntityKey::Id(id);
            }
        }
        EntityKey::Alias(key.to_string())
    }

    pub fn column(&self) -> &'static str {
        match self {
            EntityKey::Id(_) => "id",
            EntityKey::Alias(_) => "alias",
        }
    }

    pub fn value(&self) -> Value {
        match self {
            EntityKey::Id(id) => Value::from(*id),
            EntityKey::Alias(alias) => Value::from(alias.as_str()),
        }
    }

    /// Equality filter on this key, optionally qualified with `table`.
    pub fn filter(&self, table: Option<&str>) -> Row {
        let column = match table {
            Some(table) => format!("{}.{}", table, self.column()),
            None => self.column().to_string(),
        };
        Row::from_iter([(column, self.value())])
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Id(id) => write!(f, "{}", id),
            EntityKey::Alias(alias) => f.write_str(alias),
        }
    }
}

/// Localized listing on top of [`QueryBuilder`].
pub trait EntityQuery {
    /// Primes a SELECT of `table_lang.*, table.*` joined on the entity id and
    /// `locale`.
    fn default_select(&mut self, table: &str, locale: &str) -> &mut Self;

    /// Applies the `filter`, `order` and `limit` entries of `params`, runs the
    /// query and returns the rows.
    ///
    /// `filter` is either a mapping or a percent-encoded JSON string. Top-level
    /// keys on `id` are rewritten to the companion's `id_`, which is
    /// unambiguous once the tables are joined. `order` is `[column, direction?]`
    /// and `limit` is `[count, offset?]`.
    fn default_filters(&mut self, params: &Map<String, Value>) -> CoreResult<Vec<Row>>;
}

impl<E: Executor + ?Sized> EntityQuery for QueryBuilder<'_, E> {
    fn default_select(&mut self, table: &str, locale: &str) -> &mut Self {
        let lang = lang_table(table);
        let on = format!(
            "{table}.id = {lang}.id_ AND {lang}.locale = ?",
            table = table,
            lang = lang
        );

        self.select(format!("{}.*, {}.*", lang, table))
            .from(table, None)
            .join(&lang, &on, None, [Value::from(locale)], "LEFT")
    }

    fn default_filters(&mut self, params: &Map<String, Value>) -> CoreResult<Vec<Row>> {
        if let Some(filter) = params.get("filter").and_then(decode_filter) {
            self.filter(&rewrite_id_keys(&filter));
        }

        if let Some(order) = params.get("order") {
            let (column, direction) = match order {
                Value::Array(parts) => (
                    parts.first().map(scalar_text),
                    parts.get(1).map(scalar_text),
                ),
                other => (Some(scalar_text(other)), None),
            };
            if let Some(column) = column {
                self.order(&column, direction.as_deref().unwrap_or("ASC"));
            }
        }

        if let Some(limit) = params.get("limit") {
            let (count, offset) = match limit {
                Value::Array(parts) => (
                    parts.first().and_then(as_integer),
                    parts.get(1).and_then(as_integer),
                ),
                other => (as_integer(other), None),
            };
            self.limit(count.unwrap_or(0), offset);
        }

        Ok(self.run()?.take_rows())
    }
}

/// Decodes a transport-encoded filter. Undecodable input yields `None`.
pub fn decode_filter(raw: &Value) -> Option<Map<String, Value>> {
    match raw {
        Value::Object(map) => Some(map.clone()),
        Value::String(encoded) => {
            let encoded = encoded.replace('+', " ");
            let decoded = percent_decode_str(&encoded).decode_utf8_lossy();
            match serde_json::from_str::<Value>(&decoded) {
                Ok(Value::Object(map)) => Some(map),
                _ => {
                    warn!("Ignoring undecodable filter `{}`", decoded);
                    None
                }
            }
        }
        Value::Null => None,
        other => {
            warn!("Ignoring filter of unexpected shape: {}", other);
            None
        }
    }
}

/// Rewrites top-level `id` keys (with any prefix or suffix) to `id_`.
pub fn rewrite_id_keys(filter: &Map<String, Value>) -> Map<String, Value> {
    filter
        .iter()
        .map(|(key, value)| {
            let key = ID_KEY_RE.replace(key, "${1}id_${2}").into_owned();
            (key, value.clone())
        })
        .collect()
}

/// Projects `data` onto exactly `allowed`.
///
/// Missing columns become empty strings; sequences and mappings are stored as
/// JSON text.
pub fn prep_data<S: AsRef<str>>(data: &Row, allowed: &[S]) -> Row {
    allowed
        .iter()
        .map(|column| {
            let column = column.as_ref();
            let value = match data.get(column) {
                Some(v @ (Value::Array(_) | Value::Object(_))) => Value::String(to_json(v)),
                Some(Value::Null) | None => Value::String(String::new()),
                Some(v) => v.clone(),
            };
            (column.to_string(), value)
        })
        .collect()
}

fn required_alias(value: Option<&Value>) -> CoreResult<String> {
    match value.map(scalar_text) {
        Some(alias) if !alias.trim().is_empty() => Ok(alias),
        _ => Err(CoreError::Validation("an alias is required".into())),
    }
}

fn lang_key(id: i64, locale: &str) -> Row {
    Row::from_iter([
        ("id_".to_string(), Value::from(id)),
        ("locale".to_string(), Value::from(locale)),
    ])
}

/// Lists localized rows of `table` narrowed by `params` (see
/// [`EntityQuery::default_filters`]).
pub fn default_list(
    db: &Database,
    table: &str,
    locale: &str,
    params: &Map<String, Value>,
) -> CoreResult<Vec<Row>> {
    db.with_conn(|conn| -> CoreResult<Vec<Row>> {
        QueryBuilder::new(conn)
            .default_select(table, locale)
            .default_filters(params)
    })
}

/// Fetches one localized entity by id or alias.
pub fn default_find(db: &Database, table: &str, key: &str, locale: &str) -> CoreResult<Row> {
    let key = EntityKey::parse(key);

    db.with_conn(|conn| -> CoreResult<Row> {
        let mut qb = QueryBuilder::new(conn);
        qb.default_select(table, locale)
            .filter(&key.filter(Some(table)))
            .limit(1, None);

        qb.run()?
            .take_rows()
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::NotFound(key.to_string()))
    })
}

/// Inserts an entity and its companion row for `locale`, returning the new id.
///
/// # Errors
///
/// * [`CoreError::Validation`] if `data` has no non-empty `alias`.
/// * [`CoreError::Conflict`] if an entry with that alias exists.
/// * [`CoreError::Database`] if a statement fails; nothing is written then.
pub fn default_insert<S: AsRef<str>>(
    db: &Database,
    table: &str,
    data: &Row,
    allowed: &[S],
    allowed_lang: &[S],
    locale: &str,
) -> CoreResult<i64> {
    let alias = required_alias(data.get("alias"))?;

    db.transaction(|tx| -> CoreResult<i64> {
        let mut qb = QueryBuilder::new(tx);

        let exists = !qb
            .select("id")
            .from(table, None)
            .filter(&EntityKey::Alias(alias.clone()).filter(None))
            .limit(1, None)
            .run()?
            .rows()
            .is_empty();
        if exists {
            return Err(CoreError::Conflict(alias));
        }

        let id = qb
            .insert(table, &prep_data(data, allowed))?
            .ok_or_else(|| CoreError::Validation(format!("no writable columns in {}", table)))?;

        let mut lang_values = lang_key(id, locale);
        lang_values.extend(prep_data(data, allowed_lang));
        qb.insert(&lang_table(table), &lang_values)?;

        debug!("Inserted {} #{} ({})", table, id, alias);
        Ok(id)
    })
}

/// Updates an entity found by id or alias, and its companion row for
/// `locale`, inserting the companion row when the locale is new.
///
/// The alias is the lookup key when that is not numeric, otherwise it must be
/// present in `data` and not belong to another entry. Returns the entity id.
///
/// # Errors
///
/// * [`CoreError::Validation`] if the key is numeric and `data` has no alias.
/// * [`CoreError::NotFound`] if no entry matches the key.
/// * [`CoreError::Conflict`] if another entry already uses the alias.
/// * [`CoreError::Database`] if a statement fails; nothing is written then.
pub fn default_update<S: AsRef<str>>(
    db: &Database,
    table: &str,
    key: &str,
    data: &Row,
    allowed: &[S],
    allowed_lang: &[S],
    locale: &str,
) -> CoreResult<i64> {
    let key = EntityKey::parse(key);
    let alias = match &key {
        EntityKey::Alias(alias) => alias.clone(),
        EntityKey::Id(_) => required_alias(data.get("alias"))?,
    };

    let mut data = data.clone();
    data.insert("alias".into(), Value::from(alias.as_str()));

    db.transaction(|tx| -> CoreResult<i64> {
        let mut qb = QueryBuilder::new(tx);

        let id = qb
            .select("id")
            .from(table, None)
            .filter(&key.filter(None))
            .limit(1, None)
            .run()?
            .rows()
            .first()
            .and_then(|row| row.get("id"))
            .and_then(as_integer)
            .ok_or_else(|| CoreError::NotFound(key.to_string()))?;
        let by_id = EntityKey::Id(id).filter(None);

        let taken = Row::from_iter([
            ("alias".to_string(), Value::from(alias.as_str())),
            ("id!".to_string(), Value::from(id)),
        ]);
        let alias_taken = !qb
            .select("id")
            .from(table, None)
            .filter(&taken)
            .limit(1, None)
            .run()?
            .rows()
            .is_empty();
        if alias_taken {
            return Err(CoreError::Conflict(alias));
        }

        let values = prep_data(&data, allowed);
        if !values.is_empty() {
            qb.filter(&by_id).update(table, &values)?;
        }

        let lang = lang_table(table);
        let lang_filter = lang_key(id, locale);
        let has_locale = !qb
            .select("id_")
            .from(&lang, None)
            .filter(&lang_filter)
            .limit(1, None)
            .run()?
            .rows()
            .is_empty();

        let mut lang_values = prep_data(&data, allowed_lang);
        if has_locale {
            if !lang_values.is_empty() {
                qb.filter(&lang_filter).update(&lang, &lang_values)?;
            }
        } else {
            lang_values.extend(lang_filter);
            qb.insert(&lang, &lang_values)?;
        }

        debug!("Updated {} #{}", table, id);
        Ok(id)
    })
}

/// Deletes an entity found by id or alias together with all of its companion
/// rows. Returns the number of primary rows removed.
pub fn default_delete(db: &Database, table: &str, key: &str) -> CoreResult<usize> {
    let key = EntityKey::parse(key);

    db.transaction(|tx| -> CoreResult<usize> {
        let mut qb = QueryBuilder::new(tx);

        let ids: Vec<Value> = qb
            .select("id")
            .from(table, None)
            .filter(&key.filter(None))
            .run()?
            .rows()
            .iter()
            .filter_map(|row| row.get("id").cloned())
            .collect();
        if ids.is_empty() {
            return Err(CoreError::NotFound(key.to_string()));
        }

        let by_owner = Row::from_iter([("id_-in".to_string(), Value::Array(ids.clone()))]);
        qb.filter(&by_owner).delete(&lang_table(table))?;

        let by_id = Row::from_iter([("id-in".to_string(), Value::Array(ids))]);
        let deleted = qb.filter(&by_id).delete(table)?;

        debug!("Deleted {} {} row(s) for {}", deleted, table, key);
        Ok(deleted)
    })
}
