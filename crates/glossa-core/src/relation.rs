//! Loading of related rows through foreign keys.
//!
//! A table declares foreign keys as `column -> referenced table`. With
//! `rel_one` set, each such column of the fetched rows is replaced by the
//! referenced row. With `rel_many` set, every other table holding a foreign
//! key to the fetched table is attached to each row, under that table's name,
//! as the list of rows pointing at it.

use std::collections::BTreeMap;

use glossa_db::{
    helpers::{scalar_text, Row},
    Database, Executor, QueryBuilder,
};
use serde_json::Value;
use tracing::debug;

use crate::{entity::EntityQuery, CoreResult};

/// Foreign keys per table: table name to `column -> referenced table`.
pub type FkRelations = BTreeMap<String, BTreeMap<String, String>>;

/// Which relations to load, taken from the `rel_one` and `rel_many` entries of
/// a request query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelationFlags {
    pub one: bool,
    pub many: bool,
}

impl RelationFlags {
    pub fn from_query(query: &Row) -> Self {
        let flag = |name: &str| query.get(name).is_some_and(is_truthy);
        Self {
            one: flag("rel_one"),
            many: flag("rel_many"),
        }
    }

    pub fn any(self) -> bool {
        self.one || self.many
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !matches!(s.trim(), "" | "0" | "false"),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn same_key(a: &Value, b: &Value) -> bool {
    !a.is_null() && !b.is_null() && scalar_text(a) == scalar_text(b)
}

/// Distinct non-empty values of `column` across `rows`.
fn collect_keys<'r>(rows: impl IntoIterator<Item = &'r Row>, column: &str) -> Vec<Value> {
    let mut keys: Vec<Value> = Vec::new();
    for value in rows.into_iter().filter_map(|row| row.get(column)) {
        if value.is_null() || scalar_text(value).is_empty() {
            continue;
        }
        if !keys.iter().any(|k| same_key(k, value)) {
            keys.push(value.clone());
        }
    }
    keys
}

/// `{column: key}` for a single key, `{column-in: keys}` otherwise.
fn key_filter(column: String, mut keys: Vec<Value>) -> Row {
    if keys.len() == 1 {
        Row::from_iter([(column, keys.remove(0))])
    } else {
        Row::from_iter([(format!("{}-in", column), Value::Array(keys))])
    }
}

fn load_one<E: Executor + ?Sized>(
    exec: &E,
    rows: &mut [Row],
    column: &str,
    target: &str,
    locale: &str,
) -> CoreResult<()> {
    let keys = collect_keys(rows.iter(), column);
    if keys.is_empty() {
        return Ok(());
    }

    let mut qb = QueryBuilder::new(exec);
    let related = qb
        .default_select(target, locale)
        .filter(&key_filter(format!("{}.id", target), keys))
        .run()?
        .take_rows();
    debug!("Loaded {} {} row(s) for {}", related.len(), target, column);

    for row in rows.iter_mut() {
        let Some(fk) = row.get(column) else {
            continue;
        };
        let found = related
            .iter()
            .find(|r| r.get("id").is_some_and(|id| same_key(id, fk)));
        if let Some(found) = found {
            row.insert(column.to_string(), Value::Object(found.clone()));
        }
    }
    Ok(())
}

fn load_many<E: Executor + ?Sized>(
    exec: &E,
    rows: &mut [Row],
    child: &str,
    column: &str,
    locale: &str,
) -> CoreResult<()> {
    let ids = collect_keys(rows.iter(), "id");
    if ids.is_empty() {
        return Ok(());
    }

    let mut qb = QueryBuilder::new(exec);
    let related = qb
        .default_select(child, locale)
        .filter(&key_filter(format!("{}.{}", child, column), ids))
        .run()?
        .take_rows();
    debug!("Loaded {} {} row(s) by {}", related.len(), child, column);

    for row in rows.iter_mut() {
        let children: Vec<Value> = match row.get("id") {
            Some(id) => related
                .iter()
                .filter(|r| r.get(column).is_some_and(|fk| same_key(fk, id)))
                .cloned()
                .map(Value::Object)
                .collect(),
            None => Vec::new(),
        };
        row.insert(child.to_string(), Value::Array(children));
    }
    Ok(())
}

/// Loads the relations of `rows`, fetched from `table`, selected by `flags`.
pub fn load_relations(
    db: &Database,
    table: &str,
    locale: &str,
    rows: &mut [Row],
    relations: &FkRelations,
    flags: RelationFlags,
) -> CoreResult<()> {
    if rows.is_empty() || !flags.any() || relations.is_empty() {
        return Ok(());
    }

    db.with_conn(|conn| -> CoreResult<()> {
        if flags.one {
            for (column, target) in relations.get(table).into_iter().flatten() {
                load_one(conn, rows, column, target, locale)?;
            }
        }

        if flags.many {
            for (child, keys) in relations.iter().filter(|(child, _)| *child != table) {
                if let Some((column, _)) = keys.iter().find(|(_, target)| *target == table) {
                    load_many(conn, rows, child, column, locale)?;
                }
            }
        }

        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        entity::{default_find, default_insert, default_list},
        schema::create_entity_tables,
    };

    fn obj(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn relations() -> FkRelations {
        FkRelations::from([
            (
                "pages".to_string(),
                BTreeMap::from([("author".to_string(), "authors".to_string())]),
            ),
            (
                "comments".to_string(),
                BTreeMap::from([("page".to_string(), "pages".to_string())]),
            ),
        ])
    }

    fn insert(db: &Database, table: &str, columns: &[&str], lang: &[&str], data: Value) -> i64 {
        default_insert(db, table, &obj(data), columns, lang, "en").unwrap()
    }

    fn setup_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| -> CoreResult<()> {
            create_entity_tables(conn, "authors", &["alias", "name"], &["bio"])?;
            create_entity_tables(conn, "pages", &["alias", "author"], &["title"])?;
            create_entity_tables(conn, "comments", &["alias", "page"], &["text"])?;
            Ok(())
        })
        .unwrap();

        let ann = insert(&db, "authors", &["alias", "name"], &["bio"], json!({ "alias": "ann", "name": "Ann" }));
        let bob = insert(&db, "authors", &["alias", "name"], &["bio"], json!({ "alias": "bob", "name": "Bob" }));

        let page_columns = ["alias", "author"];
        let home = insert(&db, "pages", &page_columns, &["title"], json!({ "alias": "home", "author": ann }));
        let about = insert(&db, "pages", &page_columns, &["title"], json!({ "alias": "about", "author": bob }));
        insert(&db, "pages", &page_columns, &["title"], json!({ "alias": "draft", "author": 99 }));

        for (alias, page) in [("c1", home), ("c2", home), ("c3", about)] {
            insert(&db, "comments", &["alias", "page"], &["text"], json!({ "alias": alias, "page": page }));
        }
        db
    }

    #[test]
    fn test_flags_from_query() {
        let flags = RelationFlags::from_query(&obj(json!({ "rel_one": "1", "rel_many": 0 })));
        assert_eq!(flags, RelationFlags { one: true, many: false });
        assert!(flags.any());

        let flags = RelationFlags::from_query(&obj(json!({ "rel_one": "false", "rel_many": true })));
        assert_eq!(flags, RelationFlags { one: false, many: true });

        assert!(!RelationFlags::from_query(&Row::new()).any());
    }

    #[test]
    fn test_key_filter_switches_to_in() {
        assert_eq!(
            key_filter("t.id".into(), vec![json!(1)]),
            obj(json!({ "t.id": 1 }))
        );
        assert_eq!(
            key_filter("t.id".into(), vec![json!(1), json!(2)]),
            obj(json!({ "t.id-in": [1, 2] }))
        );
    }

    #[test]
    fn test_load_one_for_single_row() {
        let db = setup_db();
        let mut rows = vec![default_find(&db, "pages", "home", "en").unwrap()];

        let flags = RelationFlags { one: true, many: false };
        load_relations(&db, "pages", "en", &mut rows, &relations(), flags).unwrap();

        assert_eq!(rows[0]["author"]["name"], json!("Ann"));
        assert_eq!(rows[0]["author"]["alias"], json!("ann"));
        assert!(rows[0].get("comments").is_none());
    }

    #[test]
    fn test_load_one_for_many_rows() {
        let db = setup_db();
        let mut rows = default_list(&db, "pages", "en", &Row::new()).unwrap();
        assert_eq!(rows.len(), 3);

        let flags = RelationFlags { one: true, many: false };
        load_relations(&db, "pages", "en", &mut rows, &relations(), flags).unwrap();

        assert_eq!(rows[0]["author"]["name"], json!("Ann"));
        assert_eq!(rows[1]["author"]["name"], json!("Bob"));
        assert_eq!(rows[2]["author"], json!(99));
    }

    #[test]
    fn test_load_many_for_single_and_many_rows() {
        let db = setup_db();
        let flags = RelationFlags { one: false, many: true };

        let mut single = vec![default_find(&db, "pages", "home", "en").unwrap()];
        load_relations(&db, "pages", "en", &mut single, &relations(), flags).unwrap();
        let aliases: Vec<_> = single[0]["comments"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["alias"].clone())
            .collect();
        assert_eq!(aliases, vec![json!("c1"), json!("c2")]);

        let mut rows = default_list(&db, "pages", "en", &Row::new()).unwrap();
        load_relations(&db, "pages", "en", &mut rows, &relations(), flags).unwrap();
        assert_eq!(rows[0]["comments"].as_array().unwrap().len(), 2);
        assert_eq!(rows[1]["comments"][0]["alias"], json!("c3"));
        assert_eq!(rows[2]["comments"], json!([]));
        assert_eq!(rows[0]["author"], json!(1));
    }

    #[test]
    fn test_no_flags_leaves_rows() {
        let db = setup_db();
        let mut rows = default_list(&db, "pages", "en", &Row::new()).unwrap();
        let before = rows.clone();

        load_relations(&db, "pages", "en", &mut rows, &relations(), RelationFlags::default())
            .unwrap();
        assert_eq!(rows, before);
    }
}
