//! Table bootstrap for the module catalog.

use glossa_config::{config::Config, module::ModuleConfig};
use glossa_db::{error::DbError, helpers::is_plain_identifier, Database, Executor, QueryBuilder};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{entity::default_insert, error::CoreError, CoreResult};

glossa_db::define_entity!(
    modules {
        table: "modules",
        columns: {
            BUNDLE => "bundle",
            ALIAS => "alias",
            DATA_TABLES => "data_tables"
        },
        lang_columns: {
            TITLE => "title",
            DESCRIPTION => "description"
        }
    }
);

fn ensure_identifier(name: &str) -> CoreResult<()> {
    if is_plain_identifier(name) {
        Ok(())
    } else {
        Err(DbError::InvalidIdentifier(name.to_string()).into())
    }
}

/// Creates `table` and `table_lang` if they do not exist.
///
/// Columns are declared without a type so values keep the storage class they
/// were bound with.
pub fn create_entity_tables<E, S>(
    exec: &E,
    table: &str,
    columns: &[S],
    lang_columns: &[S],
) -> CoreResult<()>
where
    E: Executor + ?Sized,
    S: AsRef<str>,
{
    ensure_identifier(table)?;

    let mut primary = vec![
        "id INTEGER PRIMARY KEY AUTOINCREMENT".to_string(),
        "alias TEXT NOT NULL UNIQUE".to_string(),
    ];
    for column in columns.iter().map(AsRef::as_ref) {
        ensure_identifier(column)?;
        if column != "id" && column != "alias" {
            primary.push(column.to_string());
        }
    }

    let mut lang = vec![
        format!("id_ INTEGER NOT NULL REFERENCES {}(id) ON DELETE CASCADE", table),
        "locale TEXT NOT NULL".to_string(),
    ];
    for column in lang_columns.iter().map(AsRef::as_ref) {
        ensure_identifier(column)?;
        if column != "id_" && column != "locale" {
            lang.push(column.to_string());
        }
    }
    lang.push("PRIMARY KEY (id_, locale)".to_string());

    exec.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            table,
            primary.join(", ")
        ),
        &[],
    )?;
    exec.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS {}_lang ({})",
            table,
            lang.join(", ")
        ),
        &[],
    )?;

    debug!("Ensured tables {} and {}_lang", table, table);
    Ok(())
}

fn is_registered(db: &Database, module: &ModuleConfig) -> CoreResult<bool> {
    db.with_conn(|conn| -> CoreResult<bool> {
        let mut qb = QueryBuilder::new(conn);
        let filter = [
            (modules::BUNDLE.to_string(), Value::from(module.bundle.as_str())),
            (modules::ALIAS.to_string(), Value::from(module.alias.as_str())),
        ]
        .into_iter()
        .collect();
        Ok(!qb
            .select("id")
            .from(modules::TABLE, None)
            .filter(&filter)
            .limit(1, None)
            .run()?
            .rows()
            .is_empty())
    })
}

/// Creates the `modules` tables and every catalog table, then registers the
/// catalog's modules that are not yet present. Returns how many modules were
/// registered.
pub fn bootstrap(db: &Database, config: &Config) -> CoreResult<usize> {
    db.transaction(|tx| -> CoreResult<()> {
        create_entity_tables(tx, modules::TABLE, modules::COLUMNS, modules::LANG_COLUMNS)?;
        for module in &config.modules {
            for table in &module.tables {
                create_entity_tables(tx, &table.name, &table.columns, &table.lang_columns)?;
            }
        }
        Ok(())
    })?;

    let mut registered = 0;
    for module in &config.modules {
        if is_registered(db, module)? {
            debug!("Module {} already registered", module.key());
            continue;
        }

        let data = [
            (modules::BUNDLE, Value::from(module.bundle.as_str())),
            (modules::ALIAS, Value::from(module.alias.as_str())),
            (
                modules::DATA_TABLES,
                Value::from(module.table_names()),
            ),
            (
                modules::TITLE,
                Value::from(module.title.clone().unwrap_or_default()),
            ),
            (
                modules::DESCRIPTION,
                Value::from(module.description.clone().unwrap_or_default()),
            ),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        match default_insert(
            db,
            modules::TABLE,
            &data,
            modules::COLUMNS,
            modules::LANG_COLUMNS,
            config.default_locale(),
        ) {
            Ok(id) => {
                info!("Registered module {} as #{}", module.key(), id);
                registered += 1;
            }
            Err(CoreError::Conflict(alias)) => {
                warn!(
                    "Skipping module {}: alias '{}' is already taken",
                    module.key(),
                    alias
                );
            }
            Err(err) => return Err(err),
        }
    }

    Ok(registered)
}

#[cfg(test)]
mod tests {
    use glossa_config::module::TableConfig;
    use serde_json::json;

    use super::*;

    fn catalog() -> Config {
        let mut config = Config::default_config();
        config.modules.push(ModuleConfig {
            bundle: "content".into(),
            alias: "pages".into(),
            title: Some("Pages".into()),
            description: None,
            tables: vec![TableConfig {
                name: "pages".into(),
                columns: vec!["alias".into(), "views".into()],
                lang_columns: vec!["title".into()],
                ..Default::default()
            }],
        });
        config
    }

    #[test]
    fn test_create_entity_tables_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| -> CoreResult<()> {
            create_entity_tables(conn, "posts", &["alias", "body"], &["title"])?;
            create_entity_tables(conn, "posts", &["alias", "body"], &["title"])?;
            Executor::execute(
                conn,
                "INSERT INTO posts (alias, body) VALUES (?, ?)",
                &[json!("a"), json!("b")],
            )?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_alias_is_unique() {
        let db = Database::open_in_memory().unwrap();
        let second = db.with_conn(|conn| -> CoreResult<usize> {
            create_entity_tables(conn, "posts", &["alias"], &[])?;
            Executor::execute(conn, "INSERT INTO posts (alias) VALUES (?)", &[json!("a")])?;
            Ok(Executor::execute(
                conn,
                "INSERT INTO posts (alias) VALUES (?)",
                &[json!("a")],
            )?)
        });
        assert!(matches!(second, Err(CoreError::Database(_))));
    }

    #[test]
    fn test_create_entity_tables_rejects_bad_names() {
        let db = Database::open_in_memory().unwrap();
        let result = db.with_conn(|conn| create_entity_tables(conn, "posts;", &["alias"], &[]));
        assert!(matches!(
            result,
            Err(CoreError::Database(DbError::InvalidIdentifier(_)))
        ));
    }

    #[test]
    fn test_bootstrap_registers_once() {
        let db = Database::open_in_memory().unwrap();
        let config = catalog();

        assert_eq!(bootstrap(&db, &config).unwrap(), 1);
        assert_eq!(bootstrap(&db, &config).unwrap(), 0);

        let rows = db
            .with_conn(|conn| {
                Executor::query(
                    conn,
                    "SELECT modules.*, modules_lang.title FROM modules \
                     JOIN modules_lang ON modules.id = modules_lang.id_",
                    &[],
                )
            })
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["bundle"], json!("content"));
        assert_eq!(rows[0]["data_tables"], json!("[\"pages\"]"));
        assert_eq!(rows[0]["title"], json!("Pages"));
    }
}
