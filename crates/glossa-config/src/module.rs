use std::collections::BTreeMap;

use glossa_db::helpers::is_plain_identifier;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// A data table owned by a module. Every table has a `<name>_lang` companion.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct TableConfig {
    /// Name of the primary table.
    pub name: String,

    /// Columns of the primary table writable through the API.
    #[serde(default)]
    pub columns: Vec<String>,

    /// Columns of the companion table writable through the API.
    #[serde(default)]
    pub lang_columns: Vec<String>,

    /// Foreign keys of this table: column name to the referenced table.
    #[serde(default)]
    pub relations: BTreeMap<String, String>,
}

/// A module declared in the catalog.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ModuleConfig {
    pub bundle: String,
    pub alias: String,

    /// Title registered for the default locale on `init`.
    pub title: Option<String>,

    /// Description registered for the default locale on `init`.
    pub description: Option<String>,

    #[serde(default)]
    pub tables: Vec<TableConfig>,
}

impl ModuleConfig {
    /// `bundle.alias`, the module's public id.
    pub fn key(&self) -> String {
        format!("{}.{}", self.bundle, self.alias)
    }

    pub fn table(&self, name: &str) -> Option<&TableConfig> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Foreign keys of every table declaring some, keyed by table name.
    pub fn relations(&self) -> BTreeMap<String, BTreeMap<String, String>> {
        self.tables
            .iter()
            .filter(|t| !t.relations.is_empty())
            .map(|t| (t.name.clone(), t.relations.clone()))
            .collect()
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let key = self.key();
        for name in [&self.bundle, &self.alias] {
            if !is_plain_identifier(name) {
                return Err(ConfigError::InvalidIdentifier {
                    context: "module".into(),
                    value: key,
                });
            }
        }

        let mut seen = Vec::with_capacity(self.tables.len());
        for table in &self.tables {
            let names = std::iter::once(&table.name)
                .chain(&table.columns)
                .chain(&table.lang_columns)
                .chain(table.relations.keys())
                .chain(table.relations.values());
            for name in names {
                if !is_plain_identifier(name) {
                    return Err(ConfigError::InvalidIdentifier {
                        context: format!("module {}", key),
                        value: name.clone(),
                    });
                }
            }

            if seen.contains(&table.name.as_str()) {
                return Err(ConfigError::DuplicateTable {
                    module: key,
                    table: table.name.clone(),
                });
            }
            seen.push(table.name.as_str());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages() -> TableConfig {
        TableConfig {
            name: "pages".into(),
            columns: vec!["alias".into(), "views".into(), "author".into()],
            lang_columns: vec!["title".into()],
            relations: BTreeMap::from([("author".into(), "authors".into())]),
        }
    }

    fn module() -> ModuleConfig {
        ModuleConfig {
            bundle: "content".into(),
            alias: "pages".into(),
            title: Some("Pages".into()),
            description: None,
            tables: vec![pages()],
        }
    }

    #[test]
    fn test_module_lookups() {
        let module = module();
        assert_eq!(module.key(), "content.pages");
        assert_eq!(module.table_names(), vec!["pages"]);
        assert_eq!(module.table("pages").unwrap().relations["author"], "authors");
        assert_eq!(module.relations()["pages"]["author"], "authors");
        assert!(module.table("posts").is_none());
    }

    #[test]
    fn test_validate_rejects_bad_column() {
        let mut module = module();
        module.tables[0].columns.push("views; --".into());
        assert!(matches!(
            module.validate(),
            Err(ConfigError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_relation() {
        let mut module = module();
        module.tables[0]
            .relations
            .insert("editor".into(), "users.id".into());
        assert!(matches!(
            module.validate(),
            Err(ConfigError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_dotted_alias() {
        let mut module = module();
        module.alias = "a.b".into();
        assert!(matches!(
            module.validate(),
            Err(ConfigError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_table() {
        let mut module = module();
        module.tables.push(pages());
        assert!(matches!(
            module.validate(),
            Err(ConfigError::DuplicateTable { .. })
        ));
    }
}
