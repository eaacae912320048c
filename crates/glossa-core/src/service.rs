//! Request dispatch over module settings and module data tables.

use std::sync::Arc;

use glossa_config::config::Config;
use glossa_db::{
    helpers::{as_integer, scalar_text, Row},
    Database, FromRow, QueryBuilder,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::{
    entity::{default_delete, default_insert, default_list, default_update, EntityKey, EntityQuery},
    error::CoreError,
    registry::{HandlerContext, Method, Registry},
    schema::modules,
    status::{Message, MessageRegistry, Messages, StatusCode},
    CoreResult,
};

/// One call against the module API.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    /// Numeric id or `bundle.alias`.
    pub module: Option<String>,
    pub table: Option<String>,
    /// Numeric id or alias of a data entry.
    pub item: Option<String>,
    pub locale: Option<String>,
    /// `filter`, `order` and `limit` for listings.
    pub query: Row,
    /// Submitted fields for writes.
    pub data: Row,
}

impl Request {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            module: None,
            table: None,
            item: None,
            locale: None,
            query: Row::new(),
            data: Row::new(),
        }
    }

    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn item(mut self, item: impl Into<String>) -> Self {
        self.item = Some(item.into());
        self
    }

    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn query(mut self, query: Row) -> Self {
        self.query = query;
        self
    }

    pub fn data(mut self, data: Row) -> Self {
        self.data = data;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub success: bool,
    pub data: Value,
    pub messages: Vec<Message>,
}

/// A row of the `modules` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleSettings {
    pub id: i64,
    pub bundle: String,
    pub alias: String,
    pub data_tables: Vec<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl FromRow for ModuleSettings {
    fn from_row(row: &Row) -> glossa_db::error::Result<Self> {
        let text = |column: &str| row.get(column).map(scalar_text).unwrap_or_default();
        let optional = |column: &str| {
            row.get(column)
                .and_then(Value::as_str)
                .map(String::from)
        };

        let data_tables = match row.get(modules::DATA_TABLES) {
            Some(Value::String(raw)) if !raw.is_empty() => {
                serde_json::from_str(raw).unwrap_or_else(|err| {
                    warn!("Ignoring malformed data_tables `{}`: {}", raw, err);
                    Vec::new()
                })
            }
            _ => Vec::new(),
        };

        Ok(Self {
            id: row.get("id").and_then(as_integer).unwrap_or_default(),
            bundle: text(modules::BUNDLE),
            alias: text(modules::ALIAS),
            data_tables,
            title: optional(modules::TITLE),
            description: optional(modules::DESCRIPTION),
        })
    }
}

/// Serves module settings and dispatches data-table requests through the
/// [`Registry`].
pub struct ModuleService {
    db: Database,
    registry: Registry,
    config: Config,
    messages: Arc<MessageRegistry>,
}

impl ModuleService {
    pub fn new(db: Database, registry: Registry, config: Config) -> Self {
        let messages = Arc::new(MessageRegistry::new(config.messages.clone()));
        Self {
            db,
            registry,
            config,
            messages,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Handles `request`. Errors never escape: they are reported as status
    /// messages and make the response unsuccessful.
    pub fn handle(&self, request: &Request) -> Response {
        debug!(
            "{} module={:?} table={:?} item={:?}",
            request.method, request.module, request.table, request.item
        );

        let mut messages = Messages::new(Arc::clone(&self.messages));
        let data = match self.dispatch(request, &mut messages) {
            Ok(data) => data,
            Err(err) => {
                messages.error(&err);
                Value::Null
            }
        };

        Response {
            success: messages.errcount() == 0,
            data,
            messages: messages.clear(),
        }
    }

    fn dispatch(&self, request: &Request, messages: &mut Messages) -> CoreResult<Value> {
        let locale = request
            .locale
            .as_deref()
            .unwrap_or_else(|| self.config.default_locale());

        match (request.module.as_deref(), request.table.as_deref()) {
            (None, _) => self.handle_catalog(request, locale, messages),
            (Some(module), None) => self.handle_settings(request, module, locale, messages),
            (Some(module), Some(table)) => {
                self.handle_data(request, module, table, locale, messages)
            }
        }
    }

    fn handle_catalog(
        &self,
        request: &Request,
        locale: &str,
        messages: &mut Messages,
    ) -> CoreResult<Value> {
        match request.method {
            Method::Get => {
                let rows = default_list(&self.db, modules::TABLE, locale, &request.query)?;
                if rows.is_empty() {
                    messages.msg(StatusCode::NoData);
                }
                Ok(json!({ "settings": rows }))
            }
            Method::Post => {
                let id = default_insert(
                    &self.db,
                    modules::TABLE,
                    &request.data,
                    modules::COLUMNS,
                    modules::LANG_COLUMNS,
                    locale,
                )?;
                messages.msg(StatusCode::ActionOk);
                Ok(json!({ "id": id }))
            }
            method => Err(CoreError::Unsupported { method }),
        }
    }

    fn handle_settings(
        &self,
        request: &Request,
        module: &str,
        locale: &str,
        messages: &mut Messages,
    ) -> CoreResult<Value> {
        let (settings, row) = self.find_module(module, locale)?;

        match request.method {
            Method::Get => Ok(json!({ "settings": row })),
            Method::Put => {
                let mut data = request.data.clone();
                data.entry(modules::ALIAS)
                    .or_insert_with(|| Value::from(settings.alias.as_str()));

                let id = default_update(
                    &self.db,
                    modules::TABLE,
                    &settings.id.to_string(),
                    &data,
                    modules::COLUMNS,
                    modules::LANG_COLUMNS,
                    locale,
                )?;
                messages.msg(StatusCode::ActionOk);
                Ok(json!({ "id": id }))
            }
            Method::Delete => {
                let deleted = default_delete(&self.db, modules::TABLE, &settings.id.to_string())?;
                messages.msg(StatusCode::ActionOk);
                Ok(json!({ "deleted": deleted }))
            }
            method => Err(CoreError::Unsupported { method }),
        }
    }

    fn handle_data(
        &self,
        request: &Request,
        module: &str,
        table: &str,
        locale: &str,
        messages: &mut Messages,
    ) -> CoreResult<Value> {
        let (settings, row) = self.find_module(module, locale)?;
        if !settings.data_tables.iter().any(|t| t == table) {
            return Err(CoreError::TableNotFound(table.to_string()));
        }

        let module_config = self
            .config
            .get_module(&settings.bundle, &settings.alias)
            .ok_or_else(|| CoreError::TableNotFound(table.to_string()))?;
        let table_config = module_config
            .table(table)
            .ok_or_else(|| CoreError::TableNotFound(table.to_string()))?;

        let mut relations = module_config.relations();
        relations.extend(self.registry.relations(&settings.bundle, &settings.alias));

        let handler = self
            .registry
            .resolve(&settings.bundle, &settings.alias, request.method);
        let mut ctx = HandlerContext {
            db: &self.db,
            request,
            table: table_config,
            relations: &relations,
            locale,
            messages,
        };
        let mdata = handler.handle(request.method, &mut ctx)?;

        Ok(match request.method {
            Method::Get => json!({ "settings": row, "mdata": mdata }),
            _ => json!({ "mdata": mdata }),
        })
    }

    /// Looks a module up by numeric id or `bundle.alias`.
    pub fn find_module(&self, id: &str, locale: &str) -> CoreResult<(ModuleSettings, Row)> {
        let filter = match EntityKey::parse(id) {
            key @ EntityKey::Id(_) => key.filter(Some(modules::TABLE)),
            EntityKey::Alias(_) => match id.split_once('.') {
                Some((bundle, alias)) if !bundle.is_empty() && !alias.is_empty() => [
                    (
                        format!("{}.{}", modules::TABLE, modules::BUNDLE),
                        Value::from(bundle),
                    ),
                    (
                        format!("{}.{}", modules::TABLE, modules::ALIAS),
                        Value::from(alias),
                    ),
                ]
                .into_iter()
                .collect(),
                _ => return Err(CoreError::ModuleNotFound(id.to_string())),
            },
        };

        let row = self
            .db
            .with_conn(|conn| -> CoreResult<Option<Row>> {
                let mut qb = QueryBuilder::new(conn);
                qb.default_select(modules::TABLE, locale)
                    .filter(&filter)
                    .limit(1, None);
                Ok(qb.run()?.take_rows().into_iter().next())
            })?
            .ok_or_else(|| CoreError::ModuleNotFound(id.to_string()))?;

        let settings = ModuleSettings::from_row(&row)?;
        Ok((settings, row))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use glossa_config::module::{ModuleConfig, TableConfig};

    use super::*;
    use crate::{
        registry::{Capabilities, ModuleHandler},
        schema::bootstrap,
    };

    fn obj(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn catalog() -> Config {
        let mut config = Config::default_config();
        config.modules.push(ModuleConfig {
            bundle: "content".into(),
            alias: "pages".into(),
            title: Some("Pages".into()),
            description: Some("Static pages".into()),
            tables: vec![
                TableConfig {
                    name: "pages".into(),
                    columns: vec!["alias".into(), "views".into()],
                    lang_columns: vec!["title".into(), "body".into()],
                    ..Default::default()
                },
                TableConfig {
                    name: "blocks".into(),
                    columns: vec!["alias".into(), "page".into()],
                    lang_columns: vec!["text".into()],
                    relations: BTreeMap::from([("page".into(), "pages".into())]),
                },
            ],
        });
        config
    }

    fn service_with(registry: Registry, config: Config) -> ModuleService {
        let db = Database::open_in_memory().unwrap();
        bootstrap(&db, &config).unwrap();
        ModuleService::new(db, registry, config)
    }

    fn service() -> ModuleService {
        service_with(Registry::default(), catalog())
    }

    fn codes(response: &Response) -> Vec<&'static str> {
        response.messages.iter().map(|m| m.code.as_str()).collect()
    }

    #[test]
    fn test_list_and_get_settings() {
        let service = service();

        let list = service.handle(&Request::new(Method::Get));
        assert!(list.success);
        assert_eq!(list.data["settings"].as_array().unwrap().len(), 1);

        for id in ["content.pages", "1"] {
            let single = service.handle(&Request::new(Method::Get).module(id));
            assert!(single.success, "{id}");
            assert_eq!(single.data["settings"]["alias"], json!("pages"));
            assert_eq!(single.data["settings"]["title"], json!("Pages"));
        }

        let (settings, _) = service.find_module("content.pages", "en").unwrap();
        assert_eq!(settings.data_tables, vec!["pages", "blocks"]);
        assert_eq!(settings.description.as_deref(), Some("Static pages"));
    }

    #[test]
    fn test_unknown_module() {
        let service = service();
        for id in ["pages", "99", "content.", "other.pages"] {
            let response = service.handle(&Request::new(Method::Get).module(id));
            assert!(!response.success, "{id}");
            assert_eq!(codes(&response), vec!["M_FOUND"]);
            assert_eq!(response.data, Value::Null);
        }
    }

    #[test]
    fn test_table_must_belong_to_module() {
        let service = service();
        let response = service.handle(
            &Request::new(Method::Get)
                .module("content.pages")
                .table("users"),
        );
        assert!(!response.success);
        assert_eq!(codes(&response), vec!["T_FOUND"]);
    }

    #[test]
    fn test_data_lifecycle() {
        let service = service();
        let base = || Request::new(Method::Get).module("content.pages").table("pages");

        let empty = service.handle(&base());
        assert!(empty.success);
        assert_eq!(codes(&empty), vec!["D_NONE"]);
        assert_eq!(empty.data["mdata"], json!([]));

        let created = service.handle(&Request {
            method: Method::Post,
            ..base().data(obj(json!({ "alias": "home", "views": 3, "title": "Home" })))
        });
        assert!(created.success);
        assert_eq!(codes(&created), vec!["ACT_OK"]);

        let duplicate = service.handle(&Request {
            method: Method::Post,
            ..base().data(obj(json!({ "alias": "home" })))
        });
        assert!(!duplicate.success);
        assert_eq!(codes(&duplicate), vec!["E_EXISTS"]);

        let updated = service.handle(&Request {
            method: Method::Put,
            ..base()
                .item("home")
                .locale("bg")
                .data(obj(json!({ "views": 4, "title": "Начало" })))
        });
        assert!(updated.success);

        let found = service.handle(&base().item("home").locale("bg"));
        assert_eq!(found.data["mdata"]["title"], json!("Начало"));
        assert_eq!(found.data["mdata"]["views"], json!(4));
        assert_eq!(found.data["settings"]["alias"], json!("pages"));

        let listed = service.handle(&base().query(obj(json!({ "filter": { "views>": 3 } }))));
        assert_eq!(listed.data["mdata"].as_array().unwrap().len(), 1);
        assert_eq!(listed.data["mdata"][0]["title"], json!("Home"));

        let deleted = service.handle(&Request {
            method: Method::Delete,
            ..base().item("home")
        });
        assert!(deleted.success);
        assert_eq!(deleted.data["mdata"]["deleted"], json!(1));

        let gone = service.handle(&base().item("home"));
        assert!(!gone.success);
        assert_eq!(codes(&gone), vec!["D_FOUND"]);
    }

    #[test]
    fn test_data_relations() {
        let service = service();
        let data = |table: &str| Request::new(Method::Get).module("content.pages").table(table);
        let post = |table: &str, row: Value| {
            let response = service.handle(&Request {
                method: Method::Post,
                ..data(table).data(obj(row))
            });
            assert!(response.success, "{:?}", response.messages);
            response.data["mdata"]["id"].as_i64().unwrap()
        };

        let home = post("pages", json!({ "alias": "home", "title": "Home" }));
        post("blocks", json!({ "alias": "hero", "page": home, "text": "Hi" }));
        post("blocks", json!({ "alias": "footer", "page": home, "text": "Bye" }));

        let block = service.handle(&data("blocks").item("hero").query(obj(json!({ "rel_one": 1 }))));
        assert_eq!(block.data["mdata"]["page"]["title"], json!("Home"));

        let pages = service.handle(&data("pages").query(obj(json!({ "rel_many": "1" }))));
        let blocks = pages.data["mdata"][0]["blocks"].as_array().unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1]["text"], json!("Bye"));

        let plain = service.handle(&data("blocks").item("hero"));
        assert_eq!(plain.data["mdata"]["page"], json!(home));
    }

    #[test]
    fn test_write_without_item_is_invalid() {
        let service = service();
        let response = service.handle(
            &Request::new(Method::Delete)
                .module("content.pages")
                .table("pages"),
        );
        assert_eq!(codes(&response), vec!["INP_INV"]);
    }

    #[test]
    fn test_settings_crud() {
        let service = service();

        let created = service.handle(&Request::new(Method::Post).data(obj(json!({
            "bundle": "shop",
            "alias": "products",
            "data_tables": ["products"],
            "title": "Products"
        }))));
        assert!(created.success);
        let id = created.data["id"].as_i64().unwrap();

        let updated = service.handle(
            &Request::new(Method::Put)
                .module("shop.products")
                .data(obj(json!({ "bundle": "shop", "data_tables": [], "title": "Catalog" }))),
        );
        assert!(updated.success);

        let (settings, row) = service.find_module(&id.to_string(), "en").unwrap();
        assert_eq!(settings.alias, "products");
        assert!(settings.data_tables.is_empty());
        assert_eq!(row["title"], json!("Catalog"));

        let deleted = service.handle(&Request::new(Method::Delete).module("shop.products"));
        assert!(deleted.success);
        assert!(service.find_module("shop.products", "en").is_err());
    }

    #[test]
    fn test_unsupported_methods() {
        let service = service();
        let response = service.handle(&Request::new(Method::Delete));
        assert_eq!(codes(&response), vec!["M_UNSUPPORTED"]);

        let response = service.handle(&Request::new(Method::Post).module("content.pages"));
        assert_eq!(codes(&response), vec!["M_UNSUPPORTED"]);
    }

    struct Counter;

    impl ModuleHandler for Counter {
        fn capabilities(&self) -> Capabilities {
            Capabilities::NONE.with(Method::Get)
        }

        fn get(&self, ctx: &mut HandlerContext<'_>) -> CoreResult<Value> {
            Ok(json!({ "table": ctx.table.name, "locale": ctx.locale }))
        }
    }

    #[test]
    fn test_registry_override_dispatch() {
        let registry = Registry::builder()
            .register("content", "pages", Counter)
            .build();
        let service = service_with(registry, catalog());

        let response = service.handle(
            &Request::new(Method::Get)
                .module("content.pages")
                .table("blocks")
                .locale("de"),
        );
        assert!(response.success);
        assert_eq!(
            response.data["mdata"],
            json!({ "table": "blocks", "locale": "de" })
        );

        let created = service.handle(
            &Request::new(Method::Post)
                .module("content.pages")
                .table("blocks")
                .data(obj(json!({ "alias": "footer", "text": "Bye" }))),
        );
        assert!(created.success);
    }

    #[test]
    fn test_message_overrides() {
        let mut config = catalog();
        config.messages = BTreeMap::from([("M_FOUND".to_string(), "No such module".to_string())]);
        let service = service_with(Registry::default(), config);

        let response = service.handle(&Request::new(Method::Get).module("nope"));
        assert_eq!(response.messages[0].text, "No such module");
    }
}
