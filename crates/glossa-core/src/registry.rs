//! Module handlers and their resolution.
//!
//! Every module's data tables are served by [`DefaultHandler`] unless a
//! handler registered for the module's `(bundle, alias)` declares the
//! requested method in its [`Capabilities`].

use std::{collections::HashMap, fmt, sync::Arc};

use glossa_config::module::TableConfig;
use glossa_db::Database;
use serde_json::{json, Value};

use crate::{
    entity::{default_delete, default_find, default_insert, default_list, default_update},
    error::CoreError,
    relation::{load_relations, FkRelations, RelationFlags},
    service::Request,
    status::{Messages, StatusCode},
    CoreResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    const fn bit(self) -> u8 {
        match self {
            Method::Get => 1,
            Method::Post => 1 << 1,
            Method::Put => 1 << 2,
            Method::Delete => 1 << 3,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// The set of methods a handler implements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities(u8);

impl Capabilities {
    pub const NONE: Capabilities = Capabilities(0);
    pub const ALL: Capabilities = Capabilities(0b1111);

    pub const fn with(self, method: Method) -> Self {
        Capabilities(self.0 | method.bit())
    }

    pub const fn contains(self, method: Method) -> bool {
        self.0 & method.bit() != 0
    }
}

impl FromIterator<Method> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Method>>(iter: I) -> Self {
        iter.into_iter().fold(Capabilities::NONE, Capabilities::with)
    }
}

/// Everything a handler needs to serve one request against a data table.
pub struct HandlerContext<'a> {
    pub db: &'a Database,
    pub request: &'a Request,
    pub table: &'a TableConfig,
    /// Foreign keys of the module's tables.
    pub relations: &'a FkRelations,
    pub locale: &'a str,
    pub messages: &'a mut Messages,
}

/// Serves the data tables of a module.
///
/// Methods outside [`ModuleHandler::capabilities`] are never called through
/// a [`Registry`]; their default bodies report the method as unsupported.
pub trait ModuleHandler: Send + Sync {
    fn capabilities(&self) -> Capabilities;

    /// Foreign keys of the module's tables, merged over the ones declared in
    /// the catalog.
    fn fk_relations(&self) -> FkRelations {
        FkRelations::new()
    }

    fn get(&self, _ctx: &mut HandlerContext<'_>) -> CoreResult<Value> {
        Err(CoreError::Unsupported {
            method: Method::Get,
        })
    }

    fn post(&self, _ctx: &mut HandlerContext<'_>) -> CoreResult<Value> {
        Err(CoreError::Unsupported {
            method: Method::Post,
        })
    }

    fn put(&self, _ctx: &mut HandlerContext<'_>) -> CoreResult<Value> {
        Err(CoreError::Unsupported {
            method: Method::Put,
        })
    }

    fn delete(&self, _ctx: &mut HandlerContext<'_>) -> CoreResult<Value> {
        Err(CoreError::Unsupported {
            method: Method::Delete,
        })
    }

    fn handle(&self, method: Method, ctx: &mut HandlerContext<'_>) -> CoreResult<Value> {
        match method {
            Method::Get => self.get(ctx),
            Method::Post => self.post(ctx),
            Method::Put => self.put(ctx),
            Method::Delete => self.delete(ctx),
        }
    }
}

/// Localized CRUD over a table using the catalog's column whitelists.
#[derive(Debug, Default)]
pub struct DefaultHandler;

fn required_item<'r>(request: &'r Request, method: Method) -> CoreResult<&'r str> {
    request
        .item
        .as_deref()
        .ok_or_else(|| CoreError::Validation(format!("{} requires an item id or alias", method)))
}

impl ModuleHandler for DefaultHandler {
    fn capabilities(&self) -> Capabilities {
        Capabilities::ALL
    }

    fn get(&self, ctx: &mut HandlerContext<'_>) -> CoreResult<Value> {
        let table = &ctx.table.name;
        let flags = RelationFlags::from_query(&ctx.request.query);

        match ctx.request.item.as_deref() {
            Some(item) => {
                let row = match default_find(ctx.db, table, item, ctx.locale) {
                    Ok(row) => row,
                    Err(CoreError::NotFound(key)) => return Err(CoreError::DataNotFound(key)),
                    Err(err) => return Err(err),
                };
                let mut rows = [row];
                load_relations(ctx.db, table, ctx.locale, &mut rows, ctx.relations, flags)?;
                let [row] = rows;
                Ok(Value::Object(row))
            }
            None => {
                let mut rows = default_list(ctx.db, table, ctx.locale, &ctx.request.query)?;
                if rows.is_empty() {
                    ctx.messages.msg(StatusCode::NoData);
                }
                load_relations(ctx.db, table, ctx.locale, &mut rows, ctx.relations, flags)?;
                Ok(Value::Array(rows.into_iter().map(Value::Object).collect()))
            }
        }
    }

    fn post(&self, ctx: &mut HandlerContext<'_>) -> CoreResult<Value> {
        let id = default_insert(
            ctx.db,
            &ctx.table.name,
            &ctx.request.data,
            &ctx.table.columns,
            &ctx.table.lang_columns,
            ctx.locale,
        )?;
        ctx.messages.msg(StatusCode::ActionOk);
        Ok(json!({ "id": id }))
    }

    fn put(&self, ctx: &mut HandlerContext<'_>) -> CoreResult<Value> {
        let item = required_item(ctx.request, Method::Put)?;
        let id = default_update(
            ctx.db,
            &ctx.table.name,
            item,
            &ctx.request.data,
            &ctx.table.columns,
            &ctx.table.lang_columns,
            ctx.locale,
        )?;
        ctx.messages.msg(StatusCode::ActionOk);
        Ok(json!({ "id": id }))
    }

    fn delete(&self, ctx: &mut HandlerContext<'_>) -> CoreResult<Value> {
        let item = required_item(ctx.request, Method::Delete)?;
        let deleted = default_delete(ctx.db, &ctx.table.name, item)?;
        ctx.messages.msg(StatusCode::ActionOk);
        Ok(json!({ "deleted": deleted }))
    }
}

/// Handlers keyed by `(bundle, alias)`, built once at startup.
pub struct Registry {
    overrides: HashMap<(String, String), Arc<dyn ModuleHandler>>,
    fallback: Arc<dyn ModuleHandler>,
}

impl Default for Registry {
    fn default() -> Self {
        Registry::builder().build()
    }
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// The handler serving `method` for the module, falling back to the
    /// default handler when no override declares the method.
    pub fn resolve(&self, bundle: &str, alias: &str, method: Method) -> &dyn ModuleHandler {
        self.overrides
            .get(&(bundle.to_string(), alias.to_string()))
            .filter(|handler| handler.capabilities().contains(method))
            .unwrap_or(&self.fallback)
            .as_ref()
    }

    /// Foreign keys declared by the module's override handler, whatever its
    /// capabilities.
    pub fn relations(&self, bundle: &str, alias: &str) -> FkRelations {
        self.overrides
            .get(&(bundle.to_string(), alias.to_string()))
            .map(|handler| handler.fk_relations())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    overrides: HashMap<(String, String), Arc<dyn ModuleHandler>>,
    fallback: Option<Arc<dyn ModuleHandler>>,
}

impl RegistryBuilder {
    pub fn register<H>(mut self, bundle: &str, alias: &str, handler: H) -> Self
    where
        H: ModuleHandler + 'static,
    {
        self.overrides
            .insert((bundle.to_string(), alias.to_string()), Arc::new(handler));
        self
    }

    /// Replaces [`DefaultHandler`] as the fallback.
    pub fn fallback<H>(mut self, handler: H) -> Self
    where
        H: ModuleHandler + 'static,
    {
        self.fallback = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> Registry {
        Registry {
            overrides: self.overrides,
            fallback: self.fallback.unwrap_or_else(|| Arc::new(DefaultHandler)),
        }
    }
}
