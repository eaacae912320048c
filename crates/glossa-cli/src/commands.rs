use std::fs;

use glossa_config::{config::Config, error::ConfigError};
use glossa_core::{
    error::CoreError,
    registry::Method,
    schema::bootstrap,
    service::{Request, Response},
    CoreResult,
};
use glossa_db::{Database, Row};
use nu_ansi_term::Color::{Green, Red, Yellow};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::{
    cli::{Commands, Target},
    utils::Colored,
};

/// Opens the configured database, creating its directory if needed.
pub fn open_database(config: &Config) -> CoreResult<Database> {
    let path = config.get_database_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(ConfigError::IoError)?;
    }
    Ok(Database::open(&path)?)
}

pub fn init(db: &Database, config: &Config) -> CoreResult<()> {
    let registered = bootstrap(db, config)?;
    info!(
        "{} of {} configured module(s) newly registered",
        Colored(Green, registered),
        config.modules.len()
    );
    Ok(())
}

fn parse_object(raw: &str, flag: &str) -> CoreResult<Row> {
    match serde_json::from_str(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(CoreError::Validation(format!(
            "--{} must be a JSON object",
            flag
        ))),
        Err(err) => Err(CoreError::Validation(format!(
            "--{} is not valid JSON: {}",
            flag, err
        ))),
    }
}

/// Splits `a,b` into a JSON array, keeping integer parts as numbers.
fn parse_list(raw: &str) -> Value {
    Value::Array(
        raw.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| match part.parse::<i64>() {
                Ok(n) => Value::from(n),
                Err(_) => Value::from(part),
            })
            .collect(),
    )
}

/// A filter that is not a JSON object is passed through as text and decoded
/// server-side.
fn parse_filter(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => value,
        _ => Value::from(raw),
    }
}

fn target_request(method: Method, target: Target, locale: Option<String>) -> Request {
    let mut request = Request::new(method);
    if let Some(module) = target.module {
        request = request.module(module);
    }
    if let Some(table) = target.table {
        request = request.table(table);
    }
    if let Some(item) = target.item {
        request = request.item(item);
    }
    if let Some(locale) = locale {
        request = request.locale(locale);
    }
    request
}

/// Builds the service request for a data command. `init` has no request.
pub fn build_request(command: Commands, locale: Option<String>) -> CoreResult<Request> {
    let request = match command {
        Commands::Init => {
            return Err(CoreError::Validation(
                "init does not map to a request".into(),
            ))
        }
        Commands::Get {
            target,
            filter,
            order,
            limit,
            rel_one,
            rel_many,
        } => {
            let mut query = Row::new();
            if let Some(filter) = filter {
                query.insert("filter".into(), parse_filter(&filter));
            }
            if let Some(order) = order {
                query.insert("order".into(), parse_list(&order));
            }
            if let Some(limit) = limit {
                query.insert("limit".into(), parse_list(&limit));
            }
            if rel_one {
                query.insert("rel_one".into(), Value::Bool(true));
            }
            if rel_many {
                query.insert("rel_many".into(), Value::Bool(true));
            }
            target_request(Method::Get, target, locale).query(query)
        }
        Commands::Create { target, data } => {
            target_request(Method::Post, target, locale).data(parse_object(&data, "data")?)
        }
        Commands::Update { target, data } => {
            if target.module.is_none() {
                return Err(CoreError::Validation("update requires a module".into()));
            }
            target_request(Method::Put, target, locale).data(parse_object(&data, "data")?)
        }
        Commands::Delete { target } => {
            if target.module.is_none() {
                return Err(CoreError::Validation("delete requires a module".into()));
            }
            target_request(Method::Delete, target, locale)
        }
    };
    Ok(request)
}

/// Logs the response messages and prints the response as JSON on stdout.
pub fn print_response(response: &Response) {
    for message in &response.messages {
        if message.code.is_error() {
            error!("{} {}", Colored(Red, message.code), message.text);
        } else {
            info!("{} {}", Colored(Yellow, message.code), message.text);
        }
    }

    match serde_json::to_string_pretty(response) {
        Ok(out) => println!("{}", out),
        Err(err) => warn!("Failed to serialize response: {}", err),
    }
}
