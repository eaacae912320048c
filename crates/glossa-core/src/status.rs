//! Status codes and the per-request message accumulator.

use std::{collections::BTreeMap, fmt, sync::Arc};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::CoreError;

/// Short codes reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StatusCode {
    #[serde(rename = "DB_FAIL")]
    DbFail,
    #[serde(rename = "ACT_OK")]
    ActionOk,
    #[serde(rename = "E_EXISTS")]
    EntryExists,
    #[serde(rename = "E_FOUND")]
    EntryNotFound,
    #[serde(rename = "INP_INV")]
    InputInvalid,
    #[serde(rename = "T_FOUND")]
    TableNotFound,
    #[serde(rename = "M_FOUND")]
    ModuleNotFound,
    #[serde(rename = "D_FOUND")]
    DataNotFound,
    #[serde(rename = "D_NONE")]
    NoData,
    #[serde(rename = "M_UNSUPPORTED")]
    MethodUnsupported,
}

impl StatusCode {
    pub const ALL: [StatusCode; 10] = [
        StatusCode::DbFail,
        StatusCode::ActionOk,
        StatusCode::EntryExists,
        StatusCode::EntryNotFound,
        StatusCode::InputInvalid,
        StatusCode::TableNotFound,
        StatusCode::ModuleNotFound,
        StatusCode::DataNotFound,
        StatusCode::NoData,
        StatusCode::MethodUnsupported,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StatusCode::DbFail => "DB_FAIL",
            StatusCode::ActionOk => "ACT_OK",
            StatusCode::EntryExists => "E_EXISTS",
            StatusCode::EntryNotFound => "E_FOUND",
            StatusCode::InputInvalid => "INP_INV",
            StatusCode::TableNotFound => "T_FOUND",
            StatusCode::ModuleNotFound => "M_FOUND",
            StatusCode::DataNotFound => "D_FOUND",
            StatusCode::NoData => "D_NONE",
            StatusCode::MethodUnsupported => "M_UNSUPPORTED",
        }
    }

    /// Whether a message with this code makes a response unsuccessful.
    pub fn is_error(self) -> bool {
        !matches!(self, StatusCode::ActionOk | StatusCode::NoData)
    }

    fn default_text(self) -> &'static str {
        match self {
            StatusCode::DbFail => "The database operation failed",
            StatusCode::ActionOk => "The action was completed successfully",
            StatusCode::EntryExists => "An entry with this alias already exists",
            StatusCode::EntryNotFound => "The requested entry does not exist",
            StatusCode::InputInvalid => "The submitted input is invalid",
            StatusCode::TableNotFound => "The table does not belong to this module",
            StatusCode::ModuleNotFound => "The requested module does not exist",
            StatusCode::DataNotFound => "The requested data entry does not exist",
            StatusCode::NoData => "No data matched the request",
            StatusCode::MethodUnsupported => "This module does not support the requested method",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps status codes to user-facing text, with configured overrides.
#[derive(Debug, Clone, Default)]
pub struct MessageRegistry {
    overrides: BTreeMap<String, String>,
}

impl MessageRegistry {
    pub fn new(overrides: BTreeMap<String, String>) -> Self {
        for code in overrides.keys() {
            if !StatusCode::ALL.iter().any(|c| c.as_str() == code) {
                warn!("Ignoring message override for unknown status code {}", code);
            }
        }
        Self { overrides }
    }

    pub fn text(&self, code: StatusCode) -> &str {
        self.overrides
            .get(code.as_str())
            .map(String::as_str)
            .unwrap_or_else(|| code.default_text())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub code: StatusCode,
    pub text: String,
}

/// Messages collected while handling one request.
#[derive(Debug, Clone, Default)]
pub struct Messages {
    registry: Arc<MessageRegistry>,
    entries: Vec<Message>,
}

impl Messages {
    pub fn new(registry: Arc<MessageRegistry>) -> Self {
        Self {
            registry,
            entries: Vec::new(),
        }
    }

    pub fn msg(&mut self, code: StatusCode) {
        debug!("Status {}", code);
        self.entries.push(Message {
            code,
            text: self.registry.text(code).to_string(),
        });
    }

    /// Records `err` under its status code.
    pub fn error(&mut self, err: &CoreError) {
        match err {
            CoreError::Database(_) | CoreError::Config(_) => warn!("{}", err),
            _ => debug!("{}", err),
        }
        self.msg(err.status());
    }

    pub fn errcount(&self) -> usize {
        self.entries.iter().filter(|m| m.code.is_error()).count()
    }

    pub fn entries(&self) -> &[Message] {
        &self.entries
    }

    /// Takes every collected message, leaving the accumulator empty.
    pub fn clear(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_overrides() {
        let registry = MessageRegistry::new(BTreeMap::from([(
            "E_EXISTS".to_string(),
            "Alias taken".to_string(),
        )]));

        assert_eq!(registry.text(StatusCode::EntryExists), "Alias taken");
        assert_eq!(
            registry.text(StatusCode::ActionOk),
            "The action was completed successfully"
        );
    }

    #[test]
    fn test_errcount_ignores_informational() {
        let mut messages = Messages::default();
        messages.msg(StatusCode::NoData);
        messages.msg(StatusCode::ActionOk);
        assert_eq!(messages.errcount(), 0);

        messages.error(&CoreError::Conflict("home".into()));
        assert_eq!(messages.errcount(), 1);
        assert_eq!(messages.entries()[2].code, StatusCode::EntryExists);
    }

    #[test]
    fn test_clear_drains() {
        let mut messages = Messages::default();
        messages.msg(StatusCode::ModuleNotFound);

        let drained = messages.clear();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].code.as_str(), "M_FOUND");
        assert!(messages.entries().is_empty());
        assert_eq!(messages.errcount(), 0);
    }

    #[test]
    fn test_serializes_short_code() {
        let message = Message {
            code: StatusCode::TableNotFound,
            text: "x".into(),
        };
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            serde_json::json!({ "code": "T_FOUND", "text": "x" })
        );
    }
}
