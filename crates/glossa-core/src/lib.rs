use error::CoreError;

pub mod entity;
pub mod error;
pub mod registry;
pub mod relation;
pub mod schema;
pub mod service;
pub mod status;

pub type CoreResult<T> = std::result::Result<T, CoreError>;
