use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(glossa_config::toml_deserialize),
        help("Check your config.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("Invalid identifier in {context}: `{value}`")]
    #[diagnostic(
        code(glossa_config::invalid_identifier),
        help("Names may only contain letters, digits, underscores and dots")
    )]
    InvalidIdentifier { context: String, value: String },

    #[error("Duplicate module: {0}")]
    #[diagnostic(
        code(glossa_config::duplicate_module),
        help("Each bundle.alias pair must be declared once")
    )]
    DuplicateModule(String),

    #[error("Duplicate table `{table}` in module {module}")]
    #[diagnostic(code(glossa_config::duplicate_table))]
    DuplicateTable { module: String, table: String },

    #[error("Default locale must not be empty")]
    #[diagnostic(
        code(glossa_config::missing_locale),
        help("Set `default_locale` in config.toml, e.g. `default_locale = \"en\"`")
    )]
    MissingLocale,

    #[error("Unable to determine path: {0}")]
    #[diagnostic(code(glossa_config::path))]
    InvalidPath(String),

    #[error("IO error: {0}")]
    #[diagnostic(code(glossa_config::io))]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
