use std::{
    collections::{BTreeMap, HashSet},
    fs,
    path::PathBuf,
    sync::{LazyLock, PoisonError, RwLock},
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{ConfigError, Result},
    module::ModuleConfig,
    utils::{resolve_path, xdg_config_home, xdg_data_home},
};

pub const DEFAULT_LOCALE: &str = "en";

/// Application's configuration
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    /// Path of the SQLite database file.
    /// Default: $XDG_DATA_HOME/glossa/glossa.db
    pub database_path: Option<String>,

    /// Locale used when a request does not name one.
    /// Default: en
    pub default_locale: Option<String>,

    /// Overrides for status message texts, keyed by status code.
    #[serde(default)]
    pub messages: BTreeMap<String, String>,

    /// The module catalog.
    #[serde(default)]
    pub modules: Vec<ModuleConfig>,
}

pub static CONFIG: LazyLock<RwLock<Option<Config>>> = LazyLock::new(|| RwLock::new(None));

pub static CONFIG_PATH: LazyLock<RwLock<PathBuf>> = LazyLock::new(|| {
    RwLock::new(match std::env::var("GLOSSA_CONFIG") {
        Ok(path_str) => PathBuf::from(path_str),
        Err(_) => xdg_config_home().join("glossa").join("config.toml"),
    })
});

/// Loads the configuration from [`CONFIG_PATH`] into the global slot.
pub fn init() -> Result<()> {
    let config = Config::new()?;
    set_config(config);
    Ok(())
}

/// Replaces the global configuration.
pub fn set_config(config: Config) {
    let mut global_config = CONFIG.write().unwrap_or_else(PoisonError::into_inner);
    *global_config = Some(config);
}

/// Points [`CONFIG_PATH`] at `path`, e.g. from a `--config` flag.
pub fn set_config_path(path: PathBuf) {
    let mut config_path = CONFIG_PATH.write().unwrap_or_else(PoisonError::into_inner);
    *config_path = path;
}

/// Returns the active configuration, initializing defaults if nothing was loaded.
pub fn get_config() -> Config {
    {
        let config_guard = CONFIG.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(config) = config_guard.as_ref() {
            return config.clone();
        }
    }

    let mut config_guard = CONFIG.write().unwrap_or_else(PoisonError::into_inner);
    config_guard
        .get_or_insert_with(Config::default_config)
        .clone()
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    pub fn default_config() -> Self {
        let database_path = xdg_data_home().join("glossa").join("glossa.db");

        Self {
            database_path: Some(database_path.display().to_string()),
            default_locale: Some(DEFAULT_LOCALE.to_string()),
            messages: BTreeMap::new(),
            modules: Vec::new(),
        }
    }

    /// Creates a new configuration by loading it from the configuration file.
    /// If the configuration file is not found, it uses the default configuration.
    pub fn new() -> Result<Self> {
        let config_path = CONFIG_PATH
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .to_path_buf();

        let mut config = match fs::read_to_string(&config_path) {
            Ok(content) => {
                debug!("Loading configuration from {}", config_path.display());
                toml::from_str(&content)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(
                    "No configuration at {}, using defaults",
                    config_path.display()
                );
                Self::default_config()
            }
            Err(err) => return Err(ConfigError::IoError(err)),
        };

        config.resolve()?;

        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        config.resolve()?;
        Ok(config)
    }

    /// Validates the catalog and fills in defaults.
    pub fn resolve(&mut self) -> Result<()> {
        let locale = self
            .default_locale
            .get_or_insert_with(|| DEFAULT_LOCALE.to_string());
        if locale.trim().is_empty() {
            return Err(ConfigError::MissingLocale);
        }

        if self.database_path.is_none() {
            self.database_path = Self::default_config().database_path;
        }

        let mut seen_modules = HashSet::new();
        for module in &self.modules {
            module.validate()?;
            if !seen_modules.insert(module.key()) {
                return Err(ConfigError::DuplicateModule(module.key()));
            }
        }

        Ok(())
    }

    pub fn default_locale(&self) -> &str {
        self.default_locale.as_deref().unwrap_or(DEFAULT_LOCALE)
    }

    pub fn get_database_path(&self) -> Result<PathBuf> {
        if let Ok(env_path) = std::env::var("GLOSSA_DB") {
            return resolve_path(&env_path);
        }
        match &self.database_path {
            Some(path) => resolve_path(path),
            None => Ok(xdg_data_home().join("glossa").join("glossa.db")),
        }
    }

    pub fn get_module(&self, bundle: &str, alias: &str) -> Option<&ModuleConfig> {
        self.modules
            .iter()
            .find(|m| m.bundle == bundle && m.alias == alias)
    }
}
