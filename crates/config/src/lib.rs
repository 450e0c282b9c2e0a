//! Configuration loading and validation.
//!
//! Values are layered: built-in defaults, then an optional configuration
//! file (TOML, YAML or JSON, chosen by extension), then environment variables
//! prefixed with `STRATA_`. Nested keys are separated by a double underscore,
//! so `STRATA_DATABASE__PATH` sets `database.path`.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strata_storage::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PathFilters};

/// Prefix of every environment variable read by [`Config::load`].
pub const ENV_PREFIX: &str = "STRATA_";
const ENV_SPLIT: &str = "__";
const DATABASE_FILENAME: &str = "strata.sqlite";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub access: AccessConfig,
    pub listing: ListingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file, or `:memory:` for a throwaway in-memory store.
    pub path: PathBuf,
    pub max_connections: u32,
    /// How long a writer waits for the database lock before giving up.
    pub busy_timeout_ms: u64,
}
impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: 5,
            busy_timeout_ms: 5_000,
        }
    }
}

/// Path prefixes visible to callers of the storage façade.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Empty means every path is allowed.
    pub allowed_prefixes: Vec<String>,
    pub denied_prefixes: Vec<String>,
}
impl AccessConfig {
    pub fn path_filters(&self) -> PathFilters {
        self.denied_prefixes
            .iter()
            .fold(PathFilters::allowing(&self.allowed_prefixes), |filters, prefix| filters.deny_prefix(prefix))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Page size for listings that ask for zero items.
    pub default_page_size: usize,
    /// Larger requests are clamped to this.
    pub max_page_size: usize,
}
impl Default for ListingConfig {
    fn default() -> Self {
        Self { default_page_size: DEFAULT_PAGE_SIZE, max_page_size: MAX_PAGE_SIZE }
    }
}

fn default_database_path() -> PathBuf {
    match ProjectDirs::from("", "", "strata") {
        Some(dirs) => dirs.data_dir().join(DATABASE_FILENAME),
        None => PathBuf::from(DATABASE_FILENAME),
    }
}

impl Config {
    /// Load the configuration from defaults, an optional file, and the
    /// environment (in increasing order of precedence).
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(file) = file {
            if !file.is_file() {
                tracing::warn!(path = %file.display(), "Configuration file does not exist");
                exn::bail!(ErrorKind::Load);
            }
            figment = match file.extension().and_then(|ext| ext.to_str()) {
                Some("toml") => figment.merge(Toml::file_exact(file)),
                Some("yaml" | "yml") => figment.merge(Yaml::file_exact(file)),
                Some("json") => figment.merge(Json::file_exact(file)),
                _ => exn::bail!(ErrorKind::Invalid("configuration file must be TOML, YAML or JSON")),
            };
            tracing::debug!(path = %file.display(), "Loading configuration file");
        }
        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).split(ENV_SPLIT))
            .extract()
            .or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the storage unusable.
    pub fn validate(&self) -> Result<()> {
        if self.database.path.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid("database path must not be empty"));
        }
        if self.database.max_connections == 0 {
            exn::bail!(ErrorKind::Invalid("database max_connections must be at least 1"));
        }
        if self.listing.max_page_size == 0 {
            exn::bail!(ErrorKind::Invalid("listing max_page_size must be at least 1"));
        }
        if self.listing.default_page_size > self.listing.max_page_size {
            exn::bail!(ErrorKind::Invalid("listing default_page_size must not exceed max_page_size"));
        }
        Ok(())
    }
}
