//! # Taxes Configuration
//!
//! Configuration for processes hosting the tax orchestrator.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                            │
//! │     TAXES_DB_PATH=/var/lib/taxes/taxes.db                               │
//! │     TAXES_PACKAGE_NAME=reaction-taxes                                   │
//! │     TAXES_LOG=info,taxes=debug                                          │
//! │                                                                         │
//! │  2. TOML Config File                                                    │
//! │     ~/.config/taxes/taxes.toml (Linux)                                  │
//! │     ~/Library/Application Support/com.reaction.taxes/taxes.toml (macOS) │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # taxes.toml
//! [database]
//! path = "/var/lib/taxes/taxes.db"
//! max_connections = 5
//!
//! [taxes]
//! package_name = "reaction-taxes"
//!
//! [logging]
//! filter = "info,taxes=debug,sqlx=warn"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::DbConfig;
use taxes_core::TAXES_PACKAGE_NAME;

/// Default tracing filter for binaries.
pub const DEFAULT_LOG_FILTER: &str = "info,taxes=debug,sqlx=warn";

// =============================================================================
// Database Settings
// =============================================================================

/// Where the package settings live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    /// Maximum number of pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("com", "reaction", "taxes")
        .map(|dirs| dirs.data_dir().join("taxes.db"))
        .unwrap_or_else(|| PathBuf::from("taxes.db"))
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Tax Settings
// =============================================================================

/// Tax package settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxSettings {
    /// Name of the package whose per-shop settings carry the service
    /// selections.
    #[serde(default = "default_package_name")]
    pub package_name: String,
}

fn default_package_name() -> String {
    TAXES_PACKAGE_NAME.to_string()
}

impl Default for TaxSettings {
    fn default() -> Self {
        TaxSettings {
            package_name: default_package_name(),
        }
    }
}

// =============================================================================
// Logging Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive string.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_log_filter(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxesConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub taxes: TaxSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl TaxesConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (taxes.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> DbResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading taxes config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load taxes config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> DbResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| DbError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DbError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| DbError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Taxes config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> DbResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(DbError::InvalidConfig("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(DbError::InvalidConfig(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.taxes.package_name.trim().is_empty() {
            return Err(DbError::InvalidConfig("taxes.package_name must not be empty".into()));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("TAXES_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(name) = std::env::var("TAXES_PACKAGE_NAME") {
            debug!(package = %name, "Overriding package name from environment");
            self.taxes.package_name = name;
        }

        if let Ok(filter) = std::env::var("TAXES_LOG") {
            self.logging.filter = filter;
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "reaction", "taxes")
            .map(|dirs| dirs.config_dir().join("taxes.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Builds the pool configuration for [`crate::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path).max_connections(self.database.max_connections)
    }

    /// Returns the tax package name.
    pub fn package_name(&self) -> &str {
        &self.taxes.package_name
    }
}
