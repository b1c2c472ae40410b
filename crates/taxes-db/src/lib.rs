//! # taxes-db: Package Settings Store for the Tax Dispatcher
//!
//! Persists each shop's tax package settings in SQLite and serves them to
//! `taxes-core` through [`taxes_core::ShopTaxConfigStore`].
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tax Calculation Data Flow                        │
//! │                                                                         │
//! │  TaxOrchestrator::compute_fulfillment_group_taxes                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ShopTaxResolver ──► ShopTaxConfigStore (trait, taxes-core)             │
//! │                            │                                            │
//! │  ┌─────────────────────────┼───────────────────────────────────────┐    │
//! │  │                     taxes-db (THIS CRATE)                       │    │
//! │  │                         ▼                                       │    │
//! │  │   ┌───────────────┐    ┌──────────────────────┐  ┌──────────┐  │    │
//! │  │   │   Database    │    │ SqliteShopTaxConfig- │  │Migrations│  │    │
//! │  │   │   (pool.rs)   │◄───│ Store                │  │(embedded)│  │    │
//! │  │   │               │    │ PackageRepository    │  │          │  │    │
//! │  │   └───────────────┘    └──────────────────────┘  └──────────┘  │    │
//! │  │   TaxesConfig (config.rs): TOML file + TAXES_* env             │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (packages table)                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and config error types
//! - [`config`] - TOML/environment configuration
//! - [`repository`] - Package settings repository and store adapter
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use taxes_core::{TaxOrchestrator, TaxServiceRegistry};
//! use taxes_db::{Database, TaxesConfig};
//!
//! let config = TaxesConfig::load(None)?;
//! let db = Database::new(config.db_config()).await?;
//!
//! let store = db.shop_tax_config_store(config.package_name());
//! let orchestrator = TaxOrchestrator::new(Arc::new(registry), Arc::new(store));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{TaxesConfig, DEFAULT_LOG_FILTER};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::package::{PackageRepository, PackageSettings, SqliteShopTaxConfigStore};
