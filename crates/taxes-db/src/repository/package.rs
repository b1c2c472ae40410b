//! # Package Settings Repository
//!
//! Stores one settings document per (package, shop).
//!
//! ## Settings Document
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  packages                                                               │
//! │  ───────────────────────────────────────────────────────────────────    │
//! │  name            shop_id    settings                                    │
//! │  reaction-taxes  shop-1     {"activeTaxServiceName": "custom-rates",    │
//! │                              "fallbackTaxServiceName": "flat-rate"}     │
//! │  reaction-taxes  shop-2     {}                    ← unconfigured        │
//! │  (no row)        shop-3                           ← unconfigured        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Other keys in the tax package's settings are preserved by every write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use taxes_core::{ShopTaxConfigStore, ShopTaxConfiguration, StoreError};

const ACTIVE_KEY: &str = "activeTaxServiceName";
const FALLBACK_KEY: &str = "fallbackTaxServiceName";

/// A package's settings row.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageSettings {
    pub id: String,
    pub name: String,
    pub shop_id: String,
    pub enabled: bool,
    pub settings: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct PackageRow {
    id: String,
    name: String,
    shop_id: String,
    enabled: bool,
    settings: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PackageRow> for PackageSettings {
    type Error = DbError;

    fn try_from(row: PackageRow) -> DbResult<Self> {
        let settings = match serde_json::from_str::<Value>(&row.settings)? {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(DbError::InvalidSettings(format!(
                    "settings for {}/{} must be an object, got {}",
                    row.name, row.shop_id, other
                )))
            }
        };

        Ok(PackageSettings {
            id: row.id,
            name: row.name,
            shop_id: row.shop_id,
            enabled: row.enabled,
            settings,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for package settings.
#[derive(Debug, Clone)]
pub struct PackageRepository {
    pool: SqlitePool,
}

impl PackageRepository {
    /// Creates a new PackageRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PackageRepository { pool }
    }

    /// Finds the settings of package `name` for `shop_id`.
    pub async fn find_settings(&self, name: &str, shop_id: &str) -> DbResult<Option<PackageSettings>> {
        debug!(package = %name, shop_id = %shop_id, "Loading package settings");

        let row = sqlx::query_as::<_, PackageRow>(
            r#"
            SELECT id, name, shop_id, enabled, settings, created_at, updated_at
            FROM packages
            WHERE name = ?1 AND shop_id = ?2
            "#,
        )
        .bind(name)
        .bind(shop_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(PackageSettings::try_from).transpose()
    }

    /// Inserts or replaces the settings document of package `name` for `shop_id`.
    pub async fn upsert_settings(
        &self,
        name: &str,
        shop_id: &str,
        settings: &Map<String, Value>,
    ) -> DbResult<()> {
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();
        let payload = serde_json::to_string(settings)?;

        sqlx::query(
            r#"
            INSERT INTO packages (id, name, shop_id, enabled, settings, created_at, updated_at)
            VALUES (?1, ?2, ?3, 1, ?4, ?5, ?5)
            ON CONFLICT (name, shop_id) DO UPDATE SET
                settings = excluded.settings,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&id)
        .bind(name)
        .bind(shop_id)
        .bind(&payload)
        .bind(now)
        .execute(&self.pool)
        .await?;

        info!(package = %name, shop_id = %shop_id, "Package settings saved");
        Ok(())
    }

    /// Sets a shop's active and fallback tax services in package `name`,
    /// keeping any other settings keys. `None` removes the key.
    pub async fn set_tax_services(
        &self,
        name: &str,
        shop_id: &str,
        active: Option<&str>,
        fallback: Option<&str>,
    ) -> DbResult<()> {
        let mut settings = self
            .find_settings(name, shop_id)
            .await?
            .map(|package| package.settings)
            .unwrap_or_default();

        for (key, value) in [(ACTIVE_KEY, active), (FALLBACK_KEY, fallback)] {
            match value {
                Some(service) => {
                    settings.insert(key.to_string(), Value::String(service.to_string()));
                }
                None => {
                    settings.remove(key);
                }
            }
        }

        self.upsert_settings(name, shop_id, &settings).await
    }

    /// Deletes package `name` for `shop_id`.
    pub async fn delete(&self, name: &str, shop_id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM packages WHERE name = ?1 AND shop_id = ?2")
            .bind(name)
            .bind(shop_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Package", format!("{name}/{shop_id}")));
        }

        Ok(())
    }

    /// Counts package rows.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM packages")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Settings Store Adapter
// =============================================================================

/// Serves the tax package's settings to the orchestrator.
#[derive(Debug, Clone)]
pub struct SqliteShopTaxConfigStore {
    packages: PackageRepository,
    package_name: String,
}

impl SqliteShopTaxConfigStore {
    pub fn new(packages: PackageRepository, package_name: impl Into<String>) -> Self {
        SqliteShopTaxConfigStore {
            packages,
            package_name: package_name.into(),
        }
    }

    /// Reads and decodes the shop's tax settings.
    pub async fn load(&self, shop_id: &str) -> DbResult<Option<ShopTaxConfiguration>> {
        let Some(package) = self.packages.find_settings(&self.package_name, shop_id).await? else {
            return Ok(None);
        };

        let config = serde_json::from_value(Value::Object(package.settings))?;
        Ok(Some(config))
    }
}

#[async_trait]
impl ShopTaxConfigStore for SqliteShopTaxConfigStore {
    async fn find_shop_tax_config(
        &self,
        shop_id: &str,
    ) -> Result<Option<ShopTaxConfiguration>, StoreError> {
        Ok(self.load(shop_id).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
