//! # Shop Configuration Resolver
//!
//! Turns a shop id into the tax services that shop has selected.
//!
//! ## Resolution Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  find_shop_tax_config(shop_id)                                          │
//! │       │                                                                 │
//! │       ├── Err(store)            → TaxError::ConfigStore                 │
//! │       ├── None                  → Unconfigured                          │
//! │       ├── no active name        → Unconfigured                          │
//! │       ▼                                                                 │
//! │  registry.get(active)                                                   │
//! │       ├── missing               → TaxError::UnknownActiveService        │
//! │       ▼                                                                 │
//! │  registry.get(fallback)  (only when a fallback name is set)             │
//! │       ├── missing               → TaxError::UnknownFallbackService      │
//! │       ▼                                                                 │
//! │  Configured { active, fallback }                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::error::{StoreError, TaxError, TaxResult};
use crate::registry::TaxServiceRegistry;
use crate::service::TaxServiceDescriptor;
use crate::types::ShopTaxConfiguration;

// =============================================================================
// Settings Store
// =============================================================================

/// Read access to per-shop tax settings.
///
/// Implemented by the persistence layer (see the `taxes-db` crate) and by
/// [`InMemoryShopTaxConfigStore`].
#[async_trait]
pub trait ShopTaxConfigStore: Send + Sync {
    /// Returns the shop's tax settings, or `None` if the shop has none.
    async fn find_shop_tax_config(
        &self,
        shop_id: &str,
    ) -> Result<Option<ShopTaxConfiguration>, StoreError>;
}

/// A map-backed settings store, filled before use.
#[derive(Debug, Clone, Default)]
pub struct InMemoryShopTaxConfigStore {
    configs: HashMap<String, ShopTaxConfiguration>,
}

impl InMemoryShopTaxConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a shop's settings.
    pub fn with_shop(mut self, shop_id: impl Into<String>, config: ShopTaxConfiguration) -> Self {
        self.configs.insert(shop_id.into(), config);
        self
    }
}

#[async_trait]
impl ShopTaxConfigStore for InMemoryShopTaxConfigStore {
    async fn find_shop_tax_config(
        &self,
        shop_id: &str,
    ) -> Result<Option<ShopTaxConfiguration>, StoreError> {
        Ok(self.configs.get(shop_id).cloned())
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// The outcome of resolving a shop's settings against the registry.
#[derive(Debug, Clone)]
pub enum ShopTaxServices {
    /// No settings, or settings without an active service.
    Unconfigured,
    Configured {
        active: Arc<TaxServiceDescriptor>,
        fallback: Option<Arc<TaxServiceDescriptor>>,
    },
}

impl ShopTaxServices {
    pub fn is_configured(&self) -> bool {
        matches!(self, ShopTaxServices::Configured { .. })
    }
}

/// Resolves shop settings against the installed services.
#[derive(Clone)]
pub struct ShopTaxResolver {
    registry: Arc<TaxServiceRegistry>,
    store: Arc<dyn ShopTaxConfigStore>,
}

impl ShopTaxResolver {
    pub fn new(registry: Arc<TaxServiceRegistry>, store: Arc<dyn ShopTaxConfigStore>) -> Self {
        ShopTaxResolver { registry, store }
    }

    /// The registry this resolver reads from.
    pub fn registry(&self) -> &TaxServiceRegistry {
        &self.registry
    }

    /// Resolves the active and fallback services for `shop_id`.
    ///
    /// A fallback name that is set but not installed is an error, the same as
    /// an unknown active name.
    pub async fn resolve(&self, shop_id: &str) -> TaxResult<ShopTaxServices> {
        let config = self
            .store
            .find_shop_tax_config(shop_id)
            .await
            .map_err(|source| {
                error!(shop_id = %shop_id, error = %source, "Failed to read shop tax settings");
                TaxError::ConfigStore {
                    shop_id: shop_id.to_string(),
                    source,
                }
            })?;

        let Some(config) = config else {
            debug!(shop_id = %shop_id, "No tax settings for shop");
            return Ok(ShopTaxServices::Unconfigured);
        };

        let Some(active_name) = config.active_name() else {
            debug!(shop_id = %shop_id, "Tax settings have no active service");
            return Ok(ShopTaxServices::Unconfigured);
        };

        let active = self.registry.get(active_name).ok_or_else(|| {
            error!(
                shop_id = %shop_id,
                service = %active_name,
                "Active tax service is not installed"
            );
            TaxError::UnknownActiveService {
                name: active_name.to_string(),
            }
        })?;

        let fallback = match config.fallback_name() {
            None => None,
            Some(fallback_name) => {
                let fallback = self.registry.get(fallback_name).ok_or_else(|| {
                    error!(
                        shop_id = %shop_id,
                        service = %fallback_name,
                        "Fallback tax service is not installed"
                    );
                    TaxError::UnknownFallbackService {
                        name: fallback_name.to_string(),
                    }
                })?;
                Some(fallback)
            }
        };

        Ok(ShopTaxServices::Configured { active, fallback })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
