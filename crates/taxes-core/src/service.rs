//! # Tax Service Capability
//!
//! The one interface a tax plugin implements, and the descriptor the
//! registry stores for it.
//!
//! ## Plugin Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  calculate_order_taxes({ context, order })                              │
//! │                                                                         │
//! │    Ok(Some(result))  → calculated; result is validated, then returned   │
//! │    Ok(None)          → declined (e.g. no address yet); NOT a failure,   │
//! │                        the caller gets the default result               │
//! │    Err(ServiceError) → failed; the orchestrator tries the fallback      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::types::{CommonOrder, TaxContext, TaxServiceResult};

/// What a plugin returns: a result, a decline (`None`), or a failure.
pub type ServiceResult = Result<Option<TaxServiceResult>, ServiceError>;

/// Arguments handed to a plugin.
#[derive(Debug, Clone, Copy)]
pub struct CalculateOrderTaxesInput<'a> {
    pub context: &'a TaxContext,
    pub order: &'a CommonOrder,
}

/// A tax-calculation capability provided by a plugin.
///
/// The orchestrator depends only on this trait, never on concrete services.
/// Implementations own their own timeouts; the orchestrator waits as long as
/// the returned future takes.
#[async_trait]
pub trait TaxCalculationService: Send + Sync {
    /// Calculates taxes for one order.
    async fn calculate_order_taxes(&self, input: CalculateOrderTaxesInput<'_>) -> ServiceResult;
}

/// A service as declared by a plugin, before registration.
#[derive(Clone)]
pub struct PluginTaxService {
    /// Stable key referenced by shop settings.
    pub name: String,
    /// Label used in diagnostics.
    pub display_name: String,
    pub service: Arc<dyn TaxCalculationService>,
}

impl PluginTaxService {
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        service: Arc<dyn TaxCalculationService>,
    ) -> Self {
        PluginTaxService {
            name: name.into(),
            display_name: display_name.into(),
            service,
        }
    }
}

impl fmt::Debug for PluginTaxService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginTaxService")
            .field("name", &self.name)
            .field("display_name", &self.display_name)
            .finish_non_exhaustive()
    }
}

/// A registered service: the plugin's declaration plus its provenance.
#[derive(Clone)]
pub struct TaxServiceDescriptor {
    pub name: String,
    pub display_name: String,
    /// The plugin that registered this service.
    pub plugin_name: String,
    service: Arc<dyn TaxCalculationService>,
}

impl TaxServiceDescriptor {
    /// Attaches `plugin_name` to a declared service.
    pub fn from_plugin(plugin_name: impl Into<String>, declared: PluginTaxService) -> Self {
        TaxServiceDescriptor {
            name: declared.name,
            display_name: declared.display_name,
            plugin_name: plugin_name.into(),
            service: declared.service,
        }
    }

    /// Invokes the service's calculation.
    pub async fn calculate_order_taxes(
        &self,
        context: &TaxContext,
        order: &CommonOrder,
    ) -> ServiceResult {
        self.service
            .calculate_order_taxes(CalculateOrderTaxesInput { context, order })
            .await
    }
}

impl fmt::Debug for TaxServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaxServiceDescriptor")
            .field("name", &self.name)
            .field("display_name", &self.display_name)
            .field("plugin_name", &self.plugin_name)
            .finish_non_exhaustive()
    }
}

/// Everything a plugin passes when it is installed.
///
/// Plugins that provide no tax services leave `tax_services` as `None`.
#[derive(Debug, Clone, Default)]
pub struct PluginRegistration {
    pub name: String,
    pub tax_services: Option<Vec<PluginTaxService>>,
}
