//! # taxes-core: Pluggable Tax-Calculation Dispatcher
//!
//! Given an order, this crate finds the tax service the shop has configured,
//! calls it, falls back to a secondary service on failure, and normalizes the
//! answer into one stable shape whether or not any service is configured.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tax Calculation Flow                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              API layer (cart pricing, order placement)          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ compute_fulfillment_group_taxes        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ taxes-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐       │   │
//! │  │   │ orchestrator │──►│   resolver   │──►│   registry   │       │   │
//! │  │   │ fallback,    │   │ shop → names │   │ name → svc   │       │   │
//! │  │   │ defaults     │   │ → services   │   │              │       │   │
//! │  │   └──────┬───────┘   └──────┬───────┘   └──────────────┘       │   │
//! │  │          │                  │ ShopTaxConfigStore (trait)        │   │
//! │  └──────────┼──────────────────┼───────────────────────────────────┘   │
//! │             │ TaxCalculationService (trait)                             │
//! │  ┌──────────▼───────┐   ┌──────▼─────────────────────────────────┐     │
//! │  │   tax plugins    │   │  taxes-db (SQLite package settings)    │     │
//! │  └──────────────────┘   └────────────────────────────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Orders, tax results, shop settings, request context
//! - [`money`] - Integer `Money` and basis-point `TaxRate`
//! - [`error`] - `TaxError` and the internal error types behind it
//! - [`validation`] - Schema rules for orders and plugin results
//! - [`service`] - The plugin trait and service descriptors
//! - [`registry`] - Installed services, filled at startup
//! - [`resolver`] - Shop settings → resolved services
//! - [`orchestrator`] - The end-to-end calculation with fallback
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use taxes_core::{
//!     FulfillmentGroupTaxInput, InMemoryShopTaxConfigStore, PluginTaxService,
//!     ShopTaxConfiguration, TaxContext, TaxOrchestrator, TaxServiceRegistry,
//! };
//!
//! let mut registry = TaxServiceRegistry::new();
//! registry.register_tax_services(
//!     "taxes-rates",
//!     vec![PluginTaxService::new("custom-rates", "Custom Rates", Arc::new(CustomRates))],
//! );
//!
//! let store = InMemoryShopTaxConfigStore::new()
//!     .with_shop("shop-1", ShopTaxConfiguration::active("custom-rates"));
//!
//! let orchestrator = TaxOrchestrator::new(Arc::new(registry), Arc::new(store));
//! let taxes = orchestrator
//!     .compute_fulfillment_group_taxes(
//!         &TaxContext::new(),
//!         FulfillmentGroupTaxInput { order, force_zeroes: true },
//!     )
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod orchestrator;
pub mod registry;
pub mod resolver;
pub mod service;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{ServiceError, StoreError, TaxError, TaxResult, ValidationError};
pub use money::{Money, TaxRate};
pub use orchestrator::TaxOrchestrator;
pub use registry::TaxServiceRegistry;
pub use resolver::{InMemoryShopTaxConfigStore, ShopTaxConfigStore, ShopTaxResolver, ShopTaxServices};
pub use service::{
    CalculateOrderTaxesInput, PluginRegistration, PluginTaxService, ServiceResult,
    TaxCalculationService, TaxServiceDescriptor,
};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Package name under which shops store their tax settings.
pub const TAXES_PACKAGE_NAME: &str = "reaction-taxes";
