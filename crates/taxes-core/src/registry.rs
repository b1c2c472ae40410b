//! # Service Registry
//!
//! The table of installed tax services, filled once while plugins load.
//!
//! ## Lifecycle
//! ```text
//! startup ──► register(plugin A) ──► register(plugin B) ──► Arc::new(registry)
//!             (&mut, single owner)                           (shared, read-only)
//! ```
//!
//! After initialization the registry is shared as `Arc<TaxServiceRegistry>`.
//! There is no interior mutability, so the type system enforces that no
//! calculation can observe a registration in progress.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::service::{PluginRegistration, PluginTaxService, TaxServiceDescriptor};

/// Installed tax services keyed by name.
#[derive(Debug, Default)]
pub struct TaxServiceRegistry {
    services: HashMap<String, Arc<TaxServiceDescriptor>>,
}

impl TaxServiceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores each declared service under its name, tagged with `plugin_name`.
    ///
    /// Services are processed in the given order. A later registration under
    /// an existing name replaces the earlier one. Entries are stored as given.
    pub fn register_tax_services(
        &mut self,
        plugin_name: &str,
        services: impl IntoIterator<Item = PluginTaxService>,
    ) {
        for declared in services {
            debug!(
                plugin = %plugin_name,
                service = %declared.name,
                display_name = %declared.display_name,
                "Registering tax service"
            );
            let descriptor = TaxServiceDescriptor::from_plugin(plugin_name, declared);
            self.services
                .insert(descriptor.name.clone(), Arc::new(descriptor));
        }
    }

    /// Registers whatever tax services a plugin declares, if any.
    pub fn register_plugin(&mut self, registration: PluginRegistration) {
        if let Some(services) = registration.tax_services {
            self.register_tax_services(&registration.name, services);
        }
    }

    /// Looks up a service by name.
    pub fn get(&self, name: &str) -> Option<Arc<TaxServiceDescriptor>> {
        self.services.get(name).cloned()
    }

    /// Names of all installed services, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.services.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Iterates installed services in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &TaxServiceDescriptor> {
        self.services.values().map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
