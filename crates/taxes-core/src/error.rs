//! # Error Types
//!
//! Error types for taxes-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  Internal (logged, never shown to callers)                              │
//! │  ├── ValidationError  - order or plugin result breaks the schema        │
//! │  └── ServiceError     - a plugin's calculate_order_taxes failed         │
//! │                                                                         │
//! │  Caller-facing                                                          │
//! │  ├── StoreError       - settings store could not be read                │
//! │  └── TaxError         - what compute_fulfillment_group_taxes returns    │
//! │      ├── UnknownActiveService / UnknownFallbackService  (operator)      │
//! │      ├── ConfigStore                                    (operator)      │
//! │      └── Calculation  (opaque: "Error while calculating taxes")         │
//! │                                                                         │
//! │  Flow: ValidationError ─┐                                               │
//! │        ServiceError ────┴──► logged ──► TaxError::Calculation           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// The message every calculation failure shows to callers.
pub const CALCULATION_ERROR_MESSAGE: &str = "Error while calculating taxes";

// =============================================================================
// Tax Error
// =============================================================================

/// Errors returned by the resolver and orchestrator.
///
/// Only configuration problems carry detail; they need an operator to fix
/// the shop's settings or install a plugin. Every other failure collapses
/// into [`TaxError::Calculation`], whose message never mentions the plugin.
#[derive(Debug, Error)]
pub enum TaxError {
    /// The shop's active service is not in the registry.
    #[error(
        "Active tax service is \"{name}\" but no such service exists. \
         Did you forget to install the plugin that provides this service?"
    )]
    UnknownActiveService { name: String },

    /// The shop names a fallback service that is not in the registry.
    #[error(
        "Fallback tax service is \"{name}\" but no such service exists. \
         Did you forget to install the plugin that provides this service?"
    )]
    UnknownFallbackService { name: String },

    /// The shop's tax settings could not be read.
    #[error("Unable to read tax settings for shop {shop_id}: {source}")]
    ConfigStore {
        shop_id: String,
        #[source]
        source: StoreError,
    },

    /// Anything else went wrong while calculating. Details are in the log.
    #[error("Error while calculating taxes")]
    Calculation,
}

impl TaxError {
    /// Returns true if an operator must fix the shop's tax setup.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            TaxError::UnknownActiveService { .. }
                | TaxError::UnknownFallbackService { .. }
                | TaxError::ConfigStore { .. }
        )
    }

    /// Returns true for the opaque internal calculation error.
    pub fn is_calculation_error(&self) -> bool {
        matches!(self, TaxError::Calculation)
    }
}

/// Convenience type alias for Results with TaxError.
pub type TaxResult<T> = Result<T, TaxError>;

// =============================================================================
// Validation Error
// =============================================================================

/// Schema violations in an order or a plugin result.
///
/// `field` is a path such as `items[2].quantity` so the log line points at
/// the offending value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Numeric value is below its lower bound.
    #[error("{field} must be at least {min}")]
    BelowMinimum { field: String, min: i64 },

    /// Amount must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., currency code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., two items with the same id).
    #[error("{field} '{value}' is duplicated")]
    Duplicate { field: String, value: String },
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Service Error
// =============================================================================

/// A failure raised by a tax plugin's calculation.
///
/// Plugins build these however they like; the orchestrator only logs them
/// and decides whether to try the fallback.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ServiceError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl ServiceError {
    /// A failure described by a message only.
    pub fn new(message: impl Into<String>) -> Self {
        ServiceError {
            message: message.into(),
            source: None,
        }
    }

    /// A failure wrapping an underlying error (HTTP client, parser, ...).
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ServiceError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The plugin's own description of the failure.
    pub fn message(&self) -> &str {
        &self.message
    }
}

// =============================================================================
// Store Error
// =============================================================================

/// A failure reading shop tax settings from a [`crate::resolver::ShopTaxConfigStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached or queried.
    #[error("settings store unavailable: {0}")]
    Unavailable(String),

    /// A settings record exists but cannot be decoded.
    #[error("malformed tax settings: {0}")]
    Malformed(String),
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculation_error_is_opaque() {
        let err = TaxError::Calculation;
        assert_eq!(err.to_string(), CALCULATION_ERROR_MESSAGE);
        assert!(err.is_calculation_error());
        assert!(!err.is_config_error());
    }

    #[test]
    fn test_unknown_service_names_the_service() {
        let err = TaxError::UnknownActiveService {
            name: "avalara".to_string(),
        };
        assert!(err.is_config_error());
        assert!(err.to_string().contains("\"avalara\""));
        assert!(err.to_string().contains("install the plugin"));
    }

    #[test]
    fn test_store_error_is_config_category() {
        let err = TaxError::ConfigStore {
            shop_id: "shop-1".to_string(),
            source: StoreError::Unavailable("pool closed".to_string()),
        };
        assert!(err.is_config_error());
        assert!(err.to_string().contains("shop-1"));
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Negative {
            field: "itemTaxes[0].tax".to_string(),
        };
        assert_eq!(err.to_string(), "itemTaxes[0].tax must not be negative");
    }

    #[test]
    fn test_service_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "upstream timeout");
        let err = ServiceError::with_source("rate lookup failed", io);
        assert_eq!(err.message(), "rate lookup failed");
        assert!(std::error::Error::source(&err).is_some());
    }
}
