//! # Domain Types
//!
//! The shapes that cross the dispatcher's boundaries.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  INPUT (caller → core → plugin)      OUTPUT (plugin → core → caller)    │
//! │  ┌─────────────────────┐             ┌─────────────────────────────┐    │
//! │  │    CommonOrder      │             │     TaxServiceResult        │    │
//! │  │  ─────────────────  │             │  ─────────────────────────  │    │
//! │  │  shop_id            │             │  tax_summary: TaxSummary    │    │
//! │  │  currency_code      │             │  item_taxes: [ItemTax]      │    │
//! │  │  addresses          │             └──────────────┬──────────────┘    │
//! │  │  items: [Item]      │                            │ validated          │
//! │  └─────────────────────┘                            ▼                   │
//! │                                      ┌─────────────────────────────┐    │
//! │  SETTINGS (store → resolver)         │   FulfillmentGroupTaxes     │    │
//! │  ┌─────────────────────┐             │  ─────────────────────────  │    │
//! │  │ ShopTaxConfiguration│             │  tax_summary: Option<..>    │    │
//! │  │  active / fallback  │             │  item_taxes: [ItemTax]      │    │
//! │  └─────────────────────┘             └─────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All wire types serialize with camelCase field names, matching what the
//! API layer and existing plugins exchange (`taxSummary`, `itemTaxes`, ...).

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::money::{Money, TaxRate};

// =============================================================================
// Order Input
// =============================================================================

/// Where the order being taxed came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderSourceType {
    /// A cart being priced; tax may be reported as unknown.
    #[default]
    Cart,
    /// An order being placed; tax must always be reported.
    Order,
}

/// How the fulfillment group reaches the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentType {
    Shipping,
    Pickup,
    Digital,
}

/// A postal address used for jurisdiction lookups by plugins.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub address1: String,
    #[serde(default)]
    pub address2: Option<String>,
    pub city: String,
    pub region: String,
    pub postal: String,
    /// ISO-3166 country code.
    pub country: String,
}

/// Fulfillment charges for the group.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentPrices {
    pub handling: Money,
    pub shipping: Money,
    pub total: Money,
}

/// Group-level totals as computed by the cart/order assembly.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub group_discount_total: Money,
    pub group_item_total: Money,
    pub group_total: Money,
    pub order_fulfillment_total: Money,
}

/// A label/value attribute of a line item (e.g. "Size" = "L").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ItemAttribute {
    pub label: String,
    pub value: String,
}

/// Shipping parcel dimensions, when the plugin needs them.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Parcel {
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
}

/// One line item of a [`CommonOrder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CommonOrderItem {
    /// Line item id. Plugins echo it back in [`ItemTax::item_id`].
    #[serde(rename = "_id")]
    pub item_id: String,
    pub product_id: String,
    pub variant_id: String,
    pub title: String,
    #[serde(default)]
    pub variant_title: Option<String>,
    #[serde(default)]
    pub product_vendor: Option<String>,
    pub quantity: i64,
    /// Unit price.
    pub price: Money,
    /// `price × quantity` after item-level adjustments.
    pub subtotal: Money,
    #[serde(default = "default_true")]
    pub is_taxable: bool,
    #[serde(default)]
    pub tax_code: Option<String>,
    #[serde(default)]
    pub attributes: Vec<ItemAttribute>,
    #[serde(default)]
    pub parcel: Option<Parcel>,
}

fn default_true() -> bool {
    true
}

/// The order (or order-fulfillment group) to be taxed.
///
/// Built by the caller's cart/order assembly; this crate only validates it
/// and hands it to the configured plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CommonOrder {
    pub shop_id: String,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub cart_id: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
    /// ISO-4217 currency code, e.g. "USD".
    pub currency_code: String,
    #[serde(default)]
    pub source_type: OrderSourceType,
    #[serde(default)]
    pub fulfillment_type: Option<FulfillmentType>,
    #[serde(default)]
    pub fulfillment_method_id: Option<String>,
    #[serde(default)]
    pub fulfillment_prices: FulfillmentPrices,
    #[serde(default)]
    pub origin_address: Option<Address>,
    #[serde(default)]
    pub shipping_address: Option<Address>,
    #[serde(default)]
    pub billing_address: Option<Address>,
    pub items: Vec<CommonOrderItem>,
    #[serde(default)]
    pub totals: OrderTotals,
}

// =============================================================================
// Tax Results
// =============================================================================

/// Which address a jurisdiction's tax was sourced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TaxSourcing {
    Origin,
    #[default]
    Destination,
}

/// One per-jurisdiction tax line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CalculatedTax {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub jurisdiction_id: Option<String>,
    #[serde(default)]
    pub sourcing: TaxSourcing,
    pub tax: Money,
    pub taxable_amount: Money,
    pub tax_name: String,
    pub tax_rate: TaxRate,
}

/// Group-level tax totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TaxSummary {
    #[ts(as = "String")]
    pub calculated_at: DateTime<Utc>,
    /// Opaque id a plugin may attach for later reconciliation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    pub tax: Money,
    pub taxable_amount: Money,
    pub taxes: Vec<CalculatedTax>,
}

impl TaxSummary {
    /// A summary reporting zero tax, stamped with the current time.
    pub fn zero() -> Self {
        TaxSummary {
            calculated_at: Utc::now(),
            reference_id: None,
            tax: Money::zero(),
            taxable_amount: Money::zero(),
            taxes: Vec::new(),
        }
    }
}

/// Tax for one line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ItemTax {
    pub item_id: String,
    pub tax: Money,
    pub taxable_amount: Money,
    pub taxes: Vec<CalculatedTax>,
    /// Plugin-specific data carried through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "Record<string, unknown> | null")]
    pub custom_fields: Option<BTreeMap<String, serde_json::Value>>,
}

impl ItemTax {
    /// A zero-tax entry for `item_id`.
    pub fn zero(item_id: impl Into<String>) -> Self {
        ItemTax {
            item_id: item_id.into(),
            tax: Money::zero(),
            taxable_amount: Money::zero(),
            taxes: Vec::new(),
            custom_fields: None,
        }
    }
}

/// What every tax-calculation service must return when it calculates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TaxServiceResult {
    pub tax_summary: TaxSummary,
    pub item_taxes: Vec<ItemTax>,
}

impl TaxServiceResult {
    /// A fully populated zero result: one zeroed entry per order item.
    pub fn zeroed_for(order: &CommonOrder) -> Self {
        TaxServiceResult {
            tax_summary: TaxSummary::zero(),
            item_taxes: order
                .items
                .iter()
                .map(|item| ItemTax::zero(item.item_id.clone()))
                .collect(),
        }
    }
}

/// What the orchestrator hands back to callers.
///
/// Identical to [`TaxServiceResult`] except that `tax_summary` may be null,
/// meaning "no service was asked, tax is unknown".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentGroupTaxes {
    pub tax_summary: Option<TaxSummary>,
    pub item_taxes: Vec<ItemTax>,
}

impl FulfillmentGroupTaxes {
    /// The empty result used for cart estimates: `{ itemTaxes: [], taxSummary: null }`.
    pub fn unknown() -> Self {
        FulfillmentGroupTaxes {
            tax_summary: None,
            item_taxes: Vec::new(),
        }
    }

    /// True when no tax summary is present.
    pub fn is_unknown(&self) -> bool {
        self.tax_summary.is_none()
    }
}

impl From<TaxServiceResult> for FulfillmentGroupTaxes {
    fn from(result: TaxServiceResult) -> Self {
        FulfillmentGroupTaxes {
            tax_summary: Some(result.tax_summary),
            item_taxes: result.item_taxes,
        }
    }
}

// =============================================================================
// Shop Settings
// =============================================================================

/// A shop's selection of tax services, as stored in its package settings.
///
/// Both names are optional at this layer: a settings record that exists but
/// names no active service is treated as "not configured".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopTaxConfiguration {
    #[serde(default, rename = "activeTaxServiceName")]
    pub active_service_name: Option<String>,
    #[serde(default, rename = "fallbackTaxServiceName")]
    pub fallback_service_name: Option<String>,
}

impl ShopTaxConfiguration {
    /// Configuration with only an active service.
    pub fn active(name: impl Into<String>) -> Self {
        ShopTaxConfiguration {
            active_service_name: Some(name.into()),
            fallback_service_name: None,
        }
    }

    /// Adds a fallback service.
    pub fn with_fallback(mut self, name: impl Into<String>) -> Self {
        self.fallback_service_name = Some(name.into());
        self
    }

    /// The active service name exactly as stored, ignoring blank strings.
    pub fn active_name(&self) -> Option<&str> {
        non_blank(self.active_service_name.as_deref())
    }

    /// The fallback service name exactly as stored, ignoring blank strings.
    pub fn fallback_name(&self) -> Option<&str> {
        non_blank(self.fallback_service_name.as_deref())
    }
}

fn non_blank(name: Option<&str>) -> Option<&str> {
    name.filter(|n| !n.trim().is_empty())
}

// =============================================================================
// Calculation Context
// =============================================================================

/// Per-request context passed through to tax plugins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxContext {
    /// Correlates every log line of one calculation.
    pub request_id: Uuid,
    /// The account on whose behalf taxes are calculated, if any.
    pub account_id: Option<String>,
    /// Opaque caller data; plugins interpret it, the core never reads it.
    pub attributes: HashMap<String, String>,
}

impl TaxContext {
    /// A context with a fresh request id and no account.
    pub fn new() -> Self {
        TaxContext {
            request_id: Uuid::new_v4(),
            account_id: None,
            attributes: HashMap::new(),
        }
    }

    /// Sets the calling account.
    pub fn with_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    /// Adds an opaque attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

impl Default for TaxContext {
    fn default() -> Self {
        TaxContext::new()
    }
}

/// Caller input for one fulfillment-group calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct FulfillmentGroupTaxInput {
    pub order: CommonOrder,
    /// `true` for placed orders (always report a number), `false` for carts.
    pub force_zeroes: bool,
}

// =============================================================================
// Unit Tests
// =============================================================================
