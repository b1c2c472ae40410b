//! # Validation Module
//!
//! Schema checks for both boundaries of the dispatcher.
//!
//! ## Where Validation Runs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Boundaries                              │
//! │                                                                         │
//! │  Caller ──► validate_order() ──► plugin ──► validate_tax_result() ──►   │
//! │             (input schema)                  (output schema)     Caller  │
//! │                                                                         │
//! │  Deserialization already guarantees the SHAPE (field names, types).     │
//! │  These functions check the RULES the type system cannot express:       │
//! │  • non-empty ids           • non-negative amounts                       │
//! │  • unique item ids         • quantity and rate bounds                   │
//! │  • ISO currency codes      • address country present                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every check returns the first violation it finds; the orchestrator logs
//! it and reports an opaque calculation error.

use std::collections::HashSet;

use crate::error::{ValidationError, ValidationResult};
use crate::money::{Money, TaxRate};
use crate::types::{
    Address, CalculatedTax, CommonOrder, CommonOrderItem, ItemTax, TaxServiceResult, TaxSummary,
};

// =============================================================================
// Order Validation
// =============================================================================

/// Validates an order before any tax logic runs.
///
/// ## Example
/// ```rust,ignore
/// validate_order(&order)?;
/// ```
pub fn validate_order(order: &CommonOrder) -> ValidationResult<()> {
    require("shopId", &order.shop_id)?;
    validate_currency_code("currencyCode", &order.currency_code)?;

    non_negative("fulfillmentPrices.handling", order.fulfillment_prices.handling)?;
    non_negative("fulfillmentPrices.shipping", order.fulfillment_prices.shipping)?;
    non_negative("fulfillmentPrices.total", order.fulfillment_prices.total)?;

    non_negative("totals.groupDiscountTotal", order.totals.group_discount_total)?;
    non_negative("totals.groupItemTotal", order.totals.group_item_total)?;
    non_negative("totals.groupTotal", order.totals.group_total)?;
    non_negative(
        "totals.orderFulfillmentTotal",
        order.totals.order_fulfillment_total,
    )?;

    for (field, address) in [
        ("originAddress", &order.origin_address),
        ("shippingAddress", &order.shipping_address),
        ("billingAddress", &order.billing_address),
    ] {
        if let Some(address) = address {
            validate_address(field, address)?;
        }
    }

    let mut seen = HashSet::with_capacity(order.items.len());
    for (index, item) in order.items.iter().enumerate() {
        validate_item(index, item)?;
        if !seen.insert(item.item_id.as_str()) {
            return Err(ValidationError::Duplicate {
                field: format!("items[{index}]._id"),
                value: item.item_id.clone(),
            });
        }
    }

    Ok(())
}

fn validate_item(index: usize, item: &CommonOrderItem) -> ValidationResult<()> {
    let path = |name: &str| format!("items[{index}].{name}");

    require(&path("_id"), &item.item_id)?;
    require(&path("productId"), &item.product_id)?;
    require(&path("variantId"), &item.variant_id)?;

    if item.quantity < 1 {
        return Err(ValidationError::BelowMinimum {
            field: path("quantity"),
            min: 1,
        });
    }

    non_negative(&path("price"), item.price)?;
    non_negative(&path("subtotal"), item.subtotal)?;

    Ok(())
}

fn validate_address(field: &str, address: &Address) -> ValidationResult<()> {
    require(&format!("{field}.country"), &address.country)
}

/// Validates an ISO-4217 currency code: exactly three ASCII letters.
///
/// ## Example
/// ```rust
/// use taxes_core::validation::validate_currency_code;
///
/// assert!(validate_currency_code("currencyCode", "USD").is_ok());
/// assert!(validate_currency_code("currencyCode", "US").is_err());
/// ```
pub fn validate_currency_code(field: &str, code: &str) -> ValidationResult<()> {
    if code.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be a three-letter ISO 4217 code".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Result Validation
// =============================================================================

/// Validates what a plugin returned before it reaches the caller.
///
/// Item ids are only checked for presence; whether they match the order's
/// items is the plugin's contract, not a schema rule.
pub fn validate_tax_result(result: &TaxServiceResult) -> ValidationResult<()> {
    validate_summary(&result.tax_summary)?;

    for (index, item_tax) in result.item_taxes.iter().enumerate() {
        validate_item_tax(index, item_tax)?;
    }

    Ok(())
}

fn validate_summary(summary: &TaxSummary) -> ValidationResult<()> {
    non_negative("taxSummary.tax", summary.tax)?;
    non_negative("taxSummary.taxableAmount", summary.taxable_amount)?;

    for (index, line) in summary.taxes.iter().enumerate() {
        validate_tax_line(&format!("taxSummary.taxes[{index}]"), line)?;
    }

    Ok(())
}

fn validate_item_tax(index: usize, item_tax: &ItemTax) -> ValidationResult<()> {
    let base = format!("itemTaxes[{index}]");

    require(&format!("{base}.itemId"), &item_tax.item_id)?;
    non_negative(&format!("{base}.tax"), item_tax.tax)?;
    non_negative(&format!("{base}.taxableAmount"), item_tax.taxable_amount)?;

    for (line_index, line) in item_tax.taxes.iter().enumerate() {
        validate_tax_line(&format!("{base}.taxes[{line_index}]"), line)?;
    }

    Ok(())
}

fn validate_tax_line(base: &str, line: &CalculatedTax) -> ValidationResult<()> {
    require(&format!("{base}._id"), &line.id)?;
    require(&format!("{base}.taxName"), &line.tax_name)?;
    non_negative(&format!("{base}.tax"), line.tax)?;
    non_negative(&format!("{base}.taxableAmount"), line.taxable_amount)?;
    validate_tax_rate(&format!("{base}.taxRate"), line.tax_rate)
}

/// Validates a tax rate: 0 to 10000 basis points (0% to 100%).
pub fn validate_tax_rate(field: &str, rate: TaxRate) -> ValidationResult<()> {
    if rate.bps() > TaxRate::MAX_BPS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: TaxRate::MAX_BPS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

fn require(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FulfillmentPrices, OrderSourceType, OrderTotals, TaxSourcing};

    fn item(id: &str) -> CommonOrderItem {
        CommonOrderItem {
            item_id: id.to_string(),
            product_id: "prod-1".to_string(),
            variant_id: "var-1".to_string(),
            title: "Mug".to_string(),
            variant_title: None,
            product_vendor: None,
            quantity: 2,
            price: Money::from_cents(1200),
            subtotal: Money::from_cents(2400),
            is_taxable: true,
            tax_code: None,
            attributes: Vec::new(),
            parcel: None,
        }
    }

    fn order() -> CommonOrder {
        CommonOrder {
            shop_id: "shop-1".to_string(),
            account_id: None,
            cart_id: Some("cart-1".to_string()),
            order_id: None,
            currency_code: "USD".to_string(),
            source_type: OrderSourceType::Cart,
            fulfillment_type: None,
            fulfillment_method_id: None,
            fulfillment_prices: FulfillmentPrices::default(),
            origin_address: None,
            shipping_address: None,
            billing_address: None,
            items: vec![item("a"), item("b")],
            totals: OrderTotals::default(),
        }
    }

    fn line(tax: i64) -> CalculatedTax {
        CalculatedTax {
            id: "line-1".to_string(),
            jurisdiction_id: Some("US-NY".to_string()),
            sourcing: TaxSourcing::Destination,
            tax: Money::from_cents(tax),
            taxable_amount: Money::from_cents(2400),
            tax_name: "NY State".to_string(),
            tax_rate: TaxRate::from_bps(400),
        }
    }

    fn result() -> TaxServiceResult {
        let mut result = TaxServiceResult::zeroed_for(&order());
        result.tax_summary.taxes.push(line(96));
        result.item_taxes[0].taxes.push(line(96));
        result
    }

    #[test]
    fn test_valid_order() {
        assert!(validate_order(&order()).is_ok());
    }

    #[test]
    fn test_order_without_items_is_valid() {
        let mut order = order();
        order.items.clear();
        assert!(validate_order(&order).is_ok());
    }

    #[test]
    fn test_order_requires_shop_id() {
        let mut order = order();
        order.shop_id = "  ".to_string();
        assert_eq!(
            validate_order(&order),
            Err(ValidationError::Required {
                field: "shopId".to_string()
            })
        );
    }

    #[test]
    fn test_order_rejects_bad_items() {
        let mut bad_quantity = order();
        bad_quantity.items[1].quantity = 0;
        assert!(matches!(
            validate_order(&bad_quantity),
            Err(ValidationError::BelowMinimum { ref field, min: 1 }) if field == "items[1].quantity"
        ));

        let mut negative_price = order();
        negative_price.items[0].price = Money::from_cents(-1);
        assert!(validate_order(&negative_price).is_err());

        let mut duplicate = order();
        duplicate.items[1].item_id = "a".to_string();
        assert!(matches!(
            validate_order(&duplicate),
            Err(ValidationError::Duplicate { .. })
        ));
    }

    #[test]
    fn test_order_accepts_large_quantity() {
        let mut bulk = order();
        bulk.items[0].quantity = 250_000;
        assert_eq!(validate_order(&bulk), Ok(()));
    }

    #[test]
    fn test_order_rejects_address_without_country() {
        let mut order = order();
        order.shipping_address = Some(Address {
            address1: "1 Main St".to_string(),
            city: "Albany".to_string(),
            region: "NY".to_string(),
            postal: "12207".to_string(),
            ..Address::default()
        });
        assert!(validate_order(&order).is_err());
    }

    #[test]
    fn test_currency_code() {
        assert!(validate_currency_code("c", "EUR").is_ok());
        assert!(validate_currency_code("c", "").is_err());
        assert!(validate_currency_code("c", "EURO").is_err());
        assert!(validate_currency_code("c", "E1R").is_err());
    }

    #[test]
    fn test_valid_result() {
        assert!(validate_tax_result(&result()).is_ok());
    }

    #[test]
    fn test_result_rejects_negative_amounts() {
        let mut summary_negative = result();
        summary_negative.tax_summary.tax = Money::from_cents(-5);
        assert!(validate_tax_result(&summary_negative).is_err());

        let mut line_negative = result();
        line_negative.item_taxes[0].taxes[0] = line(-1);
        assert!(matches!(
            validate_tax_result(&line_negative),
            Err(ValidationError::Negative { ref field }) if field == "itemTaxes[0].taxes[0].tax"
        ));
    }

    #[test]
    fn test_result_rejects_missing_item_id_and_bad_rate() {
        let mut missing_id = result();
        missing_id.item_taxes[1].item_id.clear();
        assert!(validate_tax_result(&missing_id).is_err());

        let mut bad_rate = result();
        bad_rate.tax_summary.taxes[0].tax_rate = TaxRate::from_bps(10_001);
        assert!(validate_tax_result(&bad_rate).is_err());
    }
}
