//! # Tax Orchestrator
//!
//! Runs one fulfillment-group tax calculation end to end.
//!
//! ## State Machine (per call)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Validating ──invalid──► Failed(Calculation)                            │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  Resolving ──config error──► Failed(config error, passed through)       │
//! │      │                                                                  │
//! │      ├── Unconfigured ─────────────────────────► Default                │
//! │      ▼                                                                  │
//! │  Invoking active                                                        │
//! │      ├── Calculated ──────────────────┐                                 │
//! │      ├── Declined ────────────────────┼────────► Default                │
//! │      └── Failed                       │                                 │
//! │            ├── no fallback ───────────┼────────► Failed(Calculation)    │
//! │            ▼                          │                                 │
//! │          Invoking fallback            │                                 │
//! │            ├── Calculated ────────────┤                                 │
//! │            ├── Declined ──────────────┼────────► Default                │
//! │            └── Failed ────────────────┼────────► Failed(Calculation)    │
//! │                                       ▼                                 │
//! │                              Validating result                          │
//! │                                ├── invalid ────► Failed(Calculation)    │
//! │                                └── valid ──────► Success                │
//! │                                                                         │
//! │  Default = zeroed result when force_zeroes, otherwise unknown result    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only one fallback tier exists. A declined calculation never triggers the
//! fallback; only a failure does.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::error::{ServiceError, TaxError, TaxResult};
use crate::registry::TaxServiceRegistry;
use crate::resolver::{ShopTaxConfigStore, ShopTaxResolver, ShopTaxServices};
use crate::service::{ServiceResult, TaxServiceDescriptor};
use crate::types::{
    CommonOrder, FulfillmentGroupTaxInput, FulfillmentGroupTaxes, TaxContext, TaxServiceResult,
};
use crate::validation::{validate_order, validate_tax_result};

/// The outcome of invoking one service, classified for the fallback policy.
#[derive(Debug)]
enum Invocation {
    Calculated(TaxServiceResult),
    Declined,
    Failed(ServiceError),
}

impl From<ServiceResult> for Invocation {
    fn from(result: ServiceResult) -> Self {
        match result {
            Ok(Some(result)) => Invocation::Calculated(result),
            Ok(None) => Invocation::Declined,
            Err(err) => Invocation::Failed(err),
        }
    }
}

/// Dispatches tax calculations to the services each shop has configured.
///
/// Cheap to clone; share one instance across requests.
#[derive(Clone)]
pub struct TaxOrchestrator {
    resolver: ShopTaxResolver,
}

impl TaxOrchestrator {
    pub fn new(registry: Arc<TaxServiceRegistry>, store: Arc<dyn ShopTaxConfigStore>) -> Self {
        TaxOrchestrator {
            resolver: ShopTaxResolver::new(registry, store),
        }
    }

    /// Builds an orchestrator around an existing resolver.
    pub fn with_resolver(resolver: ShopTaxResolver) -> Self {
        TaxOrchestrator { resolver }
    }

    pub fn resolver(&self) -> &ShopTaxResolver {
        &self.resolver
    }

    /// Returns all taxes that apply to `input.order`, delegating the actual
    /// calculation to the shop's tax service.
    ///
    /// ## Errors
    /// - [`TaxError::UnknownActiveService`], [`TaxError::UnknownFallbackService`]
    ///   and [`TaxError::ConfigStore`] when the shop's setup is broken.
    /// - [`TaxError::Calculation`] for everything else; the cause is logged.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let taxes = orchestrator
    ///     .compute_fulfillment_group_taxes(&TaxContext::new(), FulfillmentGroupTaxInput {
    ///         order,
    ///         force_zeroes: true,
    ///     })
    ///     .await?;
    /// ```
    pub async fn compute_fulfillment_group_taxes(
        &self,
        context: &TaxContext,
        input: FulfillmentGroupTaxInput,
    ) -> TaxResult<FulfillmentGroupTaxes> {
        let FulfillmentGroupTaxInput {
            order,
            force_zeroes,
        } = input;
        let request_id = context.request_id;

        if let Err(err) = validate_order(&order) {
            error!(
                %request_id,
                shop_id = %order.shop_id,
                error = %err,
                "Invalid order input provided to compute_fulfillment_group_taxes"
            );
            return Err(TaxError::Calculation);
        }

        let (active, fallback) = match self.resolver.resolve(&order.shop_id).await? {
            ShopTaxServices::Unconfigured => {
                debug!(%request_id, shop_id = %order.shop_id, "No tax service configured");
                return Ok(default_result(&order, force_zeroes));
            }
            ShopTaxServices::Configured { active, fallback } => (active, fallback),
        };

        let (result, source) = match invoke(&active, context, &order).await {
            Invocation::Calculated(result) => (result, &active),
            Invocation::Declined => {
                debug!(
                    %request_id,
                    service = %active.display_name,
                    "Tax service declined to calculate"
                );
                return Ok(default_result(&order, force_zeroes));
            }
            Invocation::Failed(err) => {
                error!(
                    %request_id,
                    shop_id = %order.shop_id,
                    error = %err,
                    "Error in calculate_order_taxes for the active tax service ({})",
                    active.display_name
                );

                let Some(fallback) = fallback.as_ref() else {
                    return Err(TaxError::Calculation);
                };

                info!(
                    %request_id,
                    fallback = %fallback.display_name,
                    "Primary tax service calculation failed. Using set fallback tax service"
                );

                match invoke(fallback, context, &order).await {
                    Invocation::Calculated(result) => (result, fallback),
                    Invocation::Declined => {
                        debug!(
                            %request_id,
                            service = %fallback.display_name,
                            "Fallback tax service declined to calculate"
                        );
                        return Ok(default_result(&order, force_zeroes));
                    }
                    Invocation::Failed(fallback_err) => {
                        error!(
                            %request_id,
                            shop_id = %order.shop_id,
                            error = %fallback_err,
                            "Error in calculate_order_taxes for the fallback tax service ({})",
                            fallback.display_name
                        );
                        return Err(TaxError::Calculation);
                    }
                }
            }
        };

        if let Err(err) = validate_tax_result(&result) {
            error!(
                %request_id,
                shop_id = %order.shop_id,
                error = %err,
                "Invalid return from calculate_order_taxes for tax service ({})",
                source.display_name
            );
            return Err(TaxError::Calculation);
        }

        Ok(result.into())
    }
}

async fn invoke(
    service: &TaxServiceDescriptor,
    context: &TaxContext,
    order: &CommonOrder,
) -> Invocation {
    service.calculate_order_taxes(context, order).await.into()
}

/// The result returned when no service calculated anything.
fn default_result(order: &CommonOrder, force_zeroes: bool) -> FulfillmentGroupTaxes {
    if force_zeroes {
        TaxServiceResult::zeroed_for(order).into()
    } else {
        FulfillmentGroupTaxes::unknown()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use crate::money::{Money, TaxRate};
    use crate::resolver::InMemoryShopTaxConfigStore;
    use crate::service::{CalculateOrderTaxesInput, PluginTaxService, TaxCalculationService};
    use crate::types::{
        CalculatedTax, CommonOrderItem, FulfillmentPrices, ItemTax, OrderSourceType, OrderTotals,
        ShopTaxConfiguration, TaxSourcing, TaxSummary,
    };

    const SHOP: &str = "shop-1";

    /// What a mock service does when called.
    #[derive(Clone)]
    enum Behavior {
        Calculate(TaxServiceResult),
        Decline,
        Fail,
    }

    struct MockService {
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl MockService {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(MockService {
                behavior,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TaxCalculationService for MockService {
        async fn calculate_order_taxes(&self, input: CalculateOrderTaxesInput<'_>) -> ServiceResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(input.order.shop_id, SHOP);
            match &self.behavior {
                Behavior::Calculate(result) => Ok(Some(result.clone())),
                Behavior::Decline => Ok(None),
                Behavior::Fail => Err(ServiceError::new("upstream returned 503")),
            }
        }
    }

    fn item(id: &str, subtotal: i64) -> CommonOrderItem {
        CommonOrderItem {
            item_id: id.to_string(),
            product_id: format!("prod-{id}"),
            variant_id: format!("var-{id}"),
            title: "Notebook".to_string(),
            variant_title: None,
            product_vendor: None,
            quantity: 1,
            price: Money::from_cents(subtotal),
            subtotal: Money::from_cents(subtotal),
            is_taxable: true,
            tax_code: None,
            attributes: Vec::new(),
            parcel: None,
        }
    }

    fn order() -> CommonOrder {
        CommonOrder {
            shop_id: SHOP.to_string(),
            account_id: Some("acct-1".to_string()),
            cart_id: None,
            order_id: Some("order-1".to_string()),
            currency_code: "USD".to_string(),
            source_type: OrderSourceType::Order,
            fulfillment_type: None,
            fulfillment_method_id: None,
            fulfillment_prices: FulfillmentPrices::default(),
            origin_address: None,
            shipping_address: None,
            billing_address: None,
            items: vec![item("a", 1000), item("b", 2000)],
            totals: OrderTotals::default(),
        }
    }

    fn tax_line(tax: i64, taxable: i64) -> CalculatedTax {
        CalculatedTax {
            id: format!("line-{tax}"),
            jurisdiction_id: Some("US-TX".to_string()),
            sourcing: TaxSourcing::Destination,
            tax: Money::from_cents(tax),
            taxable_amount: Money::from_cents(taxable),
            tax_name: "Texas State".to_string(),
            tax_rate: TaxRate::from_bps(825),
        }
    }

    fn calculated(marker: &str) -> TaxServiceResult {
        TaxServiceResult {
            tax_summary: TaxSummary {
                calculated_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
                reference_id: Some(marker.to_string()),
                tax: Money::from_cents(248),
                taxable_amount: Money::from_cents(3000),
                taxes: vec![tax_line(248, 3000)],
            },
            item_taxes: vec![
                ItemTax {
                    item_id: "a".to_string(),
                    tax: Money::from_cents(83),
                    taxable_amount: Money::from_cents(1000),
                    taxes: vec![tax_line(83, 1000)],
                    custom_fields: None,
                },
                ItemTax {
                    item_id: "b".to_string(),
                    tax: Money::from_cents(165),
                    taxable_amount: Money::from_cents(2000),
                    taxes: vec![tax_line(165, 2000)],
                    custom_fields: Some(
                        [("exemptionCode".to_string(), serde_json::json!("E-7"))]
                            .into_iter()
                            .collect(),
                    ),
                },
            ],
        }
    }

    fn orchestrator(
        config: Option<ShopTaxConfiguration>,
        active: Arc<MockService>,
        fallback: Arc<MockService>,
    ) -> TaxOrchestrator {
        let mut registry = TaxServiceRegistry::new();
        registry.register_tax_services(
            "taxes-test",
            vec![
                PluginTaxService::new("primary", "Primary Rates", active),
                PluginTaxService::new("secondary", "Secondary Rates", fallback),
            ],
        );

        let mut store = InMemoryShopTaxConfigStore::new();
        if let Some(config) = config {
            store = store.with_shop(SHOP, config);
        }

        TaxOrchestrator::new(Arc::new(registry), Arc::new(store))
    }

    fn with_fallback() -> Option<ShopTaxConfiguration> {
        Some(ShopTaxConfiguration::active("primary").with_fallback("secondary"))
    }

    async fn compute(
        orchestrator: &TaxOrchestrator,
        order: CommonOrder,
        force_zeroes: bool,
    ) -> TaxResult<FulfillmentGroupTaxes> {
        orchestrator
            .compute_fulfillment_group_taxes(
                &TaxContext::new(),
                FulfillmentGroupTaxInput {
                    order,
                    force_zeroes,
                },
            )
            .await
    }

    // -------------------------------------------------------------------------
    // Default results
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_unconfigured_force_zeroes_returns_zero_per_item() {
        let active = MockService::new(Behavior::Fail);
        let orchestrator = orchestrator(None, active.clone(), MockService::new(Behavior::Fail));

        let taxes = compute(&orchestrator, order(), true).await.unwrap();

        let summary = taxes.tax_summary.expect("zeroed summary");
        assert!(summary.tax.is_zero());
        assert!(summary.taxable_amount.is_zero());
        assert!(summary.taxes.is_empty());
        assert_eq!(taxes.item_taxes.len(), 2);
        assert_eq!(taxes.item_taxes[0].item_id, "a");
        assert_eq!(taxes.item_taxes[1].item_id, "b");
        assert!(taxes
            .item_taxes
            .iter()
            .all(|t| t.tax.is_zero() && t.taxable_amount.is_zero() && t.taxes.is_empty()));
        assert_eq!(active.calls(), 0);
    }

    #[tokio::test]
    async fn test_unconfigured_without_force_zeroes_is_unknown() {
        let orchestrator = orchestrator(
            None,
            MockService::new(Behavior::Fail),
            MockService::new(Behavior::Fail),
        );

        let taxes = compute(&orchestrator, order(), false).await.unwrap();
        assert_eq!(taxes, FulfillmentGroupTaxes::unknown());
    }

    #[tokio::test]
    async fn test_settings_without_active_service_use_default() {
        let config = ShopTaxConfiguration {
            active_service_name: None,
            fallback_service_name: Some("secondary".to_string()),
        };
        let fallback = MockService::new(Behavior::Calculate(calculated("fallback")));
        let orchestrator =
            orchestrator(Some(config), MockService::new(Behavior::Fail), fallback.clone());

        let taxes = compute(&orchestrator, order(), false).await.unwrap();
        assert!(taxes.is_unknown());
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn test_active_declines_returns_default_without_fallback() {
        let active = MockService::new(Behavior::Decline);
        let fallback = MockService::new(Behavior::Calculate(calculated("fallback")));
        let orchestrator = orchestrator(with_fallback(), active.clone(), fallback.clone());

        let taxes = compute(&orchestrator, order(), true).await.unwrap();
        assert_eq!(taxes.item_taxes.len(), 2);
        assert!(taxes.tax_summary.unwrap().tax.is_zero());
        assert_eq!(active.calls(), 1);
        assert_eq!(fallback.calls(), 0);

        let taxes = compute(&orchestrator, order(), false).await.unwrap();
        assert!(taxes.is_unknown());
        assert!(taxes.item_taxes.is_empty());
    }

    // -------------------------------------------------------------------------
    // Active / fallback tiers
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_active_success_never_invokes_fallback() {
        let active = MockService::new(Behavior::Calculate(calculated("active")));
        let fallback = MockService::new(Behavior::Calculate(calculated("fallback")));
        let orchestrator = orchestrator(with_fallback(), active.clone(), fallback.clone());

        let taxes = compute(&orchestrator, order(), true).await.unwrap();
        assert_eq!(taxes, FulfillmentGroupTaxes::from(calculated("active")));
        assert_eq!(active.calls(), 1);
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn test_result_is_returned_unchanged() {
        let active = MockService::new(Behavior::Calculate(calculated("active")));
        let orchestrator = orchestrator(
            Some(ShopTaxConfiguration::active("primary")),
            active,
            MockService::new(Behavior::Fail),
        );

        let taxes = compute(&orchestrator, order(), false).await.unwrap();

        let returned = serde_json::to_value(&taxes).unwrap();
        let produced = serde_json::to_value(calculated("active")).unwrap();
        assert_eq!(returned, produced);
    }

    #[tokio::test]
    async fn test_active_failure_uses_fallback_result() {
        let active = MockService::new(Behavior::Fail);
        let fallback = MockService::new(Behavior::Calculate(calculated("fallback")));
        let orchestrator = orchestrator(with_fallback(), active.clone(), fallback.clone());

        let taxes = compute(&orchestrator, order(), true).await.unwrap();
        assert_eq!(taxes, FulfillmentGroupTaxes::from(calculated("fallback")));
        assert_eq!(active.calls(), 1);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_active_failure_without_fallback_is_calculation_error() {
        let active = MockService::new(Behavior::Fail);
        let orchestrator = orchestrator(
            Some(ShopTaxConfiguration::active("primary")),
            active.clone(),
            MockService::new(Behavior::Calculate(calculated("unused"))),
        );

        let err = compute(&orchestrator, order(), true).await.unwrap_err();
        assert!(err.is_calculation_error());
        assert_eq!(err.to_string(), "Error while calculating taxes");
        assert_eq!(active.calls(), 1);
    }

    #[tokio::test]
    async fn test_fallback_failure_is_calculation_error() {
        let orchestrator = orchestrator(
            with_fallback(),
            MockService::new(Behavior::Fail),
            MockService::new(Behavior::Fail),
        );

        let err = compute(&orchestrator, order(), false).await.unwrap_err();
        assert!(err.is_calculation_error());
    }

    #[tokio::test]
    async fn test_fallback_declines_returns_default() {
        let orchestrator = orchestrator(
            with_fallback(),
            MockService::new(Behavior::Fail),
            MockService::new(Behavior::Decline),
        );

        let zeroed = compute(&orchestrator, order(), true).await.unwrap();
        assert_eq!(zeroed.item_taxes.len(), 2);
        assert!(zeroed.tax_summary.unwrap().tax.is_zero());

        let unknown = compute(&orchestrator, order(), false).await.unwrap();
        assert!(unknown.is_unknown());
    }

    // -------------------------------------------------------------------------
    // Validation boundaries
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_invalid_order_is_calculation_error_before_resolving() {
        let active = MockService::new(Behavior::Calculate(calculated("active")));
        // Unknown active service: would be a config error if resolution ran.
        let orchestrator = orchestrator(
            Some(ShopTaxConfiguration::active("missing")),
            active.clone(),
            MockService::new(Behavior::Fail),
        );

        let mut order = order();
        order.items[0].quantity = -3;

        let err = compute(&orchestrator, order, true).await.unwrap_err();
        assert!(err.is_calculation_error());
        assert_eq!(active.calls(), 0);
    }

    #[tokio::test]
    async fn test_large_quantity_reaches_service() {
        let active = MockService::new(Behavior::Calculate(calculated("active")));
        let orchestrator = orchestrator(
            Some(ShopTaxConfiguration::active("primary")),
            active.clone(),
            MockService::new(Behavior::Fail),
        );

        let mut order = order();
        order.items[0].quantity = 10_000;

        let taxes = compute(&orchestrator, order, true).await.unwrap();
        assert_eq!(taxes, FulfillmentGroupTaxes::from(calculated("active")));
        assert_eq!(active.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalid_result_is_calculation_error() {
        let mut bad = calculated("active");
        bad.item_taxes[1].tax = Money::from_cents(-165);
        let fallback = MockService::new(Behavior::Calculate(calculated("fallback")));
        let orchestrator = orchestrator(
            with_fallback(),
            MockService::new(Behavior::Calculate(bad)),
            fallback.clone(),
        );

        let err = compute(&orchestrator, order(), true).await.unwrap_err();
        assert!(err.is_calculation_error());
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_fallback_result_is_calculation_error() {
        let mut bad = calculated("fallback");
        bad.tax_summary.taxes[0].tax_name.clear();
        let orchestrator = orchestrator(
            with_fallback(),
            MockService::new(Behavior::Fail),
            MockService::new(Behavior::Calculate(bad)),
        );

        let err = compute(&orchestrator, order(), true).await.unwrap_err();
        assert!(err.is_calculation_error());
    }

    // -------------------------------------------------------------------------
    // Configuration errors
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_unknown_active_service_is_config_error() {
        let orchestrator = orchestrator(
            Some(ShopTaxConfiguration::active("avalara")),
            MockService::new(Behavior::Decline),
            MockService::new(Behavior::Decline),
        );

        let err = compute(&orchestrator, order(), true).await.unwrap_err();
        assert!(err.is_config_error());
        assert!(!err.is_calculation_error());
        assert!(err.to_string().contains("avalara"));
    }

    #[tokio::test]
    async fn test_unknown_fallback_service_is_config_error() {
        let active = MockService::new(Behavior::Calculate(calculated("active")));
        let orchestrator = orchestrator(
            Some(ShopTaxConfiguration::active("primary").with_fallback("avalara")),
            active.clone(),
            MockService::new(Behavior::Decline),
        );

        let err = compute(&orchestrator, order(), true).await.unwrap_err();
        assert!(matches!(err, TaxError::UnknownFallbackService { .. }));
        assert_eq!(active.calls(), 0);
    }

    #[tokio::test]
    async fn test_padded_service_name_is_not_trimmed_for_lookup() {
        let active = MockService::new(Behavior::Calculate(calculated("active")));
        let orchestrator = orchestrator(
            Some(ShopTaxConfiguration::active("  primary ")),
            active.clone(),
            MockService::new(Behavior::Decline),
        );

        let err = compute(&orchestrator, order(), true).await.unwrap_err();
        assert!(matches!(
            err,
            TaxError::UnknownActiveService { ref name } if name == "  primary "
        ));
        assert_eq!(active.calls(), 0);
    }

    struct BrokenStore;

    #[async_trait]
    impl ShopTaxConfigStore for BrokenStore {
        async fn find_shop_tax_config(
            &self,
            _shop_id: &str,
        ) -> Result<Option<ShopTaxConfiguration>, crate::error::StoreError> {
            Err(crate::error::StoreError::Unavailable("database is locked".to_string()))
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_config_store_error() {
        let active = MockService::new(Behavior::Calculate(calculated("active")));
        let mut registry = TaxServiceRegistry::new();
        registry.register_tax_services(
            "taxes-test",
            vec![PluginTaxService::new("primary", "Primary Rates", active.clone())],
        );
        let orchestrator = TaxOrchestrator::new(Arc::new(registry), Arc::new(BrokenStore));

        let err = compute(&orchestrator, order(), true).await.unwrap_err();
        assert!(matches!(err, TaxError::ConfigStore { ref shop_id, .. } if shop_id == SHOP));
        assert!(err.is_config_error());
        assert!(!err.is_calculation_error());
        assert_eq!(active.calls(), 0);
    }

    // -------------------------------------------------------------------------
    // Concurrency
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_concurrent_calls_share_registry() {
        let active = MockService::new(Behavior::Calculate(calculated("active")));
        let orchestrator = orchestrator(with_fallback(), active.clone(), MockService::new(Behavior::Fail));

        let (first, second) = tokio::join!(
            compute(&orchestrator, order(), true),
            compute(&orchestrator, order(), false)
        );
        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(active.calls(), 2);
    }
}
