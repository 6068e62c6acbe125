//! Whole-engine properties over a small hand-built menu.

use margem_core::allocation::allocate;
use margem_core::bom::{BillOfMaterials, IngredientCatalog};
use margem_core::delivery::{net_revenue, DeliveryConfig, DeliveryMode};
use margem_core::money::Money;
use margem_core::pricing::{summarize, PricingRequest, PricingSummary};
use margem_core::quick::quick_price_table;
use margem_core::types::{
    FixedCostCategory, FixedCostPool, Ingredient, ProductPricing, Rate, RecipeLine,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

fn catalog() -> IngredientCatalog {
    [
        Ingredient::new("Blend 160g", "un", Money::new(dec!(6.40))),
        Ingredient::new("Pão brioche", "un", Money::new(dec!(1.35))),
        Ingredient::new("Queijo", "g", Money::new(dec!(0.045))),
        Ingredient::new("Batata", "g", Money::new(dec!(0.018))),
        Ingredient::new("Refrigerante lata", "un", Money::new(dec!(2.60))),
    ]
    .into_iter()
    .collect()
}

fn bom() -> BillOfMaterials {
    BillOfMaterials::from_lines(vec![
        RecipeLine::new("X-Burger", "Blend 160g", dec!(1), "un"),
        RecipeLine::new("X-Burger", "Pão brioche", dec!(1), "un"),
        RecipeLine::new("X-Burger", "Queijo", dec!(40), "g"),
        RecipeLine::new("Fritas", "Batata", dec!(250), "g"),
        RecipeLine::new("Refri", "Refrigerante lata", dec!(1), "un"),
    ])
}

fn products() -> Vec<ProductPricing> {
    vec![
        ProductPricing::new("X-Burger", Money::new(dec!(32.90)), 420)
            .with_average_discount(Money::from_reais(5)),
        ProductPricing::new("Fritas", Money::new(dec!(14.90)), 260)
            .with_average_discount(Money::from_reais(2)),
        ProductPricing::new("Refri", Money::new(dec!(7.00)), 0),
    ]
}

fn pool() -> FixedCostPool {
    FixedCostPool::new()
        .with(FixedCostCategory::Rent, Money::from_reais(2500))
        .with(FixedCostCategory::Power, Money::from_reais(640))
        .with(FixedCostCategory::Payroll, Money::from_reais(4200))
}

fn request(delivery: DeliveryConfig) -> PricingRequest {
    PricingRequest::new(catalog(), bom(), products())
        .with_fixed_costs(pool())
        .with_tax_rate(Rate::from_bps(600))
        .with_packaging_unit_cost(Money::new(dec!(0.80)))
        .with_delivery(delivery)
        .with_default_target_margin(Rate::from_bps(2000))
}

fn both_modes() -> Vec<PricingSummary> {
    vec![
        summarize(&request(DeliveryConfig::marketplace())).unwrap(),
        summarize(&request(DeliveryConfig::self_delivery(Money::new(dec!(6.50))))).unwrap(),
    ]
}

#[test]
fn test_total_unit_cost_covers_variable_cost() {
    for summary in both_modes() {
        for row in &summary.rows {
            assert!(row.total_unit_cost >= row.variable_cost, "{}", row.product);
        }
    }
}

#[test]
fn test_discount_never_improves_margin() {
    for summary in both_modes() {
        for row in &summary.rows {
            assert!(
                row.net_margin_amount_with_discount <= row.net_margin_amount_no_discount,
                "{}",
                row.product
            );
        }
    }
}

#[test]
fn test_allocation_conserves_pool() {
    let volumes: BTreeMap<String, u64> = products()
        .into_iter()
        .map(|p| (p.product, p.monthly_volume))
        .collect();
    let per_unit = allocate(&pool(), &volumes);

    let reconstructed: Money = volumes
        .iter()
        .map(|(product, volume)| {
            per_unit[product].multiply_quantity(Decimal::from((*volume).max(1)))
        })
        .sum();
    assert!((reconstructed - pool().total()).abs().amount() < dec!(0.000001));
}

#[test]
fn test_suggested_price_round_trips_to_target() {
    for delivery in [
        DeliveryConfig::marketplace(),
        DeliveryConfig::self_delivery(Money::new(dec!(6.50))),
    ] {
        let first = summarize(&request(delivery)).unwrap();

        let repriced: Vec<ProductPricing> = products()
            .into_iter()
            .map(|p| {
                let suggested = first.row(&p.product).unwrap().suggested_price;
                ProductPricing { listed_price: suggested, ..p }
            })
            .collect();
        let mut second_request = request(delivery);
        second_request.products = repriced;
        let second = summarize(&second_request).unwrap();

        for row in &second.rows {
            let gap = (row.net_margin_pct_no_discount - dec!(0.20)).abs();
            assert!(gap < dec!(0.001), "{} in {} off by {}", row.product, delivery.mode, gap);
        }
    }
}

#[test]
fn test_self_delivery_reference_price() {
    let catalog: IngredientCatalog =
        [Ingredient::new("Kit", "un", Money::from_reais(5))].into_iter().collect();
    let bom = BillOfMaterials::from_lines(vec![RecipeLine::new("Prato", "Kit", dec!(1), "un")]);
    let base = PricingRequest::new(
        catalog,
        bom,
        vec![ProductPricing::new("Prato", Money::from_reais(20), 100)],
    )
    .with_fixed_costs(
        FixedCostPool::new().with(FixedCostCategory::Other, Money::from_reais(100)),
    )
    .with_default_target_margin(Rate::from_bps(3000));

    let own_delivery = DeliveryConfig::self_delivery(Money::from_reais(8));
    let own = summarize(&base.clone().with_delivery(own_delivery)).unwrap();
    assert_eq!(own.rows[0].suggested_price, Money::new(dec!(20.00)));

    let marketplace = summarize(&base.with_delivery(DeliveryConfig::marketplace())).unwrap();
    assert_eq!(marketplace.rows[0].suggested_price, Money::new(dec!(17.65)));
}

#[test]
fn test_net_revenue_reference_value() {
    let net = net_revenue(
        Money::from_reais(20),
        Money::from_reais(3),
        DeliveryMode::MarketplaceLogistics,
        Rate::from_bps(2000),
        Money::zero(),
    );
    assert_eq!(net, Money::new(dec!(13.60)));
}

#[test]
fn test_zero_volume_product_is_priced() {
    let summary = summarize(&request(DeliveryConfig::marketplace())).unwrap();
    let refri = summary.row("Refri").unwrap();
    assert!(refri.fixed_cost_per_unit.is_positive());
    assert_eq!(summary.rows.len(), 3);
}

#[test]
fn test_summarize_is_idempotent() {
    let request = request(DeliveryConfig::marketplace());
    assert_eq!(summarize(&request).unwrap(), summarize(&request).unwrap());
}

#[test]
fn test_summary_sorted_by_discounted_margin() {
    for summary in both_modes() {
        let margins: Vec<Money> = summary
            .rows
            .iter()
            .map(|r| r.net_margin_amount_with_discount)
            .collect();
        let mut sorted = margins.clone();
        sorted.sort();
        assert_eq!(margins, sorted);
    }
}

#[test]
fn test_quick_table_ignores_packaging_tax_and_fixed_costs() {
    let prices: BTreeMap<String, Money> = products()
        .into_iter()
        .map(|p| (p.product, p.listed_price))
        .collect();
    let commission = Rate::from_bps(2300);
    let table = quick_price_table(&bom(), &catalog(), &prices, commission);

    for row in &table {
        let expected = row.listed_price - row.cost - row.listed_price.percent_of(commission);
        assert_eq!(row.net_margin, expected.round_cents(), "{}", row.product);
    }
}

#[test]
fn test_request_round_trips_through_json() {
    let request = request(DeliveryConfig::marketplace());
    let json = serde_json::to_string(&request).unwrap();
    let back: PricingRequest = serde_json::from_str(&json).unwrap();
    assert_eq!(summarize(&back).unwrap(), summarize(&request).unwrap());
}
