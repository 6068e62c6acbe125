//! # Quick Pricing Preview
//!
//! The single-rate table used before the full summary is available: one
//! flat commission, no packaging, no tax, no fixed costs, no discount.
//!
//! ```text
//! net_margin = price − cost − price × commission
//! ```
//!
//! Kept numerically independent from [`crate::pricing`]; the two tables are
//! not expected to agree.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use ts_rs::TS;

use crate::bom::{resolve_line_cost, BillOfMaterials, IngredientCatalog};
use crate::money::{round_ratio, Money};
use crate::types::{Rate, RecipeLine};

/// Preview figures for one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuickPrice {
    pub cost: Money,
    pub commission_amount: Money,
    pub net_margin: Money,
}

/// One row of the quick pricing table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QuickPriceRow {
    pub product: String,
    pub listed_price: Money,
    pub cost: Money,
    pub commission_amount: Money,
    pub net_margin: Money,
    /// Fraction of listed price; 0 when the price is 0.
    #[ts(type = "string")]
    pub net_margin_pct: Decimal,
}

/// Cost of a preview line: the snapshot taken when the line was added,
/// falling back to the live catalog.
fn snapshot_line_cost(line: &RecipeLine, catalog: &IngredientCatalog) -> Money {
    match line.unit_cost_snapshot {
        Some(unit_cost) => unit_cost
            .max_zero()
            .multiply_quantity(line.quantity.max(Decimal::ZERO)),
        None => resolve_line_cost(line, catalog),
    }
}

fn preview<'a>(
    lines: impl IntoIterator<Item = &'a RecipeLine>,
    catalog: &IngredientCatalog,
    listed_price: Money,
    commission: Rate,
) -> QuickPrice {
    let cost: Money = lines
        .into_iter()
        .map(|line| snapshot_line_cost(line, catalog))
        .sum();
    let commission_amount = listed_price.percent_of(commission);
    QuickPrice {
        cost,
        commission_amount,
        net_margin: listed_price - (cost + commission_amount),
    }
}

/// Previews one product. A product with no listed price is priced at zero.
///
/// ## Example
/// ```rust
/// use margem_core::bom::{BillOfMaterials, IngredientCatalog};
/// use margem_core::money::Money;
/// use margem_core::quick::quick_price;
/// use margem_core::types::{Ingredient, Rate};
/// use rust_decimal::Decimal;
/// use std::collections::BTreeMap;
///
/// let catalog: IngredientCatalog =
///     [Ingredient::new("Açaí", "g", Money::from_cents(3))].into_iter().collect();
/// let mut bom = BillOfMaterials::new();
/// bom.add_snapshot_line("Açaí 300ml", "Açaí", Decimal::from(300), &catalog);
/// let prices = BTreeMap::from([("Açaí 300ml".to_string(), Money::from_reais(20))]);
///
/// let quick = quick_price("Açaí 300ml", &bom, &catalog, &prices, Rate::from_bps(2300));
/// assert_eq!(quick.cost, Money::from_reais(9));
/// assert_eq!(quick.net_margin, Money::from_cents(640));
/// ```
pub fn quick_price(
    product: &str,
    bom: &BillOfMaterials,
    catalog: &IngredientCatalog,
    listed_prices: &BTreeMap<String, Money>,
    commission: Rate,
) -> QuickPrice {
    let listed_price = listed_prices
        .get(product)
        .copied()
        .unwrap_or_default()
        .max_zero();
    preview(bom.lines_for(product), catalog, listed_price, commission)
}

/// Builds the whole preview table: one row per product that has recipe
/// lines, sorted ascending by net margin.
pub fn quick_price_table(
    bom: &BillOfMaterials,
    catalog: &IngredientCatalog,
    listed_prices: &BTreeMap<String, Money>,
    commission: Rate,
) -> Vec<QuickPriceRow> {
    let mut rows: Vec<QuickPriceRow> = bom
        .by_product()
        .into_iter()
        .map(|(product, lines)| {
            let listed_price = listed_prices
                .get(product)
                .copied()
                .unwrap_or_default()
                .max_zero();
            let quick = preview(lines, catalog, listed_price, commission);
            QuickPriceRow {
                product: product.to_string(),
                listed_price: listed_price.round_cents(),
                cost: quick.cost.round_cents(),
                commission_amount: quick.commission_amount.round_cents(),
                net_margin: quick.net_margin.round_cents(),
                net_margin_pct: round_ratio(quick.net_margin.ratio_to(listed_price)),
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        a.net_margin
            .cmp(&b.net_margin)
            .then_with(|| a.product.cmp(&b.product))
    });

    debug!(products = rows.len(), %commission, "Built quick pricing table");
    rows
}

// =============================================================================
// Unit Tests
// =============================================================================
