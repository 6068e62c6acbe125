//! # Cost Aggregator
//!
//! Rolls recipe lines up to a per-product recipe cost and gross margin,
//! before any delivery mode, tax or discount enters the picture.
//!
//! ```text
//! TechnicalSheetRow ×N ──group by product──► { listed_price: max, recipe_cost: Σ }
//!                                                    │
//!                                                    ▼
//!                                  gross margin = price − recipe cost
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use ts_rs::TS;

use crate::bom::{resolve_line_cost, BillOfMaterials, IngredientCatalog};
use crate::money::{round_ratio, Money};
use crate::types::{ProductPricing, RecipeLine};

// =============================================================================
// Input / Output Rows
// =============================================================================

/// A technical-sheet row as exported by the operator: one ingredient line
/// with the product's listed price repeated on every line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TechnicalSheetRow {
    pub product: String,
    pub ingredient_name: String,
    #[ts(type = "string")]
    pub quantity: Decimal,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub listed_price: Money,
}

impl TechnicalSheetRow {
    pub fn from_line(line: &RecipeLine, listed_price: Money) -> Self {
        TechnicalSheetRow {
            product: line.product.clone(),
            ingredient_name: line.ingredient_name.clone(),
            quantity: line.quantity,
            unit: line.unit.clone(),
            listed_price,
        }
    }

    fn as_line(&self) -> RecipeLine {
        RecipeLine::new(
            self.product.as_str(),
            self.ingredient_name.as_str(),
            self.quantity,
            self.unit.as_str(),
        )
    }
}

/// Per-product recipe cost and gross margin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GrossMarginRow {
    pub product: String,
    pub listed_price: Money,
    pub recipe_cost: Money,
    pub gross_margin_amount: Money,
    /// Fraction of listed price; 0 when the price is 0.
    #[ts(type = "string")]
    pub gross_margin_pct: Decimal,
}

// =============================================================================
// Aggregation
// =============================================================================

/// Joins the bill of materials with listed prices into technical-sheet rows.
///
/// Lines of products without a pricing row carry a zero price.
pub fn technical_sheet(
    bom: &BillOfMaterials,
    products: &[ProductPricing],
) -> Vec<TechnicalSheetRow> {
    let mut prices: BTreeMap<&str, Money> = BTreeMap::new();
    for p in products {
        let entry = prices.entry(p.product.as_str()).or_default();
        *entry = (*entry).max(p.listed_price);
    }

    bom.lines()
        .iter()
        .map(|line| {
            let price = prices
                .get(line.product.as_str())
                .copied()
                .unwrap_or_default();
            TechnicalSheetRow::from_line(line, price)
        })
        .collect()
}

/// Groups technical-sheet rows by product and computes gross margins.
///
/// ## Rules
/// - `recipe_cost` = Σ resolved line costs (missing ingredients cost 0)
/// - `listed_price` = the **maximum** price seen on the product's lines, so a
///   zero placeholder on one line never hides the real price on another
/// - `gross_margin_pct` = 0 when the price is 0
///
/// Rows come back sorted ascending by gross margin amount: worst first.
pub fn aggregate(rows: &[TechnicalSheetRow], catalog: &IngredientCatalog) -> Vec<GrossMarginRow> {
    let mut groups: BTreeMap<&str, (Money, Money)> = BTreeMap::new();

    for row in rows {
        let (price, cost) = groups.entry(row.product.as_str()).or_default();
        *price = (*price).max(row.listed_price.max_zero());
        *cost += resolve_line_cost(&row.as_line(), catalog);
    }

    let mut table: Vec<GrossMarginRow> = groups
        .into_iter()
        .map(|(product, (listed_price, recipe_cost))| {
            let gross = listed_price - recipe_cost;
            GrossMarginRow {
                product: product.to_string(),
                listed_price: listed_price.round_cents(),
                recipe_cost: recipe_cost.round_cents(),
                gross_margin_amount: gross.round_cents(),
                gross_margin_pct: round_ratio(gross.ratio_to(listed_price)),
            }
        })
        .collect();

    table.sort_by(|a, b| {
        a.gross_margin_amount
            .cmp(&b.gross_margin_amount)
            .then_with(|| a.product.cmp(&b.product))
    });

    debug!(products = table.len(), lines = rows.len(), "Aggregated recipe costs");
    table
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Ingredient;
    use rust_decimal_macros::dec;

    fn catalog() -> IngredientCatalog {
        [
            Ingredient::new("Massa", "un", Money::new(dec!(3.00))),
            Ingredient::new("Queijo", "g", Money::new(dec!(0.04))),
            Ingredient::new("Laranja", "un", Money::new(dec!(0.90))),
        ]
        .into_iter()
        .collect()
    }

    fn row(product: &str, ingredient: &str, qty: Decimal, price: Money) -> TechnicalSheetRow {
        TechnicalSheetRow {
            product: product.to_string(),
            ingredient_name: ingredient.to_string(),
            quantity: qty,
            unit: String::new(),
            listed_price: price,
        }
    }

    #[test]
    fn test_aggregate_sums_and_takes_max_price() {
        let rows = vec![
            row("Pizza", "Massa", dec!(1), Money::from_reais(45)),
            row("Pizza", "Queijo", dec!(200), Money::zero()),
        ];
        let table = aggregate(&rows, &catalog());

        assert_eq!(table.len(), 1);
        let pizza = &table[0];
        assert_eq!(pizza.listed_price, Money::from_reais(45));
        assert_eq!(pizza.recipe_cost, Money::from_reais(11));
        assert_eq!(pizza.gross_margin_amount, Money::from_reais(34));
        assert_eq!(pizza.gross_margin_pct, dec!(0.7556));
    }

    #[test]
    fn test_zero_price_gives_zero_pct() {
        let rows = vec![row("Suco", "Laranja", dec!(3), Money::zero())];
        let table = aggregate(&rows, &catalog());
        assert_eq!(table[0].gross_margin_pct, Decimal::ZERO);
        assert_eq!(table[0].gross_margin_amount, Money::new(dec!(-2.70)));
    }

    #[test]
    fn test_sorted_worst_first() {
        let rows = vec![
            row("Pizza", "Massa", dec!(1), Money::from_reais(45)),
            row("Suco", "Laranja", dec!(3), Money::from_reais(8)),
        ];
        let table = aggregate(&rows, &catalog());
        let names: Vec<_> = table.iter().map(|r| r.product.as_str()).collect();
        assert_eq!(names, vec!["Suco", "Pizza"]);
    }

    #[test]
    fn test_empty_input_is_empty_table() {
        assert!(aggregate(&[], &catalog()).is_empty());
    }

    #[test]
    fn test_technical_sheet_joins_prices() {
        let catalog = catalog();
        let mut bom = BillOfMaterials::new();
        bom.add_line("Pizza", "Massa", dec!(1), &catalog);
        bom.add_line("Calzone", "Massa", dec!(1), &catalog);

        let products = vec![ProductPricing::new("Pizza", Money::from_reais(45), 100)];
        let sheet = technical_sheet(&bom, &products);

        assert_eq!(sheet[0].listed_price, Money::from_reais(45));
        assert!(sheet[1].listed_price.is_zero());
        assert_eq!(sheet[0].unit, "un");
    }
}
