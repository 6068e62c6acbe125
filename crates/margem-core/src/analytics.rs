//! # Sales KPIs
//!
//! Aggregates over already-normalized sales rows. Column guessing on the
//! marketplace's exports belongs to ingestion; these functions only see
//! [`SalesRecord`] values.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::money::Money;

/// One line of a sales export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesRecord {
    pub product: String,
    #[ts(type = "string")]
    pub quantity: Decimal,
    #[serde(default)]
    pub gross_amount: Money,
    #[serde(default)]
    pub discount_amount: Money,
}

impl SalesRecord {
    pub fn new(product: impl Into<String>, quantity: Decimal, gross_amount: Money) -> Self {
        SalesRecord {
            product: product.into(),
            quantity,
            gross_amount,
            discount_amount: Money::zero(),
        }
    }

    pub fn with_discount(mut self, discount: Money) -> Self {
        self.discount_amount = discount;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Kpi {
    pub name: String,
    #[ts(type = "string")]
    pub value: Decimal,
    pub unit: String,
}

impl Kpi {
    fn new(name: &str, value: Decimal, unit: &str) -> Self {
        Kpi {
            name: name.to_string(),
            value,
            unit: unit.to_string(),
        }
    }
}

/// Order count, average ticket and the share of sales given away as
/// incentives.
///
/// - average ticket = gross total / number of sales rows (0 with no rows)
/// - incentive share = discounts / gross, in percent (0 with no gross)
pub fn basic_kpis(order_count: usize, sales: &[SalesRecord]) -> Vec<Kpi> {
    let gross: Money = sales.iter().map(|s| s.gross_amount).sum();
    let discounts: Money = sales.iter().map(|s| s.discount_amount).sum();

    let ticket = if sales.is_empty() {
        Money::zero()
    } else {
        gross.divide(Decimal::from(sales.len()))
    };
    let incentive_pct = if gross.is_positive() {
        discounts.ratio_to(gross) * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };

    vec![
        Kpi::new("Pedidos", Decimal::from(order_count), "un"),
        Kpi::new("Ticket médio", ticket.round_cents().amount(), "R$"),
        Kpi::new("% incentivo em vendas", incentive_pct.round_dp(2), "%"),
    ]
}

/// Products by summed quantity, largest first; ties by name.
pub fn top_products(sales: &[SalesRecord], n: usize) -> Vec<(String, Decimal)> {
    let mut ranked: Vec<(String, Decimal)> = quantities(sales).into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(n);
    ranked
}

/// Summed units sold per product, ready for the `monthly_volume` column.
///
/// Fractions are dropped and a negative total counts as zero.
pub fn monthly_volumes(sales: &[SalesRecord]) -> BTreeMap<String, u64> {
    quantities(sales)
        .into_iter()
        .map(|(product, qty)| {
            let units = qty.max(Decimal::ZERO).trunc().to_u64().unwrap_or(u64::MAX);
            (product, units)
        })
        .collect()
}

fn quantities(sales: &[SalesRecord]) -> BTreeMap<String, Decimal> {
    let mut totals: BTreeMap<String, Decimal> = BTreeMap::new();
    for record in sales {
        let product = record.product.trim();
        if product.is_empty() {
            continue;
        }
        *totals.entry(product.to_string()).or_default() += record.quantity;
    }
    totals
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sales() -> Vec<SalesRecord> {
        vec![
            SalesRecord::new("Pizza", dec!(2), Money::from_reais(80))
                .with_discount(Money::from_reais(8)),
            SalesRecord::new("Suco", dec!(3), Money::from_reais(24)),
            SalesRecord::new("Pizza", dec!(1), Money::from_reais(40))
                .with_discount(Money::from_reais(4)),
            SalesRecord::new("Brownie", dec!(3), Money::from_reais(36)),
        ]
    }

    #[test]
    fn test_basic_kpis() {
        let kpis = basic_kpis(3, &sales());
        assert_eq!(kpis[0].value, dec!(3));
        // 180 / 4 rows
        assert_eq!(kpis[1].value, dec!(45));
        // 12 / 180
        assert_eq!(kpis[2].value, dec!(6.67));
        assert_eq!(kpis[2].unit, "%");
    }

    #[test]
    fn test_empty_sales_are_zeros() {
        let kpis = basic_kpis(0, &[]);
        assert!(kpis.iter().all(|k| k.value.is_zero()));
    }

    #[test]
    fn test_top_products() {
        let top = top_products(&sales(), 2);
        assert_eq!(
            top,
            vec![("Brownie".to_string(), dec!(3)), ("Pizza".to_string(), dec!(3))]
        );
    }

    #[test]
    fn test_monthly_volumes() {
        let mut records = sales();
        records.push(SalesRecord::new("Suco", dec!(0.5), Money::zero()));
        records.push(SalesRecord::new("Água", dec!(-4), Money::zero()));
        let volumes = monthly_volumes(&records);
        assert_eq!(volumes["Pizza"], 3);
        assert_eq!(volumes["Suco"], 3);
        assert_eq!(volumes["Água"], 0);
    }
}
