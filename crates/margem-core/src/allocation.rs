//! # Fixed-Cost Allocator
//!
//! Spreads the monthly fixed-cost pool across products in proportion to
//! how many units each sells, then expresses each product's share per unit.
//!
//! ## Allocation Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  v(p)      = max(volume(p), 1)                                         │
//! │  V         = max(Σ v(p), 1)                                            │
//! │  share(p)  = pool × v(p) / V          (monthly reais for product p)    │
//! │  unit(p)   = share(p) / v(p)          (reais per unit sold)            │
//! │                                                                         │
//! │  Pool R$ 3000, Pizza 200 un, Suco 100 un, Sobremesa 0 un (→ 1)        │
//! │    V = 301                                                             │
//! │    Pizza     share = 1993.36  unit = 9.97                              │
//! │    Suco      share =  996.68  unit = 9.97                              │
//! │    Sobremesa share =    9.97  unit = 9.97                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Because both the weights and the divisor use the clamped volume,
//! Σ unit(p) × v(p) equals the pool. A product with no declared sales is
//! treated as selling one unit; it is never a division by zero.

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;

use crate::money::Money;
use crate::types::FixedCostPool;

/// Returns the per-unit fixed cost of every product in `volumes`.
///
/// ## Example
/// ```rust
/// use margem_core::allocation::allocate;
/// use margem_core::money::Money;
/// use margem_core::types::{FixedCostCategory, FixedCostPool};
/// use std::collections::BTreeMap;
///
/// let pool = FixedCostPool::new().with(FixedCostCategory::Rent, Money::from_reais(3000));
/// let volumes = BTreeMap::from([("Pizza".to_string(), 200), ("Suco".to_string(), 100)]);
///
/// let per_unit = allocate(&pool, &volumes);
/// assert_eq!(per_unit["Pizza"], Money::from_reais(10));
/// assert_eq!(per_unit["Suco"], Money::from_reais(10));
/// ```
pub fn allocate(
    pool: &FixedCostPool,
    volumes: &BTreeMap<String, u64>,
) -> BTreeMap<String, Money> {
    // Summed in Decimal: u64 volumes near the top of their range overflow a u64 total.
    let total_volume: Decimal = volumes
        .values()
        .map(|v| Decimal::from((*v).max(1)))
        .sum::<Decimal>()
        .max(Decimal::ONE);

    let allocation: BTreeMap<String, Money> = volumes
        .iter()
        .map(|(product, volume)| {
            let share = monthly_share(pool, *volume, total_volume);
            (product.clone(), share.divide(Decimal::from((*volume).max(1))))
        })
        .collect();

    debug!(
        products = allocation.len(),
        %total_volume,
        pool = %pool.total(),
        "Allocated fixed costs"
    );
    allocation
}

/// Monthly share of the pool for one product (before the per-unit division).
///
/// `total_clamped_volume` is Σ max(volume, 1) over every product.
pub fn monthly_share(pool: &FixedCostPool, volume: u64, total_clamped_volume: Decimal) -> Money {
    let volume = Decimal::from(volume.max(1));
    let total = total_clamped_volume.max(Decimal::ONE);
    let pool_total = pool.total().amount();
    match pool_total.checked_mul(volume) {
        Some(weighted) => Money::new(weighted / total),
        None => Money::new(pool_total * (volume / total)),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FixedCostCategory;
    use rust_decimal_macros::dec;

    fn pool(reais: i64) -> FixedCostPool {
        FixedCostPool::new()
            .with(FixedCostCategory::Rent, Money::from_reais(reais / 2))
            .with(FixedCostCategory::Payroll, Money::from_reais(reais - reais / 2))
    }

    fn volumes(entries: &[(&str, u64)]) -> BTreeMap<String, u64> {
        entries.iter().map(|(p, v)| (p.to_string(), *v)).collect()
    }

    #[test]
    fn test_allocation_is_conservative() {
        let pool = pool(3000);
        let vols = volumes(&[("Pizza", 200), ("Suco", 100), ("Sobremesa", 0)]);
        let per_unit = allocate(&pool, &vols);

        let reconstructed: Money = vols
            .iter()
            .map(|(p, v)| per_unit[p].multiply_quantity(Decimal::from((*v).max(1))))
            .sum();

        let diff = (reconstructed - pool.total()).abs();
        assert!(diff.amount() < dec!(0.000001), "diff was {}", diff);
    }

    #[test]
    fn test_zero_volume_product_does_not_divide_by_zero() {
        let pool = pool(3000);
        let vols = volumes(&[("Pizza", 299), ("Sobremesa", 0)]);
        let per_unit = allocate(&pool, &vols);

        // 3000 × 1/300 / 1
        assert_eq!(per_unit["Sobremesa"].round_cents(), Money::from_reais(10));
        assert_eq!(per_unit["Pizza"].round_cents(), Money::from_reais(10));
    }

    #[test]
    fn test_all_zero_volumes() {
        let per_unit = allocate(&pool(900), &volumes(&[("A", 0), ("B", 0), ("C", 0)]));
        for cost in per_unit.values() {
            assert_eq!(cost.round_cents(), Money::from_reais(300));
        }
    }

    #[test]
    fn test_empty_pool_allocates_zero() {
        let per_unit = allocate(&FixedCostPool::new(), &volumes(&[("A", 10)]));
        assert!(per_unit["A"].is_zero());
    }

    #[test]
    fn test_no_products() {
        assert!(allocate(&pool(1000), &BTreeMap::new()).is_empty());
    }

    #[test]
    fn test_monthly_share() {
        let share = monthly_share(&pool(3000), 200, dec!(300));
        assert_eq!(share, Money::from_reais(2000));
    }

    #[test]
    fn test_volumes_at_u64_limit_do_not_overflow() {
        let pool = pool(1000);
        let vols = volumes(&[("A", u64::MAX), ("B", u64::MAX)]);
        let per_unit = allocate(&pool, &vols);

        let total = Decimal::from(u64::MAX) * dec!(2);
        assert_eq!(monthly_share(&pool, u64::MAX, total), Money::from_reais(500));
        for product in ["A", "B"] {
            let share = per_unit[product].multiply_quantity(Decimal::from(u64::MAX));
            let diff = (share - Money::from_reais(500)).abs();
            assert!(diff.amount() < dec!(0.000001), "diff was {}", diff);
        }
    }
}
