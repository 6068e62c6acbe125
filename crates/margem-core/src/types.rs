//! # Domain Types
//!
//! Input types shared by every engine module.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   Ingredient    │   │   RecipeLine    │   │ ProductPricing  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  name (key)     │◄──│  ingredient     │   │  product (key)  │       │
//! │  │  unit           │   │  product        │   │  listed_price   │       │
//! │  │  unit_cost      │   │  quantity       │   │  monthly_volume │       │
//! │  └─────────────────┘   └─────────────────┘   │  target_margin  │       │
//! │                                              │  avg_discount   │       │
//! │  ┌─────────────────┐   ┌─────────────────┐   └─────────────────┘       │
//! │  │      Rate       │   │ FixedCostPool   │                             │
//! │  │  ─────────────  │   │  ─────────────  │                             │
//! │  │  0.20 = 20%     │   │  category → R$  │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Delivery types live in [`crate::delivery`]; result rows live next to the
//! code that produces them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Rate
// =============================================================================

/// A percentage stored as a decimal fraction (`0.20` = 20%).
///
/// Used for tax, marketplace commission and target margin. Rates are never
/// negative; the constructors that accept untrusted input clamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct Rate(#[ts(type = "string")] Decimal);

impl Rate {
    /// Creates a rate from basis points (1 bps = 0.01%).
    ///
    /// ## Example
    /// ```rust
    /// use margem_core::types::Rate;
    /// use rust_decimal::Decimal;
    ///
    /// assert_eq!(Rate::from_bps(3600).fraction(), Decimal::new(36, 2));
    /// ```
    #[inline]
    pub fn from_bps(bps: u32) -> Self {
        Rate(Decimal::new(i64::from(bps), 4))
    }

    /// Creates a rate from a fraction, flooring negatives at zero.
    pub fn from_fraction(fraction: Decimal) -> Self {
        Rate(fraction.max(Decimal::ZERO))
    }

    /// Creates a rate from a percentage (`36` = 36%).
    pub fn from_percentage(pct: Decimal) -> Self {
        Rate::from_fraction(pct / Decimal::ONE_HUNDRED)
    }

    /// Returns the rate as a fraction.
    #[inline]
    pub const fn fraction(&self) -> Decimal {
        self.0
    }

    /// Returns the rate as a percentage (for display).
    #[inline]
    pub fn percentage(&self) -> Decimal {
        self.0 * Decimal::ONE_HUNDRED
    }

    /// Zero rate.
    #[inline]
    pub const fn zero() -> Self {
        Rate(Decimal::ZERO)
    }

    /// Checks if the rate is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks if the rate lies within 0%..=100%.
    #[inline]
    pub fn is_unit_interval(&self) -> bool {
        self.0 >= Decimal::ZERO && self.0 <= Decimal::ONE
    }

    /// Clamps the rate into 0%..=100%, reporting whether it changed.
    pub fn clamp_unit(self) -> (Rate, bool) {
        let clamped = self.0.clamp(Decimal::ZERO, Decimal::ONE);
        (Rate(clamped), clamped != self.0)
    }
}

impl Default for Rate {
    fn default() -> Self {
        Rate::zero()
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percentage().normalize())
    }
}

// =============================================================================
// Ingredient
// =============================================================================

/// A purchasable input ("insumo"), keyed by name in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Ingredient {
    /// Unique name, e.g. "Mussarela".
    pub name: String,

    /// Purchase unit, e.g. "g", "ml", "un".
    pub unit: String,

    /// Cost of one unit.
    pub unit_cost: Money,
}

impl Ingredient {
    /// Creates an ingredient, flooring a negative cost at zero.
    pub fn new(name: impl Into<String>, unit: impl Into<String>, unit_cost: Money) -> Self {
        Ingredient {
            name: name.into().trim().to_string(),
            unit: unit.into(),
            unit_cost: unit_cost.max_zero(),
        }
    }
}

// =============================================================================
// Recipe Line
// =============================================================================

/// One ingredient/quantity pair of a product's technical sheet.
///
/// The unit cost is normally resolved against the catalog when a computation
/// runs. `unit_cost_snapshot` is only filled by the quick-preview flow, which
/// freezes the cost at insertion time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RecipeLine {
    pub product: String,
    pub ingredient_name: String,
    #[ts(type = "string")]
    pub quantity: Decimal,
    #[serde(default)]
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub unit_cost_snapshot: Option<Money>,
}

impl RecipeLine {
    pub fn new(
        product: impl Into<String>,
        ingredient_name: impl Into<String>,
        quantity: Decimal,
        unit: impl Into<String>,
    ) -> Self {
        RecipeLine {
            product: product.into().trim().to_string(),
            ingredient_name: ingredient_name.into().trim().to_string(),
            quantity,
            unit: unit.into(),
            unit_cost_snapshot: None,
        }
    }
}

// =============================================================================
// Product Pricing Parameters
// =============================================================================

/// Per-product pricing inputs: one row per detected product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductPricing {
    pub product: String,
    pub listed_price: Money,
    /// Units sold per month. Clamped to at least 1 wherever it divides.
    #[serde(default)]
    pub monthly_volume: u64,
    /// Overrides the request-wide target margin when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub target_margin_pct: Option<Rate>,
    /// Average discount per order, in reais.
    #[serde(default)]
    pub average_discount: Money,
}

impl ProductPricing {
    pub fn new(product: impl Into<String>, listed_price: Money, monthly_volume: u64) -> Self {
        ProductPricing {
            product: product.into().trim().to_string(),
            listed_price,
            monthly_volume,
            target_margin_pct: None,
            average_discount: Money::zero(),
        }
    }

    pub fn with_target_margin(mut self, target: Rate) -> Self {
        self.target_margin_pct = Some(target);
        self
    }

    pub fn with_average_discount(mut self, discount: Money) -> Self {
        self.average_discount = discount;
        self
    }

    /// Volume used as an allocation denominator: never below one unit.
    #[inline]
    pub fn clamped_volume(&self) -> u64 {
        self.monthly_volume.max(1)
    }
}

// =============================================================================
// Fixed Costs
// =============================================================================

/// Monthly overhead categories ("custos fixos").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum FixedCostCategory {
    Rent,
    Power,
    Water,
    Gas,
    Payroll,
    Marketing,
    Other,
}

impl FixedCostCategory {
    pub const ALL: [FixedCostCategory; 7] = [
        FixedCostCategory::Rent,
        FixedCostCategory::Power,
        FixedCostCategory::Water,
        FixedCostCategory::Gas,
        FixedCostCategory::Payroll,
        FixedCostCategory::Marketing,
        FixedCostCategory::Other,
    ];
}

impl fmt::Display for FixedCostCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FixedCostCategory::Rent => "rent",
            FixedCostCategory::Power => "power",
            FixedCostCategory::Water => "water",
            FixedCostCategory::Gas => "gas",
            FixedCostCategory::Payroll => "payroll",
            FixedCostCategory::Marketing => "marketing",
            FixedCostCategory::Other => "other",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for FixedCostCategory {
    type Err = ValidationError;

    /// Accepts the English names and the Portuguese labels of the cost form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rent" | "aluguel" => Ok(FixedCostCategory::Rent),
            "power" | "energia" => Ok(FixedCostCategory::Power),
            "water" | "agua" | "água" => Ok(FixedCostCategory::Water),
            "gas" | "gás" => Ok(FixedCostCategory::Gas),
            "payroll" | "folha" => Ok(FixedCostCategory::Payroll),
            "marketing" => Ok(FixedCostCategory::Marketing),
            "other" | "outros" => Ok(FixedCostCategory::Other),
            _ => Err(ValidationError::NotAllowed {
                field: "fixed cost category".to_string(),
                allowed: FixedCostCategory::ALL.iter().map(|c| c.to_string()).collect(),
            }),
        }
    }
}

/// Monthly fixed costs by category. Sum = total to allocate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct FixedCostPool(BTreeMap<FixedCostCategory, Money>);

impl FixedCostPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a category's monthly amount; negatives are floored at zero.
    pub fn set(&mut self, category: FixedCostCategory, monthly_amount: Money) {
        self.0.insert(category, monthly_amount.max_zero());
    }

    pub fn with(mut self, category: FixedCostCategory, monthly_amount: Money) -> Self {
        self.set(category, monthly_amount);
        self
    }

    pub fn get(&self, category: FixedCostCategory) -> Money {
        self.0.get(&category).copied().unwrap_or_default()
    }

    /// Total monthly fixed cost. Negative entries smuggled in through
    /// deserialization count as zero.
    pub fn total(&self) -> Money {
        self.0.values().map(Money::max_zero).sum()
    }

    /// True when some entry is negative and [`FixedCostPool::total`] floors it.
    pub fn has_negative(&self) -> bool {
        self.0.values().any(Money::is_negative)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FixedCostCategory, Money)> + '_ {
        self.0.iter().map(|(c, m)| (*c, *m))
    }
}

// =============================================================================
// Engine Policies
// =============================================================================

/// What to do when a recipe line names an ingredient the catalog lacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MissingIngredientPolicy {
    /// Cost the line at zero and attach a warning to the product row.
    #[default]
    ZeroCost,
    /// Drop the product from the results and report it as rejected.
    Reject,
}

impl fmt::Display for MissingIngredientPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingIngredientPolicy::ZeroCost => write!(f, "zero_cost"),
            MissingIngredientPolicy::Reject => write!(f, "reject"),
        }
    }
}

impl std::str::FromStr for MissingIngredientPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "zero_cost" | "zero" | "tolerate" => Ok(MissingIngredientPolicy::ZeroCost),
            "reject" | "strict" => Ok(MissingIngredientPolicy::Reject),
            _ => Err(ValidationError::NotAllowed {
                field: "missing ingredient policy".to_string(),
                allowed: vec!["zero_cost".to_string(), "reject".to_string()],
            }),
        }
    }
}

// =============================================================================
// Row Warnings
// =============================================================================

/// A data-quality problem attached to a single result row.
///
/// Warnings degrade one row; they never abort a pricing run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowWarning {
    /// A recipe line references an ingredient missing from the catalog.
    MissingIngredient { ingredient: String },
    /// The product has no recipe lines; ingredient cost is zero.
    EmptyRecipe,
    /// A negative or out-of-range input was coerced.
    CoercedInput { field: String },
    /// The margin-target denominator was at or below epsilon.
    UnreliableSuggestedPrice,
}

impl fmt::Display for RowWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowWarning::MissingIngredient { ingredient } => {
                write!(f, "ingredient '{}' not found in catalog", ingredient)
            }
            RowWarning::EmptyRecipe => write!(f, "no recipe lines"),
            RowWarning::CoercedInput { field } => write!(f, "{} was coerced", field),
            RowWarning::UnreliableSuggestedPrice => write!(
                f,
                "tax + commission + target margin reach 100%, suggested price unreliable"
            ),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rate_from_bps() {
        let rate = Rate::from_bps(825);
        assert_eq!(rate.fraction(), dec!(0.0825));
        assert_eq!(rate.percentage(), dec!(8.25));
        assert_eq!(rate.to_string(), "8.25%");
    }

    #[test]
    fn test_rate_from_percentage_floors_negative() {
        assert_eq!(Rate::from_percentage(dec!(36)).fraction(), dec!(0.36));
        assert!(Rate::from_percentage(dec!(-5)).is_zero());
    }

    #[test]
    fn test_rate_clamp_unit() {
        let (rate, changed) = Rate::from_fraction(dec!(1.4)).clamp_unit();
        assert_eq!(rate.fraction(), Decimal::ONE);
        assert!(changed);

        let (rate, changed) = Rate::from_bps(3000).clamp_unit();
        assert_eq!(rate, Rate::from_bps(3000));
        assert!(!changed);
    }

    #[test]
    fn test_ingredient_floors_negative_cost() {
        let ingredient = Ingredient::new(" Queijo ", "g", Money::from_cents(-5));
        assert_eq!(ingredient.name, "Queijo");
        assert!(ingredient.unit_cost.is_zero());
    }

    #[test]
    fn test_clamped_volume() {
        let p = ProductPricing::new("Pizza", Money::from_reais(40), 0);
        assert_eq!(p.clamped_volume(), 1);
        let p = ProductPricing::new("Pizza", Money::from_reais(40), 120);
        assert_eq!(p.clamped_volume(), 120);
    }

    #[test]
    fn test_fixed_cost_pool_total() {
        let pool = FixedCostPool::new()
            .with(FixedCostCategory::Rent, Money::from_reais(3000))
            .with(FixedCostCategory::Power, Money::from_reais(800))
            .with(FixedCostCategory::Other, Money::from_reais(-50));
        assert_eq!(pool.total(), Money::from_reais(3800));
        assert_eq!(pool.get(FixedCostCategory::Gas), Money::zero());
    }

    #[test]
    fn test_fixed_cost_category_parsing() {
        assert_eq!(
            "aluguel".parse::<FixedCostCategory>().unwrap(),
            FixedCostCategory::Rent
        );
        assert_eq!(
            "Folha".parse::<FixedCostCategory>().unwrap(),
            FixedCostCategory::Payroll
        );
        assert!("royalties".parse::<FixedCostCategory>().is_err());
    }

    #[test]
    fn test_policy_parsing_and_default() {
        assert_eq!(
            MissingIngredientPolicy::default(),
            MissingIngredientPolicy::ZeroCost
        );
        assert_eq!(
            "strict".parse::<MissingIngredientPolicy>().unwrap(),
            MissingIngredientPolicy::Reject
        );
        assert!("maybe".parse::<MissingIngredientPolicy>().is_err());
    }

    #[test]
    fn test_row_warning_serialization() {
        let warning = RowWarning::MissingIngredient {
            ingredient: "Bacon".to_string(),
        };
        let json = serde_json::to_string(&warning).unwrap();
        assert_eq!(json, r#"{"kind":"missing_ingredient","ingredient":"Bacon"}"#);
    }
}
