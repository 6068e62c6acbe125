//! # Pricing Summarizer
//!
//! Orchestrates the resolver, allocator and delivery model into one
//! reconciliation row per product, plus a suggested price that hits the
//! target margin.
//!
//! ## Per-Product Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ingredient_cost   = Σ recipe lines                     (bom)          │
//! │  variable_cost     = ingredient_cost + packaging                       │
//! │  fixed_cost/unit   = allocated pool share / volume      (allocation)   │
//! │  tax_amount        = listed_price × tax                                │
//! │  logistics_cost    = price × commission | self-delivery cost           │
//! │  total_unit_cost   = variable + fixed + tax + logistics                │
//! │                                                                         │
//! │  net margin        = net_revenue(price, discount)       (delivery)     │
//! │                      − (variable + fixed + tax)                        │
//! │                                                                         │
//! │  suggested price   = costs / (1 − tax − commission − target)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Logistics is a display column only. Net revenue already takes the
//! commission (marketplace) or the courier cost (self-delivery) out, so it
//! is not subtracted a second time.
//!
//! ## Error Posture
//! A bad row degrades that row (warning, zero cost, or rejection under the
//! strict policy) and the run continues. Only request-wide scalars outside
//! their domain fail the whole call.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};
use ts_rs::TS;

use crate::allocation::allocate;
use crate::bom::{cost_recipe, BillOfMaterials, IngredientCatalog};
use crate::delivery::{DeliveryConfig, DeliveryMode};
use crate::error::CoreResult;
use crate::money::{round_ratio, Money};
use crate::types::{FixedCostPool, MissingIngredientPolicy, ProductPricing, Rate, RowWarning};
use crate::validation::{
    coerce_money, coerce_target_margin, validate_non_negative, validate_product_name,
    validate_rate,
};

/// Smallest denominator magnitude the margin-target inversion divides by.
pub const DENOMINATOR_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 6);

// =============================================================================
// Request
// =============================================================================

/// Everything one pricing run needs, assembled once by the caller.
///
/// The engine keeps nothing between calls: two identical requests produce
/// identical summaries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricingRequest {
    pub catalog: IngredientCatalog,
    pub bom: BillOfMaterials,
    pub products: Vec<ProductPricing>,
    #[serde(default)]
    pub fixed_costs: FixedCostPool,
    #[serde(default)]
    pub tax_rate: Rate,
    #[serde(default)]
    pub packaging_unit_cost: Money,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    /// Used for products whose pricing row has no target of its own.
    #[serde(default)]
    pub default_target_margin: Rate,
    #[serde(default)]
    pub missing_ingredient_policy: MissingIngredientPolicy,
}

impl PricingRequest {
    pub fn new(
        catalog: IngredientCatalog,
        bom: BillOfMaterials,
        products: Vec<ProductPricing>,
    ) -> Self {
        PricingRequest {
            catalog,
            bom,
            products,
            ..Default::default()
        }
    }

    pub fn with_fixed_costs(mut self, pool: FixedCostPool) -> Self {
        self.fixed_costs = pool;
        self
    }

    pub fn with_tax_rate(mut self, rate: Rate) -> Self {
        self.tax_rate = rate;
        self
    }

    pub fn with_packaging_unit_cost(mut self, cost: Money) -> Self {
        self.packaging_unit_cost = cost;
        self
    }

    pub fn with_delivery(mut self, delivery: DeliveryConfig) -> Self {
        self.delivery = delivery;
        self
    }

    pub fn with_default_target_margin(mut self, rate: Rate) -> Self {
        self.default_target_margin = rate;
        self
    }

    pub fn with_missing_ingredient_policy(mut self, policy: MissingIngredientPolicy) -> Self {
        self.missing_ingredient_policy = policy;
        self
    }

    /// Checks the request-wide scalars. Row-level data is never rejected here.
    pub fn validate(&self) -> CoreResult<()> {
        validate_rate("tax_rate", self.tax_rate)?;
        validate_rate("commission", self.delivery.commission)?;
        validate_rate("default_target_margin", self.default_target_margin)?;
        validate_non_negative("packaging_unit_cost", self.packaging_unit_cost)?;
        validate_non_negative("self_delivery_unit_cost", self.delivery.self_delivery_unit_cost)?;
        Ok(())
    }
}

// =============================================================================
// Result Types
// =============================================================================

/// One product's full reconciliation. Derived, never mutated.
///
/// Money columns are rounded to centavos and percentages to 4 places; every
/// figure was computed from unrounded inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricingResultRow {
    pub product: String,
    pub listed_price: Money,
    pub suggested_price: Money,
    /// `suggested_price − listed_price`: positive means raise the price.
    pub adjustment: Money,
    pub ingredient_cost: Money,
    pub variable_cost: Money,
    pub fixed_cost_per_unit: Money,
    pub tax_amount: Money,
    pub logistics_cost: Money,
    pub total_unit_cost: Money,
    pub net_margin_amount_no_discount: Money,
    #[ts(type = "string")]
    pub net_margin_pct_no_discount: Decimal,
    pub net_margin_amount_with_discount: Money,
    #[ts(type = "string")]
    pub net_margin_pct_with_discount: Decimal,
    /// The target the suggested price was solved for.
    pub target_margin_pct: Rate,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<RowWarning>,
}

impl PricingResultRow {
    pub fn is_suggested_price_reliable(&self) -> bool {
        !self.warnings.contains(&RowWarning::UnreliableSuggestedPrice)
    }
}

/// Why a product produced no row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    /// Strict policy: the recipe references unknown ingredients.
    MissingIngredients { ingredients: Vec<String> },
    /// The pricing row has no usable product name.
    InvalidProduct { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RejectedProduct {
    pub product: String,
    pub reason: RejectReason,
}

/// Output of one pricing run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricingSummary {
    /// Sorted ascending by with-discount net margin: worst products first.
    pub rows: Vec<PricingResultRow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<RejectedProduct>,
}

impl PricingSummary {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, product: &str) -> Option<&PricingResultRow> {
        self.rows.iter().find(|r| r.product == product)
    }
}

// =============================================================================
// Margin Equation
// =============================================================================

/// The unit costs a price has to cover before tax and delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitCosts {
    /// Ingredients plus packaging.
    pub variable: Money,
    /// Allocated fixed cost per unit.
    pub fixed: Money,
}

/// A margin-target price and whether its denominator was usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestedPrice {
    pub price: Money,
    pub reliable: bool,
}

impl UnitCosts {
    pub fn new(variable: Money, fixed: Money) -> Self {
        UnitCosts { variable, fixed }
    }

    /// Net margin of one order given what the seller receives for it.
    ///
    /// `net_revenue − (variable + fixed + tax_amount)`, where the tax is
    /// charged on the listed price.
    pub fn net_margin(&self, net_revenue: Money, tax_amount: Money) -> Money {
        net_revenue - (self.variable + self.fixed + tax_amount)
    }

    /// Solves the margin equation for the price that yields `target`.
    ///
    /// ## Inversion
    /// ```text
    /// marketplace:    P = (V + F)     / (1 − tax − commission − target)
    /// self-delivery:  P = (V + F + S) / (1 − tax − target)
    /// ```
    /// A denominator at or below [`DENOMINATOR_EPSILON`] means tax,
    /// commission and target together eat the whole price: the result is
    /// flagged unreliable, and a near-zero denominator is clamped to epsilon
    /// keeping its sign.
    pub fn suggested_price(
        &self,
        tax_rate: Rate,
        delivery: &DeliveryConfig,
        target: Rate,
    ) -> SuggestedPrice {
        let (numerator, denominator) = match delivery.mode {
            DeliveryMode::MarketplaceLogistics => (
                self.variable + self.fixed,
                Decimal::ONE
                    - tax_rate.fraction()
                    - delivery.commission.fraction()
                    - target.fraction(),
            ),
            DeliveryMode::SelfDelivery => (
                self.variable + self.fixed + delivery.self_delivery_unit_cost,
                Decimal::ONE - tax_rate.fraction() - target.fraction(),
            ),
        };

        let reliable = denominator > DENOMINATOR_EPSILON;
        SuggestedPrice {
            price: numerator.divide(clamp_denominator(denominator)),
            reliable,
        }
    }
}

/// Moves a denominator of magnitude below epsilon out to epsilon, keeping
/// its sign. Zero goes to `+epsilon`.
pub fn clamp_denominator(denominator: Decimal) -> Decimal {
    if denominator.abs() >= DENOMINATOR_EPSILON {
        denominator
    } else if denominator < Decimal::ZERO {
        -DENOMINATOR_EPSILON
    } else {
        DENOMINATOR_EPSILON
    }
}

// =============================================================================
// Summarizer
// =============================================================================

/// Prices every product of the request.
///
/// ## Row Rules
/// - Products are the request's pricing rows; the first row of a duplicated
///   name wins
/// - A product without recipe lines costs zero in ingredients and carries
///   `EmptyRecipe`
/// - Under `MissingIngredientPolicy::Reject` a product with an unknown
///   ingredient is moved to `rejected`; the rest still get priced
///
/// ## Example
/// ```rust
/// use margem_core::bom::{BillOfMaterials, IngredientCatalog};
/// use margem_core::delivery::DeliveryConfig;
/// use margem_core::money::Money;
/// use margem_core::pricing::{summarize, PricingRequest};
/// use margem_core::types::{Ingredient, ProductPricing, Rate};
/// use rust_decimal::Decimal;
///
/// let catalog: IngredientCatalog =
///     [Ingredient::new("Blend", "un", Money::from_reais(5))].into_iter().collect();
/// let mut bom = BillOfMaterials::new();
/// bom.add_line("Burger", "Blend", Decimal::ONE, &catalog);
///
/// let request = PricingRequest::new(
///     catalog,
///     bom,
///     vec![ProductPricing::new("Burger", Money::from_reais(20), 100)],
/// )
/// .with_delivery(DeliveryConfig::self_delivery(Money::from_reais(8)))
/// .with_default_target_margin(Rate::from_bps(3000));
///
/// let summary = summarize(&request).unwrap();
/// assert_eq!(summary.rows[0].suggested_price, Money::new(Decimal::new(1857, 2)));
/// ```
pub fn summarize(request: &PricingRequest) -> CoreResult<PricingSummary> {
    request.validate()?;

    let mut summary = PricingSummary::default();
    let products = accepted_products(&request.products, &mut summary.rejected);

    let volumes: BTreeMap<String, u64> = products
        .iter()
        .map(|p| (p.product.trim().to_string(), p.monthly_volume))
        .collect();
    let fixed_per_unit = allocate(&request.fixed_costs, &volumes);
    let pool_coerced = request.fixed_costs.has_negative();
    if pool_coerced {
        warn!("Negative fixed cost entries counted as zero");
    }
    let recipes = request.bom.by_product();

    for product in products {
        let lines = recipes
            .get(product.product.trim())
            .map(Vec::as_slice)
            .unwrap_or_default();
        let mut recipe = cost_recipe(lines.iter().copied(), &request.catalog);

        if recipe.is_rejected(request.missing_ingredient_policy) {
            warn!(
                product = %product.product,
                missing = ?recipe.missing,
                "Rejecting product with unknown ingredients"
            );
            summary.rejected.push(RejectedProduct {
                product: product.product.clone(),
                reason: RejectReason::MissingIngredients {
                    ingredients: recipe.missing,
                },
            });
            continue;
        }

        let fixed = fixed_per_unit
            .get(product.product.trim())
            .copied()
            .unwrap_or_default();
        if pool_coerced {
            recipe.warnings.push(RowWarning::CoercedInput {
                field: "fixed_costs".to_string(),
            });
        }
        summary
            .rows
            .push(price_product(request, product, recipe.cost, fixed, recipe.warnings));
    }

    summary.rows.sort_by(|a, b| {
        a.net_margin_amount_with_discount
            .cmp(&b.net_margin_amount_with_discount)
            .then_with(|| a.product.cmp(&b.product))
    });

    info!(
        priced = summary.rows.len(),
        rejected = summary.rejected.len(),
        mode = %request.delivery.mode,
        "Pricing run complete"
    );
    Ok(summary)
}

/// Drops unnamed and duplicated pricing rows, recording the unnamed ones.
fn accepted_products<'a>(
    products: &'a [ProductPricing],
    rejected: &mut Vec<RejectedProduct>,
) -> Vec<&'a ProductPricing> {
    let mut seen = BTreeSet::new();
    let mut accepted = Vec::with_capacity(products.len());

    for product in products {
        let name = match validate_product_name(&product.product) {
            Ok(name) => name,
            Err(e) => {
                rejected.push(RejectedProduct {
                    product: product.product.clone(),
                    reason: RejectReason::InvalidProduct {
                        message: e.to_string(),
                    },
                });
                continue;
            }
        };
        if !seen.insert(name) {
            warn!(product = %product.product, "Duplicate pricing row ignored");
            continue;
        }
        accepted.push(product);
    }

    accepted
}

fn price_product(
    request: &PricingRequest,
    product: &ProductPricing,
    ingredient_cost: Money,
    fixed_cost_per_unit: Money,
    mut warnings: Vec<RowWarning>,
) -> PricingResultRow {
    let delivery = &request.delivery;
    let tax_rate = request.tax_rate;

    let listed_price = coerce_money("listed_price", product.listed_price, &mut warnings);
    let discount = coerce_money("average_discount", product.average_discount, &mut warnings);
    let target = coerce_target_margin(
        product
            .target_margin_pct
            .unwrap_or(request.default_target_margin),
        &mut warnings,
    );

    let variable_cost = ingredient_cost + request.packaging_unit_cost;
    let costs = UnitCosts::new(variable_cost, fixed_cost_per_unit);

    let tax_amount = listed_price.percent_of(tax_rate);
    let logistics_cost = delivery.logistics_cost(listed_price);
    let total_unit_cost = variable_cost + fixed_cost_per_unit + tax_amount + logistics_cost;

    let revenue = delivery.revenue_split(listed_price, discount);
    let margin_no_discount = costs.net_margin(revenue.no_discount, tax_amount);
    let margin_with_discount = costs.net_margin(revenue.with_discount, tax_amount);

    let suggested = costs.suggested_price(tax_rate, delivery, target);
    if !suggested.reliable {
        debug!(product = %product.product, "Margin-target denominator clamped");
        warnings.push(RowWarning::UnreliableSuggestedPrice);
    }

    PricingResultRow {
        product: product.product.trim().to_string(),
        listed_price: listed_price.round_cents(),
        suggested_price: suggested.price.round_cents(),
        adjustment: (suggested.price - listed_price).round_cents(),
        ingredient_cost: ingredient_cost.round_cents(),
        variable_cost: variable_cost.round_cents(),
        fixed_cost_per_unit: fixed_cost_per_unit.round_cents(),
        tax_amount: tax_amount.round_cents(),
        logistics_cost: logistics_cost.round_cents(),
        total_unit_cost: total_unit_cost.round_cents(),
        net_margin_amount_no_discount: margin_no_discount.round_cents(),
        net_margin_pct_no_discount: round_ratio(margin_no_discount.ratio_to(listed_price)),
        net_margin_amount_with_discount: margin_with_discount.round_cents(),
        net_margin_pct_with_discount: round_ratio(margin_with_discount.ratio_to(listed_price)),
        target_margin_pct: target,
        warnings,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
