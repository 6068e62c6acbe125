//! # Bill-of-Materials Resolver
//!
//! Turns recipe lines into money by joining them against the ingredient
//! catalog at computation time.
//!
//! ```text
//! RecipeLine { product: "X-Burger", ingredient: "Pão", qty: 1 }
//!      │
//!      ▼  catalog["Pão"].unit_cost = R$ 1.20
//! line cost = 1 × 1.20 = R$ 1.20
//!      │
//!      ▼  Σ over the product's lines
//! ingredient_cost("X-Burger")
//! ```
//!
//! Costs are never stored on the line (except the quick-preview snapshot),
//! so editing an ingredient's price is picked up by the next run.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Ingredient, MissingIngredientPolicy, RecipeLine, RowWarning};
use crate::validation::{coerce_money, coerce_quantity};

// =============================================================================
// Ingredient Catalog
// =============================================================================

/// Ingredients keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct IngredientCatalog(BTreeMap<String, Ingredient>);

impl IngredientCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an ingredient or replaces the one with the same name.
    ///
    /// Returns the replaced entry, if any. There is no delete: the operator
    /// form only ever adds or edits.
    pub fn upsert(&mut self, ingredient: Ingredient) -> Option<Ingredient> {
        self.0.insert(ingredient.name.clone(), ingredient)
    }

    pub fn get(&self, name: &str) -> Option<&Ingredient> {
        self.0.get(name.trim())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name.trim())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ingredient> {
        self.0.values()
    }
}

impl FromIterator<Ingredient> for IngredientCatalog {
    fn from_iter<I: IntoIterator<Item = Ingredient>>(iter: I) -> Self {
        let mut catalog = IngredientCatalog::new();
        for ingredient in iter {
            catalog.upsert(ingredient);
        }
        catalog
    }
}

// =============================================================================
// Bill of Materials
// =============================================================================

/// Every recipe line of every product, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct BillOfMaterials(Vec<RecipeLine>);

impl BillOfMaterials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lines(lines: Vec<RecipeLine>) -> Self {
        BillOfMaterials(lines)
    }

    /// Appends a line for `product`, taking the unit from the catalog.
    ///
    /// Mirrors the technical-sheet form: the operator picks an ingredient and
    /// a quantity; the unit comes from the ingredient's registration.
    pub fn add_line(
        &mut self,
        product: &str,
        ingredient_name: &str,
        quantity: Decimal,
        catalog: &IngredientCatalog,
    ) -> &RecipeLine {
        let unit = catalog
            .get(ingredient_name)
            .map(|i| i.unit.clone())
            .unwrap_or_default();
        self.0
            .push(RecipeLine::new(product, ingredient_name, quantity, unit));
        &self.0[self.0.len() - 1]
    }

    /// Appends a line and freezes the ingredient's current unit cost on it.
    ///
    /// Used by the quick-preview flow, which prices against the cost seen
    /// when the line was added rather than the live catalog.
    pub fn add_snapshot_line(
        &mut self,
        product: &str,
        ingredient_name: &str,
        quantity: Decimal,
        catalog: &IngredientCatalog,
    ) -> &RecipeLine {
        let snapshot = catalog.get(ingredient_name).map(|i| i.unit_cost);
        self.add_line(product, ingredient_name, quantity, catalog);
        let idx = self.0.len() - 1;
        self.0[idx].unit_cost_snapshot = snapshot;
        &self.0[idx]
    }

    pub fn lines(&self) -> &[RecipeLine] {
        &self.0
    }

    /// Lines belonging to one product.
    pub fn lines_for<'a>(&'a self, product: &'a str) -> impl Iterator<Item = &'a RecipeLine> + 'a {
        self.0.iter().filter(move |l| l.product == product)
    }

    /// Lines grouped by product, products in name order.
    pub fn by_product(&self) -> BTreeMap<&str, Vec<&RecipeLine>> {
        let mut groups: BTreeMap<&str, Vec<&RecipeLine>> = BTreeMap::new();
        for line in &self.0 {
            groups.entry(line.product.as_str()).or_default().push(line);
        }
        groups
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// =============================================================================
// Line Resolution
// =============================================================================

/// Cost of one recipe line: `quantity × catalog[ingredient].unit_cost`.
///
/// Permissive: an ingredient missing from the catalog costs zero, and a
/// negative quantity counts as zero.
///
/// ## Example
/// ```rust
/// use margem_core::bom::{resolve_line_cost, IngredientCatalog};
/// use margem_core::money::Money;
/// use margem_core::types::{Ingredient, RecipeLine};
/// use rust_decimal::Decimal;
///
/// let catalog: IngredientCatalog =
///     [Ingredient::new("Queijo", "g", Money::new(Decimal::new(42, 3)))].into_iter().collect();
///
/// let line = RecipeLine::new("Pizza", "Queijo", Decimal::from(150), "g");
/// assert_eq!(resolve_line_cost(&line, &catalog), Money::from_cents(630));
///
/// let ghost = RecipeLine::new("Pizza", "Trufa", Decimal::from(5), "g");
/// assert!(resolve_line_cost(&ghost, &catalog).is_zero());
/// ```
pub fn resolve_line_cost(line: &RecipeLine, catalog: &IngredientCatalog) -> Money {
    let qty = line.quantity.max(Decimal::ZERO);
    catalog
        .get(&line.ingredient_name)
        .map(|ingredient| ingredient.unit_cost.max_zero().multiply_quantity(qty))
        .unwrap_or_default()
}

/// Strict variant of [`resolve_line_cost`]: a missing ingredient is an error.
pub fn try_resolve_line_cost(line: &RecipeLine, catalog: &IngredientCatalog) -> CoreResult<Money> {
    if !catalog.contains(&line.ingredient_name) {
        return Err(CoreError::IngredientNotFound {
            product: line.product.clone(),
            ingredient: line.ingredient_name.clone(),
        });
    }
    Ok(resolve_line_cost(line, catalog))
}

// =============================================================================
// Recipe Costing
// =============================================================================

/// The resolved cost of one product's recipe.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecipeCost {
    pub cost: Money,
    /// Ingredient names that did not resolve, in line order.
    pub missing: Vec<String>,
    pub warnings: Vec<RowWarning>,
}

impl RecipeCost {
    /// True when the policy says this product must be dropped.
    pub fn is_rejected(&self, policy: MissingIngredientPolicy) -> bool {
        policy == MissingIngredientPolicy::Reject && !self.missing.is_empty()
    }
}

/// Sums the resolved cost of `lines`, collecting warnings instead of failing.
pub fn cost_recipe<'a, I>(lines: I, catalog: &IngredientCatalog) -> RecipeCost
where
    I: IntoIterator<Item = &'a RecipeLine>,
{
    let mut result = RecipeCost::default();
    let mut line_count = 0usize;

    for line in lines {
        line_count += 1;
        coerce_quantity("quantity", line.quantity, &mut result.warnings);

        match try_resolve_line_cost(line, catalog) {
            Ok(cost) => {
                if let Some(ingredient) = catalog.get(&line.ingredient_name) {
                    let mut coerced = Vec::new();
                    coerce_money("unit_cost", ingredient.unit_cost, &mut coerced);
                    for warning in coerced {
                        if !result.warnings.contains(&warning) {
                            result.warnings.push(warning);
                        }
                    }
                }
                result.cost += cost;
            }
            Err(_) => {
                debug!(
                    product = %line.product,
                    ingredient = %line.ingredient_name,
                    "Recipe line references unknown ingredient"
                );
                result.missing.push(line.ingredient_name.clone());
                result.warnings.push(RowWarning::MissingIngredient {
                    ingredient: line.ingredient_name.clone(),
                });
            }
        }
    }

    if line_count == 0 {
        result.warnings.push(RowWarning::EmptyRecipe);
    }

    result
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn catalog() -> IngredientCatalog {
        [
            Ingredient::new("Pão", "un", Money::new(dec!(1.20))),
            Ingredient::new("Carne", "g", Money::new(dec!(0.045))),
            Ingredient::new("Queijo", "g", Money::new(dec!(0.042))),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_resolve_line_cost() {
        let line = RecipeLine::new("X-Burger", "Carne", dec!(150), "g");
        assert_eq!(resolve_line_cost(&line, &catalog()).amount(), dec!(6.75));
    }

    #[test]
    fn test_resolve_missing_is_zero_and_strict_errors() {
        let line = RecipeLine::new("X-Burger", "Bacon", dec!(30), "g");
        assert!(resolve_line_cost(&line, &catalog()).is_zero());

        let err = try_resolve_line_cost(&line, &catalog()).unwrap_err();
        assert!(matches!(err, CoreError::IngredientNotFound { .. }));
    }

    #[test]
    fn test_negative_quantity_costs_zero() {
        let line = RecipeLine::new("X-Burger", "Carne", dec!(-150), "g");
        assert!(resolve_line_cost(&line, &catalog()).is_zero());
    }

    #[test]
    fn test_negative_unit_cost_is_flagged_once() {
        let catalog: IngredientCatalog =
            serde_json::from_str(r#"{"Blend":{"name":"Blend","unit":"un","unit_cost":"-5"}}"#)
                .unwrap();
        let lines = [
            RecipeLine::new("Burger", "Blend", dec!(1), "un"),
            RecipeLine::new("Burger", "Blend", dec!(2), "un"),
        ];

        let recipe = cost_recipe(lines.iter(), &catalog);
        assert!(recipe.cost.is_zero());
        assert_eq!(
            recipe.warnings,
            vec![RowWarning::CoercedInput {
                field: "unit_cost".to_string()
            }]
        );
    }

    #[test]
    fn test_catalog_upsert_replaces() {
        let mut catalog = catalog();
        let old = catalog.upsert(Ingredient::new("Pão", "un", Money::new(dec!(1.50))));
        assert_eq!(old.unwrap().unit_cost.amount(), dec!(1.20));
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.get("Pão").unwrap().unit_cost.amount(), dec!(1.50));
    }

    #[test]
    fn test_add_line_takes_unit_from_catalog() {
        let catalog = catalog();
        let mut bom = BillOfMaterials::new();
        let line = bom.add_line("X-Burger", "Queijo", dec!(30), &catalog);
        assert_eq!(line.unit, "g");
        assert!(line.unit_cost_snapshot.is_none());

        let line = bom.add_snapshot_line("X-Burger", "Pão", dec!(1), &catalog);
        assert_eq!(line.unit_cost_snapshot, Some(Money::new(dec!(1.20))));
        assert_eq!(bom.lines_for("X-Burger").count(), 2);
    }

    #[test]
    fn test_cost_recipe_collects_warnings() {
        let catalog = catalog();
        let lines = vec![
            RecipeLine::new("X-Burger", "Pão", dec!(1), "un"),
            RecipeLine::new("X-Burger", "Carne", dec!(150), "g"),
            RecipeLine::new("X-Burger", "Bacon", dec!(30), "g"),
        ];

        let cost = cost_recipe(&lines, &catalog);
        assert_eq!(cost.cost.amount(), dec!(7.95));
        assert_eq!(cost.missing, vec!["Bacon".to_string()]);
        assert!(cost.is_rejected(MissingIngredientPolicy::Reject));
        assert!(!cost.is_rejected(MissingIngredientPolicy::ZeroCost));
    }

    #[test]
    fn test_cost_recipe_empty_warns() {
        let cost = cost_recipe(std::iter::empty(), &catalog());
        assert!(cost.cost.is_zero());
        assert_eq!(cost.warnings, vec![RowWarning::EmptyRecipe]);
    }

    #[test]
    fn test_by_product_groups_in_name_order() {
        let bom = BillOfMaterials::from_lines(vec![
            RecipeLine::new("Suco", "Laranja", dec!(3), "un"),
            RecipeLine::new("Pizza", "Queijo", dec!(150), "g"),
            RecipeLine::new("Suco", "Açúcar", dec!(10), "g"),
        ]);
        let groups = bom.by_product();
        let names: Vec<_> = groups.keys().copied().collect();
        assert_eq!(names, vec!["Pizza", "Suco"]);
        assert_eq!(groups["Suco"].len(), 2);
    }
}
