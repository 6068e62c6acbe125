//! # Table Import
//!
//! Reads the operator's spreadsheets (saved as CSV) into engine types.
//!
//! Expected columns:
//! ```text
//! ingredients.csv   name, unit, unit_cost
//! recipes.csv       product, ingredient, quantity, unit
//! products.csv      product, listed_price, monthly_volume, target_margin_pct, average_discount
//! sales.csv         product, quantity, gross_amount, discount_amount
//! ```
//!
//! Numeric cells are read the way people type them in a Brazilian
//! spreadsheet: `R$ 1.234,56`, `30%`, `0,045`. A cell that still cannot be
//! read becomes 0 and is logged; only a structurally broken file fails.

use margem_core::analytics::SalesRecord;
use margem_core::bom::{BillOfMaterials, IngredientCatalog};
use margem_core::money::Money;
use margem_core::types::{Ingredient, ProductPricing, Rate, RecipeLine};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};

// =============================================================================
// Records
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientRecord {
    pub name: String,
    #[serde(default)]
    pub unit: String,
    #[serde(deserialize_with = "lenient_amount")]
    pub unit_cost: Decimal,
}

impl IngredientRecord {
    pub fn to_ingredient(&self) -> Ingredient {
        Ingredient::new(self.name.as_str(), self.unit.as_str(), Money::new(self.unit_cost))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecipeRecord {
    pub product: String,
    pub ingredient: String,
    #[serde(deserialize_with = "lenient_amount")]
    pub quantity: Decimal,
    #[serde(default)]
    pub unit: String,
}

impl RecipeRecord {
    pub fn to_line(&self) -> RecipeLine {
        RecipeLine::new(
            self.product.trim(),
            self.ingredient.trim(),
            self.quantity,
            self.unit.as_str(),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductRecord {
    pub product: String,
    #[serde(deserialize_with = "lenient_amount")]
    pub listed_price: Decimal,
    /// Empty when the sheet leaves volume to be filled from sales.
    #[serde(default, deserialize_with = "lenient_optional_amount")]
    pub monthly_volume: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_optional_rate")]
    pub target_margin_pct: Option<Rate>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub average_discount: Decimal,
}

impl ProductRecord {
    /// Converts to pricing parameters, taking the volume from `fallback`
    /// when the sheet has none.
    pub fn to_pricing(&self, fallback_volumes: &BTreeMap<String, u64>) -> ProductPricing {
        let name = self.product.trim();
        let volume = match self.monthly_volume {
            Some(volume) => whole_units(volume),
            None => fallback_volumes.get(name).copied().unwrap_or(0),
        };

        let pricing = ProductPricing::new(name, Money::new(self.listed_price), volume)
            .with_average_discount(Money::new(self.average_discount));
        match self.target_margin_pct {
            Some(target) => pricing.with_target_margin(target),
            None => pricing,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SalesRow {
    pub product: String,
    #[serde(deserialize_with = "lenient_amount")]
    pub quantity: Decimal,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub gross_amount: Decimal,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub discount_amount: Decimal,
}

impl SalesRow {
    pub fn to_record(&self) -> SalesRecord {
        SalesRecord::new(self.product.trim(), self.quantity, Money::new(self.gross_amount))
            .with_discount(Money::new(self.discount_amount))
    }
}

fn whole_units(volume: Decimal) -> u64 {
    volume.trunc().to_u64().unwrap_or(0)
}

// =============================================================================
// Loaders
// =============================================================================

/// Reads every row of a CSV table.
///
/// The header must name every column in `required`, even when the table
/// has no data rows.
pub fn load_records<T: DeserializeOwned, R: Read>(
    reader: R,
    table: &'static str,
    required: &[&str],
) -> StoreResult<Vec<T>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?;
    if let Some(missing) = required.iter().find(|c| !headers.iter().any(|h| h == **c)) {
        return Err(StoreError::CsvRow {
            table,
            line: 1,
            message: format!("missing column '{}'", missing),
        });
    }

    let mut records = Vec::new();
    for (line_num, result) in csv_reader.deserialize().enumerate() {
        let record: T = result.map_err(|e| StoreError::CsvRow {
            table,
            line: line_num as u64 + 2,
            message: e.to_string(),
        })?;
        records.push(record);
    }

    debug!(table, rows = records.len(), "Loaded table");
    Ok(records)
}

fn open(path: &Path) -> StoreResult<std::fs::File> {
    info!(?path, "Reading table");
    Ok(std::fs::File::open(path)?)
}

pub fn load_catalog<R: Read>(reader: R) -> StoreResult<IngredientCatalog> {
    let records: Vec<IngredientRecord> = load_records(reader, "ingredients", &["name", "unit_cost"])?;
    Ok(records.iter().map(IngredientRecord::to_ingredient).collect())
}

pub fn load_catalog_file(path: &Path) -> StoreResult<IngredientCatalog> {
    load_catalog(open(path)?)
}

pub fn load_bom<R: Read>(reader: R) -> StoreResult<BillOfMaterials> {
    let records: Vec<RecipeRecord> = load_records(reader, "recipes", &["product", "ingredient", "quantity"])?;
    Ok(BillOfMaterials::from_lines(
        records.iter().map(RecipeRecord::to_line).collect(),
    ))
}

pub fn load_bom_file(path: &Path) -> StoreResult<BillOfMaterials> {
    load_bom(open(path)?)
}

pub fn load_products<R: Read>(reader: R) -> StoreResult<Vec<ProductRecord>> {
    load_records(reader, "products", &["product", "listed_price"])
}

pub fn load_products_file(path: &Path) -> StoreResult<Vec<ProductRecord>> {
    load_products(open(path)?)
}

pub fn load_sales<R: Read>(reader: R) -> StoreResult<Vec<SalesRecord>> {
    let rows: Vec<SalesRow> = load_records(reader, "sales", &["product", "quantity"])?;
    Ok(rows.iter().map(SalesRow::to_record).collect())
}

pub fn load_sales_file(path: &Path) -> StoreResult<Vec<SalesRecord>> {
    load_sales(open(path)?)
}

// =============================================================================
// Lenient Numbers
// =============================================================================

/// Parses a number as typed in a spreadsheet cell.
///
/// - `R$` and `%` are stripped, as are spaces
/// - With a comma present, dots are thousands separators and the comma is
///   the decimal point (`1.234,56`)
/// - Without a comma the cell is read as-is (`0.045`)
///
/// ## Example
/// ```rust
/// use margem_store::tables::parse_number;
/// use rust_decimal::Decimal;
///
/// assert_eq!(parse_number("R$ 1.234,56"), Some(Decimal::new(123456, 2)));
/// assert_eq!(parse_number("abc"), None);
/// ```
pub fn parse_number(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .replace("R$", "")
        .replace('%', "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else {
        cleaned
    };
    Decimal::from_str(&normalized).ok()
}

/// Cell to non-negative amount; blank, unreadable and negative cells are 0.
fn coerce_cell(raw: &str) -> Decimal {
    if raw.trim().is_empty() {
        return Decimal::ZERO;
    }
    match parse_number(raw) {
        Some(value) if value >= Decimal::ZERO => value,
        Some(value) => {
            warn!(cell = raw, %value, "Negative number in table, using 0");
            Decimal::ZERO
        }
        None => {
            warn!(cell = raw, "Unreadable number in table, using 0");
            Decimal::ZERO
        }
    }
}

fn lenient_amount<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(coerce_cell(&raw))
}

fn lenient_optional_amount<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .filter(|s| !s.trim().is_empty())
        .map(|s| coerce_cell(&s)))
}

/// Margin cells accept `30%`, `30` and `0.30` alike: with a `%` sign or a
/// value above 1 the cell is a percentage.
fn lenient_optional_rate<'de, D>(deserializer: D) -> Result<Option<Rate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => raw,
        _ => return Ok(None),
    };

    let value = coerce_cell(&raw);
    if raw.contains('%') || value > Decimal::ONE {
        Ok(Some(Rate::from_percentage(value)))
    } else {
        Ok(Some(Rate::from_fraction(value)))
    }
}
