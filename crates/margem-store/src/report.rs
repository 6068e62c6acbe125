//! # Result Export
//!
//! Writes engine output back out: CSV for spreadsheets, JSON for anything
//! that wants the whole run in one document.
//!
//! The engine's rows carry no timestamp; the report header does.

use chrono::{DateTime, Utc};
use margem_core::advisor::Advice;
use margem_core::costing::GrossMarginRow;
use margem_core::delivery::DeliveryMode;
use margem_core::money::Money;
use margem_core::pricing::{PricingResultRow, PricingSummary};
use margem_core::quick::QuickPriceRow;
use margem_core::types::Rate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::error::StoreResult;

// =============================================================================
// JSON Report
// =============================================================================

/// One pricing run, as saved to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingReport {
    pub generated_at: DateTime<Utc>,
    pub delivery_mode: DeliveryMode,
    pub summary: PricingSummary,
    pub advice: Advice,
}

impl PricingReport {
    pub fn new(delivery_mode: DeliveryMode, summary: PricingSummary, advice: Advice) -> Self {
        PricingReport {
            generated_at: Utc::now(),
            delivery_mode,
            summary,
            advice,
        }
    }

    pub fn write_json<W: Write>(&self, writer: W) -> StoreResult<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn save(&self, path: &Path) -> StoreResult<()> {
        self.write_json(create_file(path)?)?;
        info!(?path, rows = self.summary.rows.len(), "Pricing report saved");
        Ok(())
    }
}

// =============================================================================
// CSV Export
// =============================================================================

/// Flat form of a summary row: warnings joined into one cell.
#[derive(Debug, Serialize)]
struct PricingCsvRow<'a> {
    product: &'a str,
    listed_price: Money,
    suggested_price: Money,
    adjustment: Money,
    ingredient_cost: Money,
    variable_cost: Money,
    fixed_cost_per_unit: Money,
    tax_amount: Money,
    logistics_cost: Money,
    total_unit_cost: Money,
    net_margin_amount_no_discount: Money,
    net_margin_pct_no_discount: Decimal,
    net_margin_amount_with_discount: Money,
    net_margin_pct_with_discount: Decimal,
    target_margin_pct: Rate,
    warnings: String,
}

impl<'a> From<&'a PricingResultRow> for PricingCsvRow<'a> {
    fn from(row: &'a PricingResultRow) -> Self {
        PricingCsvRow {
            product: &row.product,
            listed_price: row.listed_price,
            suggested_price: row.suggested_price,
            adjustment: row.adjustment,
            ingredient_cost: row.ingredient_cost,
            variable_cost: row.variable_cost,
            fixed_cost_per_unit: row.fixed_cost_per_unit,
            tax_amount: row.tax_amount,
            logistics_cost: row.logistics_cost,
            total_unit_cost: row.total_unit_cost,
            net_margin_amount_no_discount: row.net_margin_amount_no_discount,
            net_margin_pct_no_discount: row.net_margin_pct_no_discount,
            net_margin_amount_with_discount: row.net_margin_amount_with_discount,
            net_margin_pct_with_discount: row.net_margin_pct_with_discount,
            target_margin_pct: row.target_margin_pct,
            warnings: row
                .warnings
                .iter()
                .map(|w| w.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

fn write_rows<W, T>(writer: W, rows: impl IntoIterator<Item = T>) -> StoreResult<()>
where
    W: Write,
    T: Serialize,
{
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_pricing_csv<W: Write>(writer: W, rows: &[PricingResultRow]) -> StoreResult<()> {
    write_rows(writer, rows.iter().map(PricingCsvRow::from))
}

pub fn write_gross_margin_csv<W: Write>(writer: W, rows: &[GrossMarginRow]) -> StoreResult<()> {
    write_rows(writer, rows)
}

pub fn write_quick_csv<W: Write>(writer: W, rows: &[QuickPriceRow]) -> StoreResult<()> {
    write_rows(writer, rows)
}

fn create_file(path: &Path) -> StoreResult<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(File::create(path)?)
}

/// Writes the summary rows to `path` as CSV.
pub fn save_pricing_csv(path: &Path, rows: &[PricingResultRow]) -> StoreResult<()> {
    write_pricing_csv(create_file(path)?, rows)?;
    info!(?path, rows = rows.len(), "Pricing table exported");
    Ok(())
}

pub fn save_gross_margin_csv(path: &Path, rows: &[GrossMarginRow]) -> StoreResult<()> {
    write_gross_margin_csv(create_file(path)?, rows)?;
    info!(?path, rows = rows.len(), "Gross margin table exported");
    Ok(())
}

pub fn save_quick_csv(path: &Path, rows: &[QuickPriceRow]) -> StoreResult<()> {
    write_quick_csv(create_file(path)?, rows)?;
    info!(?path, rows = rows.len(), "Quick pricing table exported");
    Ok(())
}
