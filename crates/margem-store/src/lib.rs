//! # margem-store: Configuration and Tables for Margem
//!
//! The collaborators the engine keeps at arm's length: the configuration
//! store and the spreadsheet import/export.
//!
//! ```text
//! config.json / .toml ──► AppConfig ──┐
//!        env vars ────────────────────┤
//!                                     ├──► PricingRequest ──► margem-core
//! ingredients.csv ──► tables ─────────┤
//! recipes.csv, products.csv ──────────┘
//!
//! PricingSummary ──► report ──► pricing.csv / report.json
//! ```
//!
//! ## Module Organization
//! - [`config`] - `AppConfig` (file + environment)
//! - [`error`] - Store error types
//! - [`tables`] - CSV import with lenient number parsing
//! - [`report`] - CSV and JSON export

pub mod config;
pub mod error;
pub mod report;
pub mod tables;

pub use config::AppConfig;
pub use error::{StoreError, StoreResult};
pub use report::PricingReport;
