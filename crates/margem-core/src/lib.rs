//! # margem-core: Pure Pricing Engine for Margem
//!
//! Unit economics for restaurants selling through a delivery marketplace:
//! what a dish costs, what the seller keeps after commission, courier and
//! discounts, and what it should cost to hit a target margin.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Margem Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    margem-cli (caller)                          │   │
//! │  │    price ──► quick ──► config ──► init-config                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ PricingRequest                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    margem-store                                 │   │
//! │  │    AppConfig (file + env), CSV import/export                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ margem-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌────────────┐ ┌──────────────┐   │   │
//! │  │   │   bom    │ │ costing  │ │ allocation │ │   delivery   │   │   │
//! │  │   │ catalog  │ │  gross   │ │ fixed cost │ │  commission  │   │   │
//! │  │   │ recipes  │ │  margin  │ │  per unit  │ │  net revenue │   │   │
//! │  │   └────┬─────┘ └──────────┘ └─────┬──────┘ └──────┬───────┘   │   │
//! │  │        └──────────────┬───────────┴───────────────┘           │   │
//! │  │                       ▼                                        │   │
//! │  │              pricing (summarizer)     quick (preview)          │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO CLOCK • NO CONFIG FILES • PURE FUNCTIONS         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Decimal money with centavo rounding
//! - [`types`] - Domain types (Ingredient, RecipeLine, ProductPricing, Rate, ...)
//! - [`error`] - Domain error types
//! - [`validation`] - Request checks and per-row coercion
//! - [`bom`] - Ingredient catalog, bill of materials, recipe costing
//! - [`costing`] - Gross-margin table
//! - [`allocation`] - Fixed-cost allocation by volume
//! - [`delivery`] - Marketplace vs self-delivery economics
//! - [`pricing`] - Full per-product reconciliation and suggested price
//! - [`quick`] - Single-commission preview table
//! - [`advisor`] - Operator tips from a margin table
//! - [`analytics`] - Sales KPIs
//!
//! ## Example Usage
//!
//! ```rust
//! use margem_core::delivery::DeliveryConfig;
//! use margem_core::money::Money;
//!
//! // R$ 20 order, R$ 3 coupon, marketplace couriers (36% commission)
//! let delivery = DeliveryConfig::marketplace();
//! let net = delivery.net_revenue(Money::from_reais(20), Money::from_reais(3));
//!
//! assert_eq!(net, Money::from_cents(1088));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod advisor;
pub mod allocation;
pub mod analytics;
pub mod bom;
pub mod costing;
pub mod delivery;
pub mod error;
pub mod money;
pub mod pricing;
pub mod quick;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use bom::{BillOfMaterials, IngredientCatalog};
pub use delivery::{DeliveryConfig, DeliveryMode};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::{summarize, PricingRequest, PricingResultRow, PricingSummary};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Marketplace commission when the restaurant delivers itself (20%).
pub const SELF_DELIVERY_COMMISSION_BPS: u32 = 2000;

/// Marketplace commission when the marketplace's couriers deliver (36%).
pub const MARKETPLACE_COMMISSION_BPS: u32 = 3600;

/// Flat commission of the quick preview when nothing is configured (23%).
pub const QUICK_DEFAULT_COMMISSION_BPS: u32 = 2300;

/// Net margin below this (15%) earns a low-margin tip.
pub const LOW_MARGIN_THRESHOLD_BPS: u32 = 1500;

/// Products named per loss or low-margin tip.
pub const ADVICE_LIST_LIMIT: usize = 5;

/// Products named in the highlight tip.
pub const ADVICE_HIGHLIGHT_LIMIT: usize = 3;
