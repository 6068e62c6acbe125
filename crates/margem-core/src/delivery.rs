//! # Delivery-Economics Model
//!
//! Converts a listed price into what the seller actually receives.
//!
//! ## Two Cost Models
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Delivery Mode Comparison                             │
//! │                                                                         │
//! │  MARKETPLACE LOGISTICS               │  SELF DELIVERY                   │
//! │  ─────────────────────               │  ─────────────                   │
//! │  Marketplace couriers deliver        │  Restaurant's own couriers       │
//! │  Commission 36% of price             │  Commission 20% (quick preview)  │
//! │                                      │                                  │
//! │  net = (price − discount) × (1 − c)  │  net = (price − discount) − S    │
//! │                                      │  (commission not applied)        │
//! │                                      │                                  │
//! │  R$ 20, discount R$ 3, c = 20%:      │  R$ 20, discount R$ 3, S = R$ 8: │
//! │  net = 17 × 0.8 = R$ 13.60           │  net = 17 − 8 = R$ 9.00          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The commission is derived from the mode; the operator picks a mode, not a
//! percentage.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::Rate;
use crate::{MARKETPLACE_COMMISSION_BPS, SELF_DELIVERY_COMMISSION_BPS};

// =============================================================================
// Delivery Mode
// =============================================================================

/// Who carries the order to the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// The restaurant delivers ("entrega própria").
    #[default]
    SelfDelivery,
    /// The marketplace's logistics network delivers.
    MarketplaceLogistics,
}

impl DeliveryMode {
    /// The commission the marketplace charges in this mode.
    pub fn commission(&self) -> Rate {
        match self {
            DeliveryMode::SelfDelivery => Rate::from_bps(SELF_DELIVERY_COMMISSION_BPS),
            DeliveryMode::MarketplaceLogistics => Rate::from_bps(MARKETPLACE_COMMISSION_BPS),
        }
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryMode::SelfDelivery => write!(f, "self_delivery"),
            DeliveryMode::MarketplaceLogistics => write!(f, "marketplace_logistics"),
        }
    }
}

impl std::str::FromStr for DeliveryMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "self_delivery" | "self" | "propria" | "própria" => Ok(DeliveryMode::SelfDelivery),
            "marketplace_logistics" | "marketplace" | "logistics" | "ifood" => {
                Ok(DeliveryMode::MarketplaceLogistics)
            }
            _ => Err(ValidationError::NotAllowed {
                field: "delivery mode".to_string(),
                allowed: vec![
                    "self_delivery".to_string(),
                    "marketplace_logistics".to_string(),
                ],
            }),
        }
    }
}

// =============================================================================
// Delivery Configuration
// =============================================================================

/// Delivery economics for one pricing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DeliveryConfig {
    pub mode: DeliveryMode,
    /// Derived from `mode` unless explicitly overridden.
    pub commission: Rate,
    /// Average cost of one self-delivered order.
    pub self_delivery_unit_cost: Money,
}

impl DeliveryConfig {
    /// Builds the config for `mode`, deriving its commission.
    pub fn new(mode: DeliveryMode, self_delivery_unit_cost: Money) -> Self {
        DeliveryConfig {
            mode,
            commission: mode.commission(),
            self_delivery_unit_cost: self_delivery_unit_cost.max_zero(),
        }
    }

    pub fn self_delivery(unit_cost: Money) -> Self {
        Self::new(DeliveryMode::SelfDelivery, unit_cost)
    }

    pub fn marketplace() -> Self {
        Self::new(DeliveryMode::MarketplaceLogistics, Money::zero())
    }

    /// Replaces the mode-derived commission (persisted-config variant).
    pub fn with_commission(mut self, commission: Rate) -> Self {
        self.commission = commission;
        self
    }

    /// What the seller receives for one order at `listed_price`, after
    /// `discount` and after commission or delivery cost.
    pub fn net_revenue(&self, listed_price: Money, discount: Money) -> Money {
        net_revenue(
            listed_price,
            discount,
            self.mode,
            self.commission,
            self.self_delivery_unit_cost,
        )
    }

    /// The delivery cost line shown on a result row: the commission amount
    /// in marketplace mode, the flat courier cost in self-delivery mode.
    pub fn logistics_cost(&self, listed_price: Money) -> Money {
        match self.mode {
            DeliveryMode::MarketplaceLogistics => listed_price.percent_of(self.commission),
            DeliveryMode::SelfDelivery => self.self_delivery_unit_cost,
        }
    }

    /// Net revenue with and without the average discount.
    pub fn revenue_split(&self, listed_price: Money, average_discount: Money) -> RevenueSplit {
        RevenueSplit {
            no_discount: self.net_revenue(listed_price, Money::zero()),
            with_discount: self.net_revenue(listed_price, average_discount),
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        DeliveryConfig::new(DeliveryMode::default(), Money::zero())
    }
}

/// Net revenue at full price and at the promotional (discounted) price.
///
/// Kept as two numbers so the gap a discount opens stays visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevenueSplit {
    pub no_discount: Money,
    pub with_discount: Money,
}

/// Net revenue for one order.
///
/// - effective price = `max(0, listed_price − discount)`
/// - marketplace: `effective × (1 − commission)`
/// - self-delivery: `effective − self_delivery_cost` (commission ignored)
///
/// ## Example
/// ```rust
/// use margem_core::delivery::{net_revenue, DeliveryMode};
/// use margem_core::money::Money;
/// use margem_core::types::Rate;
///
/// let net = net_revenue(
///     Money::from_reais(20),
///     Money::from_reais(3),
///     DeliveryMode::MarketplaceLogistics,
///     Rate::from_bps(2000),
///     Money::zero(),
/// );
/// assert_eq!(net, Money::from_cents(1360));
/// ```
pub fn net_revenue(
    listed_price: Money,
    discount: Money,
    mode: DeliveryMode,
    commission: Rate,
    self_delivery_cost: Money,
) -> Money {
    let effective = (listed_price - discount.max_zero()).max_zero();
    match mode {
        DeliveryMode::MarketplaceLogistics => effective - effective.percent_of(commission),
        DeliveryMode::SelfDelivery => effective - self_delivery_cost,
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
    fn test_commission_derived_from_mode() {
        assert_eq!(DeliveryMode::SelfDelivery.commission().fraction(), dec!(0.20));
        assert_eq!(
            DeliveryMode::MarketplaceLogistics.commission().fraction(),
            dec!(0.36)
        );
        assert_eq!(DeliveryConfig::marketplace().commission, Rate::from_bps(3600));
    }

    #[test]
    fn test_marketplace_net_revenue_with_discount() {
        let config = DeliveryConfig::marketplace().with_commission(Rate::from_bps(2000));
        let net = config.net_revenue(Money::from_reais(20), Money::from_reais(3));
        assert_eq!(net, Money::from_cents(1360));
    }

    #[test]
    fn test_self_delivery_ignores_commission() {
        let config = DeliveryConfig::self_delivery(Money::from_reais(8));
        let net = config.net_revenue(Money::from_reais(20), Money::from_reais(3));
        assert_eq!(net, Money::from_reais(9));
    }

    #[test]
    fn test_discount_larger_than_price() {
        let marketplace = DeliveryConfig::marketplace();
        assert!(marketplace
            .net_revenue(Money::from_reais(10), Money::from_reais(15))
            .is_zero());

        // The courier still has to be paid.
        let own = DeliveryConfig::self_delivery(Money::from_reais(5));
        assert_eq!(
            own.net_revenue(Money::from_reais(10), Money::from_reais(15)),
            Money::from_reais(-5)
        );
    }

    #[test]
    fn test_logistics_cost() {
        let marketplace = DeliveryConfig::marketplace();
        assert_eq!(
            marketplace.logistics_cost(Money::from_reais(50)),
            Money::from_reais(18)
        );
        let own = DeliveryConfig::self_delivery(Money::from_reais(7));
        assert_eq!(own.logistics_cost(Money::from_reais(50)), Money::from_reais(7));
    }

    #[test]
    fn test_revenue_split_discount_never_helps() {
        let config = DeliveryConfig::marketplace();
        let split = config.revenue_split(Money::from_reais(30), Money::from_reais(4));
        assert!(split.with_discount <= split.no_discount);
        assert_eq!(split.no_discount, Money::new(dec!(19.2)));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(
            "propria".parse::<DeliveryMode>().unwrap(),
            DeliveryMode::SelfDelivery
        );
        assert_eq!(
            "iFood".parse::<DeliveryMode>().unwrap(),
            DeliveryMode::MarketplaceLogistics
        );
        assert!("drone".parse::<DeliveryMode>().is_err());
    }
}
