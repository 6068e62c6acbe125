//! # Validation Module
//!
//! Two kinds of checks live here:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  validate_*  →  request-wide scalars (tax rate, packaging cost).       │
//! │                 A bad value is a caller contract violation: Err.       │
//! │                                                                         │
//! │  coerce_*    →  per-row values (quantity, price, discount, margin).    │
//! │                 A bad value is data quality: clamp, warn, continue.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;
use tracing::debug;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Rate, RowWarning};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Request Validators
// =============================================================================

/// Validates that a rate lies within 0%..=100%.
///
/// ## Example
/// ```rust
/// use margem_core::types::Rate;
/// use margem_core::validation::validate_rate;
///
/// assert!(validate_rate("tax_rate", Rate::from_bps(600)).is_ok());
/// assert!(validate_rate("tax_rate", Rate::from_bps(10_001)).is_err());
/// ```
pub fn validate_rate(field: &str, rate: Rate) -> ValidationResult<()> {
    if !rate.is_unit_interval() {
        return Err(ValidationError::RateOutOfRange {
            field: field.to_string(),
            value: rate.to_string(),
        });
    }
    Ok(())
}

/// Validates that a request-wide amount is not negative.
pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a product name and returns it trimmed.
pub fn validate_product_name(name: &str) -> ValidationResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "product".to_string(),
        });
    }
    Ok(name.to_string())
}

// =============================================================================
// Row Coercion
// =============================================================================

/// Floors a per-row amount at zero, recording a warning when it was negative.
pub fn coerce_money(field: &str, amount: Money, warnings: &mut Vec<RowWarning>) -> Money {
    if amount.is_negative() {
        debug!(field, %amount, "Coercing negative amount to zero");
        warnings.push(RowWarning::CoercedInput {
            field: field.to_string(),
        });
        return Money::zero();
    }
    amount
}

/// Floors a recipe quantity at zero, recording a warning when it was negative.
pub fn coerce_quantity(field: &str, qty: Decimal, warnings: &mut Vec<RowWarning>) -> Decimal {
    if qty < Decimal::ZERO {
        debug!(field, %qty, "Coercing negative quantity to zero");
        warnings.push(RowWarning::CoercedInput {
            field: field.to_string(),
        });
        return Decimal::ZERO;
    }
    qty
}

/// Clamps a per-product target margin into 0%..=100%.
pub fn coerce_target_margin(rate: Rate, warnings: &mut Vec<RowWarning>) -> Rate {
    let (clamped, changed) = rate.clamp_unit();
    if changed {
        warnings.push(RowWarning::CoercedInput {
            field: "target_margin_pct".to_string(),
        });
    }
    clamped
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validate_rate() {
        assert!(validate_rate("tax", Rate::zero()).is_ok());
        assert!(validate_rate("tax", Rate::from_bps(10_000)).is_ok());
        assert!(validate_rate("tax", Rate::from_fraction(dec!(1.01))).is_err());
    }

    #[test]
    fn test_validate_non_negative() {
        assert!(validate_non_negative("packaging", Money::zero()).is_ok());
        assert!(validate_non_negative("packaging", Money::from_cents(-1)).is_err());
    }

    #[test]
    fn test_validate_product_name() {
        assert_eq!(validate_product_name("  Pizza ").unwrap(), "Pizza");
        assert!(validate_product_name("   ").is_err());
    }

    #[test]
    fn test_coerce_money() {
        let mut warnings = Vec::new();
        assert_eq!(
            coerce_money("listed_price", Money::from_reais(10), &mut warnings),
            Money::from_reais(10)
        );
        assert!(warnings.is_empty());

        assert!(coerce_money("listed_price", Money::from_reais(-10), &mut warnings).is_zero());
        assert_eq!(
            warnings,
            vec![RowWarning::CoercedInput {
                field: "listed_price".to_string()
            }]
        );
    }

    #[test]
    fn test_coerce_quantity() {
        let mut warnings = Vec::new();
        assert_eq!(coerce_quantity("quantity", dec!(0.15), &mut warnings), dec!(0.15));
        assert_eq!(coerce_quantity("quantity", dec!(-2), &mut warnings), Decimal::ZERO);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_coerce_target_margin() {
        let mut warnings = Vec::new();
        let rate = coerce_target_margin(Rate::from_fraction(dec!(1.5)), &mut warnings);
        assert_eq!(rate.fraction(), Decimal::ONE);
        assert_eq!(warnings.len(), 1);
    }
}
