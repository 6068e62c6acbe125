//! # Error Types
//!
//! Domain-specific error types for margem-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  margem-core errors (this file)                                        │
//! │  ├── CoreError        - Caller contract violations, strict lookups     │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  margem-store errors (separate crate)                                  │
//! │  └── StoreError       - Config and CSV file failures                   │
//! │                                                                         │
//! │  NOT errors: bad rows. A missing ingredient or a negative quantity     │
//! │  becomes a RowWarning on that product's row and the batch continues.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core engine errors.
///
/// Only raised for problems with the request as a whole, or by the strict
/// lookup helpers that callers opt into.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A recipe line names an ingredient the catalog does not have.
    ///
    /// Returned by the strict resolver only; the permissive resolver costs
    /// the line at zero instead.
    #[error("Ingredient '{ingredient}' used by '{product}' is not in the catalog")]
    IngredientNotFound { product: String, ingredient: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// A rate lies outside 0%..=100%.
    #[error("{field} must be between 0% and 100%, got {value}")]
    RateOutOfRange { field: String, value: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
