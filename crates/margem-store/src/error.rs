//! # Store Error Types
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Store Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │     Tables      │  │        Files            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  CsvRow         │  │  Io                     │ │
//! │  │  ConfigLoad…    │  │  Csv            │  │  Serialization          │ │
//! │  │  ConfigSave…    │  │                 │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A bad cell is not an error: it is coerced and logged. A file whose
//! structure is broken (missing column, unreadable row) is.

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Table Errors
    // =========================================================================
    /// A row of an imported table could not be read.
    #[error("{table} line {line}: {message}")]
    CsvRow {
        table: &'static str,
        line: u64,
        message: String,
    },

    #[error("CSV error: {0}")]
    Csv(String),

    // =========================================================================
    // File Errors
    // =========================================================================
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    Serialization(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for StoreError {
    fn from(err: toml::de::Error) -> Self {
        StoreError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for StoreError {
    fn from(err: toml::ser::Error) -> Self {
        StoreError::ConfigSaveFailed(err.to_string())
    }
}

impl From<csv::Error> for StoreError {
    fn from(err: csv::Error) -> Self {
        StoreError::Csv(err.to_string())
    }
}

impl From<margem_core::CoreError> for StoreError {
    fn from(err: margem_core::CoreError) -> Self {
        StoreError::InvalidConfig(err.to_string())
    }
}

impl From<margem_core::ValidationError> for StoreError {
    fn from(err: margem_core::ValidationError) -> Self {
        StoreError::InvalidConfig(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_error_names_table_and_line() {
        let err = StoreError::CsvRow {
            table: "ingredients",
            line: 4,
            message: "missing field `name`".to_string(),
        };
        assert_eq!(err.to_string(), "ingredients line 4: missing field `name`");
    }

    #[test]
    fn test_validation_error_becomes_invalid_config() {
        let err: StoreError = margem_core::ValidationError::MustNotBeNegative {
            field: "packaging_unit_cost".to_string(),
        }
        .into();
        assert!(matches!(err, StoreError::InvalidConfig(_)));
    }
}
