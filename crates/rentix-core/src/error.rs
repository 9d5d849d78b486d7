//! # Error Types
//!
//! Domain-specific error types for rentix-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  rentix-core errors (this file)                                        │
//! │  ├── CoreError        - Availability / booking rule violations         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  rentix-db errors (separate crate)                                     │
//! │  └── DbError          - Storage failures, Conflict (retryable)         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → web layer               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (IDs, line index, counts)
//! 3. Errors are enum variants, never String
//! 4. `InvalidPromoConfig` is reported but never fails a booking

use thiserror::Error;

use crate::types::ReservationStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A product, bundling, reservation, booking, customer or promo is missing.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Date range or quantity is unusable.
    ///
    /// ## When This Occurs
    /// - `start >= end`
    /// - Start date is in the past (policy controlled)
    /// - Quantity is zero or negative
    #[error("Invalid range: {reason}")]
    InvalidRange { reason: String },

    /// Not enough free units to satisfy a booking line.
    ///
    /// ## User Workflow
    /// ```text
    /// Book "Sony A7 III" × 3 for 12-14 Aug
    ///      │
    ///      ▼
    /// Free units in range: 2
    ///      │
    ///      ▼
    /// InsufficientInventory { line: 0, item: "Sony A7 III", available: 2, requested: 3 }
    ///      │
    ///      ▼
    /// Whole booking aborted, nothing written
    /// ```
    #[error("Insufficient inventory for line {line} ({item}): available {available}, requested {requested}")]
    InsufficientInventory {
        line: usize,
        item: String,
        available: i64,
        requested: i64,
    },

    /// Status change not present in the transition table.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: ReservationStatus,
        to: ReservationStatus,
    },

    /// Promo rules are malformed. The calculator turns this into a zero discount.
    #[error("Invalid promo configuration: {reason}")]
    InvalidPromoConfig { reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates an InvalidRange error.
    pub fn invalid_range(reason: impl Into<String>) -> Self {
        CoreError::InvalidRange {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid phone number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// An amount computed from valid inputs does not fit in minor units.
    #[error("{field} is too large")]
    Overflow { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientInventory {
            line: 1,
            item: "Sony A7 III".to_string(),
            available: 2,
            requested: 3,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient inventory for line 1 (Sony A7 III): available 2, requested 3"
        );

        let err = CoreError::InvalidTransition {
            from: ReservationStatus::Cancelled,
            to: ReservationStatus::Cancelled,
        };
        assert_eq!(
            err.to_string(),
            "Invalid status transition from cancelled to cancelled"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "customer_id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }

    #[test]
    fn test_not_found_helper() {
        let err = CoreError::not_found("Bundling", "b-1");
        assert_eq!(err.to_string(), "Bundling not found: b-1");
    }
}
