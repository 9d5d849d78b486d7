//! # Validation Module
//!
//! Input validation for catalog rows and booking requests.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Caller (web form, spreadsheet import)                         │
//! │  └── Deserialization into request types                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Names, serial numbers, phone numbers                               │
//! │  └── Quantities, prices, line counts, down payments                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                        │
//! │  ├── UNIQUE (product_id, serial_number)                                 │
//! │  └── CHECK product XOR bundling on reservations                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use rentix_core::validation::{validate_quantity, validate_serial_number};
//!
//! validate_serial_number("A7III-0042").unwrap();
//! validate_quantity(2).unwrap();
//! ```

use crate::error::ValidationError;
use crate::{MAX_ITEM_QUANTITY, MAX_LINE_ITEMS, MAX_PRICE_MINOR, MAX_REQUIRED_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a product, bundling, customer or promo name (1-200 chars).
///
/// ```rust
/// use rentix_core::validation::validate_name;
///
/// assert!(validate_name("Sony A7 III").is_ok());
/// assert!(validate_name("  ").is_err());
/// ```
pub fn validate_name(name: &str) -> ValidationResult<()> {
    validate_text("name", name, 200)
}

/// Validates a unit serial number.
///
/// ## Rules
/// - 1 to 100 characters
/// - Letters, digits, `-`, `_`, `/` and `.` only
pub fn validate_serial_number(serial: &str) -> ValidationResult<()> {
    validate_text("serial_number", serial, 100)?;

    if !serial
        .trim()
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '/' | '.'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "serial_number".to_string(),
            reason: "must contain only letters, numbers and - _ / .".to_string(),
        });
    }

    Ok(())
}

/// Validates a WhatsApp contact number and returns it normalized.
///
/// Spaces, dashes and parentheses are stripped; a leading `+` is dropped.
/// Local Indonesian numbers (`08...`) are rewritten to `628...`.
///
/// ```rust
/// use rentix_core::validation::normalize_phone;
///
/// assert_eq!(normalize_phone("0812-3456-7890").unwrap(), "6281234567890");
/// assert_eq!(normalize_phone("+62 812 3456 7890").unwrap(), "6281234567890");
/// assert!(normalize_phone("call me").is_err());
/// ```
pub fn normalize_phone(phone: &str) -> ValidationResult<String> {
    let digits: String = phone
        .trim()
        .trim_start_matches('+')
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    if digits.is_empty() {
        return Err(ValidationError::Required {
            field: "phone".to_string(),
        });
    }

    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain only digits".to_string(),
        });
    }

    let normalized = match digits.strip_prefix('0') {
        Some(rest) => format!("62{}", rest),
        None => digits,
    };

    if !(8..=15).contains(&normalized.len()) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must be 8 to 15 digits".to_string(),
        });
    }

    Ok(normalized)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity (1..=MAX_ITEM_QUANTITY).
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a recipe line's required quantity (1..=MAX_REQUIRED_QUANTITY).
pub fn validate_required_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "required_quantity".to_string(),
        });
    }
    if qty > MAX_REQUIRED_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "required_quantity".to_string(),
            min: 1,
            max: MAX_REQUIRED_QUANTITY,
        });
    }
    Ok(())
}

/// Validates a price in minor units (0..=MAX_PRICE_MINOR).
pub fn validate_price_minor(minor: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_MINOR).contains(&minor) {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_PRICE_MINOR,
        });
    }

    Ok(())
}

/// Validates a caller-supplied down payment against the booking total.
pub fn validate_down_payment(down_payment_minor: i64, total_minor: i64) -> ValidationResult<()> {
    if down_payment_minor < 0 || down_payment_minor > total_minor {
        return Err(ValidationError::OutOfRange {
            field: "down_payment".to_string(),
            min: 0,
            max: total_minor,
        });
    }

    Ok(())
}

/// Validates the number of lines on a booking request.
pub fn validate_line_count(lines: usize) -> ValidationResult<()> {
    if lines == 0 {
        return Err(ValidationError::Required {
            field: "lines".to_string(),
        });
    }

    if lines > MAX_LINE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "lines".to_string(),
            min: 1,
            max: MAX_LINE_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string.
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Canon 24-70mm f/2.8").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name(&"A".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_serial_number() {
        assert!(validate_serial_number("A7III-0042").is_ok());
        assert!(validate_serial_number("SN/2024.01_b").is_ok());
        assert!(validate_serial_number("").is_err());
        assert!(validate_serial_number("has space").is_err());
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("081234567890").unwrap(), "6281234567890");
        assert_eq!(normalize_phone("(021) 555-0100").unwrap(), "62215550100");
        assert!(normalize_phone("").is_err());
        assert!(normalize_phone("12").is_err());
        assert!(normalize_phone("08abc").is_err());
    }

    #[test]
    fn test_price_and_requirement_caps() {
        assert!(validate_price_minor(0).is_ok());
        assert!(validate_price_minor(MAX_PRICE_MINOR).is_ok());
        assert!(validate_price_minor(MAX_PRICE_MINOR + 1).is_err());
        assert!(validate_price_minor(i64::MAX / 2).is_err());
        assert!(validate_price_minor(-1).is_err());

        assert!(validate_required_quantity(MAX_REQUIRED_QUANTITY).is_ok());
        assert!(validate_required_quantity(MAX_REQUIRED_QUANTITY + 1).is_err());
        assert!(validate_required_quantity(0).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_down_payment() {
        assert!(validate_down_payment(0, 1000).is_ok());
        assert!(validate_down_payment(1000, 1000).is_ok());
        assert!(validate_down_payment(-1, 1000).is_err());
        assert!(validate_down_payment(1001, 1000).is_err());
    }

    #[test]
    fn test_validate_line_count() {
        assert!(validate_line_count(0).is_err());
        assert!(validate_line_count(1).is_ok());
        assert!(validate_line_count(MAX_LINE_ITEMS + 1).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("id", "").is_err());
        assert!(validate_uuid("id", "not-a-uuid").is_err());
    }
}
