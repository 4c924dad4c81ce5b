//! # Validation Module
//!
//! Input validation for catalog writes and order requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP handler                                                  │
//! │  └── JSON shape (deserialization)                                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Business rules (non-empty cart, positive quantities, prices)      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (stock >= 0), CHECK (price_cents >= 0)                      │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::types::{CategoryInput, OrderLine, ProductInput};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_CATEGORY_NAME_LEN: usize = 100;
const MAX_PRODUCT_NAME_LEN: usize = 200;

// =============================================================================
// String Validators
// =============================================================================

fn validate_name(field: &str, name: &str, max: usize) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a product name: non-empty, at most 200 characters.
///
/// ## Example
/// ```rust
/// use kasir_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Kopi Susu").is_ok());
/// assert!(validate_product_name("  ").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_name("name", name, MAX_PRODUCT_NAME_LEN)
}

/// Validates a category name: non-empty, at most 100 characters.
pub fn validate_category_name(name: &str) -> ValidationResult<()> {
    validate_name("name", name, MAX_CATEGORY_NAME_LEN)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an order line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a price in cents. Zero is allowed (free items).
///
/// ## Example
/// ```rust
/// use kasir_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1099).is_ok());
/// assert!(validate_price_cents(0).is_ok());
/// assert!(validate_price_cents(-100).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "price".to_string(),
        });
    }

    Ok(())
}

/// Validates a stock level. Zero is allowed.
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "stock".to_string(),
        });
    }

    Ok(())
}

/// Validates a reference to another record.
pub fn validate_reference(field: &str, id: i64) -> ValidationResult<()> {
    if id <= 0 {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates a whole category input.
pub fn validate_category(input: &CategoryInput) -> ValidationResult<()> {
    validate_category_name(&input.name)
}

/// Validates a whole product input.
pub fn validate_product(input: &ProductInput) -> ValidationResult<()> {
    validate_product_name(&input.name)?;
    validate_price_cents(input.price_cents)?;
    validate_stock(input.stock)?;
    validate_reference("category_id", input.category_id)?;
    Ok(())
}

/// Validates a cart before any lookup happens.
///
/// ## Rules
/// - At least one line
/// - Every quantity > 0
pub fn validate_cart(lines: &[OrderLine]) -> ValidationResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::EmptyCart);
    }

    for line in lines {
        validate_quantity(line.quantity)?;
    }

    Ok(())
}

/// Parses a `YYYY-MM-DD` report date.
pub fn parse_report_date(raw: &str) -> ValidationResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        ValidationError::InvalidFormat {
            field: "date".to_string(),
            reason: "expected YYYY-MM-DD".to_string(),
        }
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Kopi Susu").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name(&"A".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(10_000).is_ok());

        assert_eq!(
            validate_quantity(0),
            Err(ValidationError::MustBePositive {
                field: "quantity".to_string()
            })
        );
        assert!(validate_quantity(-1).is_err());
    }

    #[test]
    fn test_validate_cart() {
        assert_eq!(validate_cart(&[]), Err(ValidationError::EmptyCart));
        assert!(validate_cart(&[OrderLine::new(1, 2)]).is_ok());
        assert!(validate_cart(&[OrderLine::new(1, 2), OrderLine::new(2, 0)]).is_err());
    }

    #[test]
    fn test_validate_product() {
        let mut input = ProductInput {
            name: "Teh Botol".to_string(),
            price_cents: 500,
            stock: 10,
            category_id: 1,
        };
        assert!(validate_product(&input).is_ok());

        input.stock = -1;
        assert!(validate_product(&input).is_err());

        input.stock = 0;
        input.category_id = 0;
        assert_eq!(
            validate_product(&input),
            Err(ValidationError::Required {
                field: "category_id".to_string()
            })
        );
    }

    #[test]
    fn test_parse_report_date() {
        assert_eq!(
            parse_report_date("2026-01-31").unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 31).unwrap()
        );
        assert!(parse_report_date("31/01/2026").is_err());
    }
}
