//! Validation utilities for the Stock Ledger
//!
//! Field-level checks shared by every write path. The write paths call these
//! explicitly before anything is persisted; there is no implicit hook
//! dispatch.

use rust_decimal::Decimal;
use validator::ValidationError;

/// Characters permitted in SKUs, descriptions and search terms: letters,
/// digits, underscore, dot, hyphen and space.
pub fn validate_alphanumplus(value: &str) -> Result<(), ValidationError> {
    let valid = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | ' '));
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_characters"))
    }
}

/// Validate a unit count that must never be negative.
pub fn validate_units(units: i64) -> Result<(), &'static str> {
    if units < 0 {
        return Err("Unit counts cannot be negative");
    }
    Ok(())
}

/// Validate a price: non-negative and quantized to the cent.
pub fn validate_price(price: Decimal) -> Result<(), &'static str> {
    if price.is_sign_negative() {
        return Err("Prices cannot be negative");
    }
    if price.scale() > 2 {
        return Err("Prices carry at most 2 decimal places");
    }
    Ok(())
}

/// Sanitize a search term, rejecting anything outside the permitted
/// character set rather than attempting to escape it.
pub fn validate_search(value: &str) -> Result<&str, ValidationError> {
    validate_alphanumplus(value)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn accepts_permitted_characters() {
        assert!(validate_alphanumplus("SKU-001.A variant_2").is_ok());
        assert!(validate_alphanumplus("").is_ok());
    }

    #[test]
    fn rejects_special_characters() {
        assert!(validate_alphanumplus("sku;drop table").is_err());
        assert!(validate_alphanumplus("déjà").is_err());
    }

    #[test]
    fn price_checks() {
        assert!(validate_price(Decimal::from_str("2.50").unwrap()).is_ok());
        assert!(validate_price(Decimal::from_str("-0.01").unwrap()).is_err());
        assert!(validate_price(Decimal::from_str("1.005").unwrap()).is_err());
    }
}
