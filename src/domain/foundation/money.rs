//! Monetary amount value object.
//!
//! All amounts are stored as i64 minor units (cents), never floats.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// ISO 4217 currency code.
///
/// The engine performs no conversion; the currency rides along so the
/// gateway session is minted in the right denomination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    /// Creates a currency from a three-letter code.
    pub fn new(code: impl Into<String>) -> Result<Self, ValidationError> {
        let code: String = code.into();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::invalid_value(
                "currency",
                "expected a three-letter ISO 4217 code",
            ));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    /// US dollars, the platform default.
    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Non-negative monetary amount in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates an amount from minor units.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for negative amounts.
    pub fn from_minor_units(amount: i64) -> Result<Self, ValidationError> {
        if amount < 0 {
            return Err(ValidationError::invalid_value(
                "amount",
                "monetary amounts cannot be negative",
            ));
        }
        Ok(Self(amount))
    }

    /// The zero amount.
    pub fn zero() -> Self {
        Self(0)
    }

    /// Returns the amount in minor units.
    pub fn minor_units(&self) -> i64 {
        self.0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_amounts() {
        assert!(Money::from_minor_units(-1).is_err());
    }

    #[test]
    fn zero_is_zero() {
        assert!(Money::zero().is_zero());
        assert!(!Money::from_minor_units(5000).unwrap().is_zero());
    }

    #[test]
    fn currency_normalizes_to_uppercase() {
        let c = Currency::new("usd").unwrap();
        assert_eq!(c.as_str(), "USD");
    }

    #[test]
    fn currency_rejects_bad_codes() {
        assert!(Currency::new("dollars").is_err());
        assert!(Currency::new("U1").is_err());
    }
}
