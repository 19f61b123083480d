//! Amount type for parsing monetary values written in different locales.
//!
//! Bank exports disagree on what `.` and `,` mean. This module provides the `Amount` type which
//! wraps `Decimal` and parses strings according to an `AmountFormat`, rejecting anything that does
//! not match the format exactly instead of guessing.

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;
use std::sync::LazyLock;

/// Optional sign, digits either grouped in threes by `.` or ungrouped, optional `,` fraction.
static ITALIAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(\d{1,3}(\.\d{3})+|\d+)(,\d+)?$").expect("the Italian amount regex is valid")
});

/// Optional sign, digits, optional `.` fraction.
static PLAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?\d+(\.\d+)?$").expect("the plain amount regex is valid")
});

/// Represents how amounts are written in a source file.
///
/// # Examples
///  - `AmountFormat::Italian` -> `-1.234,56`
///  - `AmountFormat::Plain` -> `-1234.56`
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AmountFormat {
    /// `,` is the decimal separator and `.` separates groups of three digits.
    #[default]
    Italian,
    /// `.` is the decimal separator and there are no group separators.
    Plain,
}

/// A signed monetary value without a currency.
///
/// Parsing with `FromStr` uses the Italian format since that is what most of the supported banks
/// export.
///
/// ```
/// # use firefly_convert::model::Amount;
/// # use std::str::FromStr;
/// let amount = Amount::from_str("-1.234,56").unwrap();
/// assert_eq!(amount.to_string(), "-1234.56");
/// assert_eq!(amount.magnitude().to_string(), "1234.56");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount {
    value: Decimal,
}

impl Amount {
    pub const ZERO: Amount = Amount {
        value: Decimal::ZERO,
    };

    pub const fn new(value: Decimal) -> Self {
        Self { value }
    }

    /// Parses `s` according to `format`. Surrounding whitespace is ignored and an empty string is
    /// zero.
    pub fn parse(s: &str, format: AmountFormat) -> Result<Self, AmountError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Amount::ZERO);
        }

        let canonical = match format {
            AmountFormat::Italian => {
                if !ITALIAN.is_match(trimmed) {
                    return Err(AmountError::Malformed(trimmed.to_string()));
                }
                trimmed.replace('.', "").replace(',', ".")
            }
            AmountFormat::Plain => {
                if !PLAIN.is_match(trimmed) {
                    return Err(AmountError::Malformed(trimmed.to_string()));
                }
                trimmed.to_string()
            }
        };
        let unsigned = canonical.strip_prefix('+').unwrap_or(&canonical);

        let value = Decimal::from_str(unsigned).map_err(AmountError::Decimal)?;
        Ok(Amount { value })
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.value
    }

    /// Returns the absolute value.
    pub fn magnitude(&self) -> Decimal {
        self.value.abs()
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Returns true if the amount is greater than zero.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.value.is_sign_positive()
    }

    /// Returns true if the amount is less than zero.
    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.value.is_sign_negative()
    }
}

/// An error that can occur when parsing strings into `Amount` values.
#[derive(Debug)]
pub enum AmountError {
    /// The string does not match the expected number format.
    Malformed(String),
    /// The string matched but does not fit in a `Decimal`.
    Decimal(rust_decimal::Error),
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AmountError::Malformed(s) => write!(f, "malformed amount '{s}'"),
            AmountError::Decimal(e) => Display::fmt(e, f),
        }
    }
}

impl std::error::Error for AmountError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AmountError::Malformed(_) => None,
            AmountError::Decimal(e) => Some(e),
        }
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::parse(s, AmountFormat::Italian)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.value, f)
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Amount::parse(&s, AmountFormat::Plain).map_err(serde::de::Error::custom)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_thousands_and_decimal_comma() {
        let amount = Amount::from_str("1.234,56").unwrap();
        assert_eq!(amount.value(), dec("1234.56"));
    }

    #[test]
    fn test_parse_negative() {
        let amount = Amount::from_str("-33,67").unwrap();
        assert_eq!(amount.value(), dec("-33.67"));
        assert!(amount.is_negative());
    }

    #[test]
    fn test_parse_explicit_plus() {
        let amount = Amount::from_str("+10,00").unwrap();
        assert_eq!(amount.value(), dec("10.00"));
        assert!(amount.is_positive());
    }

    #[test]
    fn test_parse_multiple_groups() {
        let amount = Amount::from_str("1.234.567,8").unwrap();
        assert_eq!(amount.value(), dec("1234567.8"));
    }

    #[test]
    fn test_parse_ungrouped() {
        let amount = Amount::from_str("1234,5").unwrap();
        assert_eq!(amount.value(), dec("1234.5"));
    }

    #[test]
    fn test_parse_thousands_only() {
        let amount = Amount::from_str("1.000").unwrap();
        assert_eq!(amount.value(), dec("1000"));
    }

    #[test]
    fn test_parse_keeps_precision() {
        let amount = Amount::from_str("0,000001").unwrap();
        assert_eq!(amount.to_string(), "0.000001");
    }

    #[test]
    fn test_parse_empty_is_zero() {
        assert!(Amount::from_str("").unwrap().is_zero());
        assert!(Amount::from_str("   ").unwrap().is_zero());
    }

    #[test]
    fn test_reject_two_decimal_commas() {
        let err = Amount::from_str("12,34,56").unwrap_err();
        assert!(matches!(err, AmountError::Malformed(_)));
        assert_eq!(err.to_string(), "malformed amount '12,34,56'");
    }

    #[test]
    fn test_reject_bad_grouping() {
        assert!(Amount::from_str("1.23,00").is_err());
        assert!(Amount::from_str("12.34").is_err());
    }

    #[test]
    fn test_reject_garbage() {
        assert!(Amount::from_str("abc").is_err());
        assert!(Amount::from_str("1,2a").is_err());
        assert!(Amount::from_str(",50").is_err());
    }

    #[test]
    fn test_parse_plain() {
        let amount = Amount::parse("-12.5", AmountFormat::Plain).unwrap();
        assert_eq!(amount.value(), dec("-12.5"));
        assert!(Amount::parse("1,234.50", AmountFormat::Plain).is_err());
    }

    #[test]
    fn test_zero_is_not_positive_or_negative() {
        let zero = Amount::from_str("-0,00").unwrap();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());
    }

    #[test]
    fn test_magnitude() {
        let amount = Amount::from_str("-5,10").unwrap();
        assert_eq!(amount.magnitude(), dec("5.10"));
    }

    #[test]
    fn test_serialize() {
        let amount = Amount::from_str("1.000,50").unwrap();
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "\"1000.50\"");
    }
}
