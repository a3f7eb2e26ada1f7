use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DepositError;

/// A token amount in the asset's smallest unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn from_base_units(units: u128) -> Self {
        Amount(units)
    }

    pub fn base_units(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Scales a user-entered decimal string by `decimals`.
    ///
    /// Whitespace around the number is ignored and an empty string is zero.
    /// Fractional digits beyond `decimals` are an error rather than being
    /// truncated.
    pub fn parse(text: &str, decimals: u8) -> Result<Self, DepositError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Amount::ZERO);
        }

        let (whole, frac) = match text.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (text, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(invalid(text, "no digits"));
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid(text, "expected digits with an optional decimal point"));
        }
        if frac.len() > decimals as usize {
            return Err(invalid(
                text,
                &format!("at most {decimals} fractional digits allowed"),
            ));
        }

        let scale = 10u128
            .checked_pow(decimals as u32)
            .ok_or_else(|| invalid(text, "too many decimals"))?;

        let whole_units = parse_digits(whole).ok_or_else(|| invalid(text, "overflow"))?;
        let frac_units = parse_digits(frac)
            .and_then(|f| f.checked_mul(10u128.pow((decimals as usize - frac.len()) as u32)))
            .ok_or_else(|| invalid(text, "overflow"))?;

        whole_units
            .checked_mul(scale)
            .and_then(|w| w.checked_add(frac_units))
            .map(Amount)
            .ok_or_else(|| invalid(text, "overflow"))
    }

    /// Renders the amount as a decimal string with trailing zeros trimmed.
    pub fn to_decimal_string(&self, decimals: u8) -> String {
        let digits = self.0.to_string();
        let decimals = decimals as usize;
        if decimals == 0 {
            return digits;
        }

        let padded = format!("{digits:0>width$}", width = decimals + 1);
        let (whole, frac) = padded.split_at(padded.len() - decimals);
        let frac = frac.trim_end_matches('0');
        if frac.is_empty() {
            whole.to_string()
        } else {
            format!("{whole}.{frac}")
        }
    }
}

fn parse_digits(digits: &str) -> Option<u128> {
    if digits.is_empty() {
        return Some(0);
    }
    digits.parse().ok()
}

fn invalid(text: &str, reason: &str) -> DepositError {
    DepositError::InvalidAmount(format!("{text:?}: {reason}"))
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_by_decimals() {
        assert_eq!(Amount::parse("1.5", 6).unwrap().base_units(), 1_500_000);
        assert_eq!(Amount::parse("5", 6).unwrap().base_units(), 5_000_000);
        assert_eq!(Amount::parse("0.000001", 6).unwrap().base_units(), 1);
        assert_eq!(Amount::parse(" 12.34 ", 2).unwrap().base_units(), 1234);
    }

    #[test]
    fn empty_and_zero_are_zero() {
        assert!(Amount::parse("", 6).unwrap().is_zero());
        assert!(Amount::parse("   ", 6).unwrap().is_zero());
        assert!(Amount::parse("0", 6).unwrap().is_zero());
        assert!(Amount::parse("0.000", 6).unwrap().is_zero());
    }

    #[test]
    fn bare_point_forms() {
        assert_eq!(Amount::parse(".5", 6).unwrap().base_units(), 500_000);
        assert_eq!(Amount::parse("5.", 6).unwrap().base_units(), 5_000_000);
        assert!(Amount::parse(".", 6).is_err());
    }

    #[test]
    fn excess_precision_is_rejected() {
        let err = Amount::parse("1.0000001", 6).unwrap_err();
        assert!(matches!(err, DepositError::InvalidAmount(_)));
    }

    #[test]
    fn junk_is_rejected() {
        for text in ["-1", "+1", "1e6", "1,5", "abc", "1.2.3", "0x10", "1 000"] {
            assert!(
                matches!(Amount::parse(text, 6), Err(DepositError::InvalidAmount(_))),
                "{text} should be rejected"
            );
        }
    }

    #[test]
    fn overflow_is_rejected() {
        let huge = "340282366920938463463374607431768211456";
        assert!(Amount::parse(huge, 0).is_err());
        assert!(Amount::parse("340282366920938463463374607431768211455", 1).is_err());
        assert!(Amount::parse("1", 39).is_err());
    }

    #[test]
    fn renders_trimmed_decimal() {
        assert_eq!(Amount::from_base_units(1_500_000).to_decimal_string(6), "1.5");
        assert_eq!(Amount::from_base_units(5_000_000).to_decimal_string(6), "5");
        assert_eq!(Amount::from_base_units(1).to_decimal_string(6), "0.000001");
        assert_eq!(Amount::ZERO.to_decimal_string(6), "0");
        assert_eq!(Amount::from_base_units(42).to_decimal_string(0), "42");
    }

    #[test]
    fn display_is_base_units() {
        assert_eq!(Amount::from_base_units(5_000_000).to_string(), "5000000");
    }
}
