//! Numeric conversion for upstream decimal strings and rational prices.
//!
//! Upstream amounts arrive as fixed-point decimal strings and prices as
//! `{n, d}` integer pairs. Storage keeps `f64`, so the narrowing happens
//! exactly once, at the very end: rationals are divided in `Decimal`
//! (28 significant digits) and only the quotient is rounded to `f64`.

use crate::error::{CoreError, Result};
use rust_decimal::Decimal;

/// Parse an upstream decimal amount string into `f64`.
///
/// Empty, non-numeric and non-finite values are rejected.
pub fn parse_amount(raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidAmount("empty amount".to_string()));
    }

    let value: f64 = trimmed
        .parse()
        .map_err(|e| CoreError::InvalidAmount(format!("{trimmed}: {e}")))?;

    if !value.is_finite() {
        return Err(CoreError::InvalidAmount(format!("{trimmed}: not finite")));
    }

    Ok(value)
}

/// Divide `numerator / denominator` exactly, then narrow to `f64`.
///
/// The quotient is formatted and re-parsed, so the result is the
/// correctly-rounded `f64` of the decimal quotient.
pub fn rational_to_f64(numerator: i64, denominator: i64) -> Result<f64> {
    let invalid = || CoreError::InvalidPrice {
        n: numerator,
        d: denominator,
    };

    if denominator == 0 {
        return Err(invalid());
    }

    let quotient = Decimal::from(numerator)
        .checked_div(Decimal::from(denominator))
        .ok_or_else(invalid)?;

    quotient.normalize().to_string().parse::<f64>().map_err(|_| invalid())
}

/// Check whether an amount string represents zero supply.
///
/// Unparseable strings are treated as zero.
pub fn is_zero_amount(raw: &str) -> bool {
    match raw.trim().parse::<Decimal>() {
        Ok(value) => value.is_zero(),
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("4433.2000000").unwrap(), 4433.2);
        assert_eq!(parse_amount("0").unwrap(), 0.0);
        assert!(parse_amount("").is_err());
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("inf").is_err());
    }

    #[test]
    fn test_rational_matches_division() {
        assert_eq!(rational_to_f64(1, 3).unwrap(), 1.0 / 3.0);
        assert_eq!(rational_to_f64(2, 7).unwrap(), 2.0 / 7.0);
        assert_eq!(rational_to_f64(10_000_000, 4_433).unwrap(), 10_000_000.0 / 4_433.0);
        assert_eq!(rational_to_f64(5, 1).unwrap(), 5.0);
    }

    #[test]
    fn test_rational_large_operands() {
        let n = 2_147_483_647i64;
        let d = 1_000_000_007i64;
        let value = rational_to_f64(n, d).unwrap();
        assert!((value - 2.147483632).abs() < 1e-9);
    }

    #[test]
    fn test_amount_zero_check_uses_decimal() {
        assert_eq!("0.0000000".parse::<Decimal>().unwrap(), dec!(0));
        assert_eq!("12.5000000".parse::<Decimal>().unwrap().normalize(), dec!(12.5));
        assert_eq!(rational_to_f64(1, 8).unwrap(), 0.125);
    }

    #[test]
    fn test_rational_zero_denominator() {
        let err = rational_to_f64(1, 0).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPrice { n: 1, d: 0 }));
    }

    #[test]
    fn test_is_zero_amount() {
        assert!(is_zero_amount("0"));
        assert!(is_zero_amount("0.0"));
        assert!(is_zero_amount("0.0000000"));
        assert!(is_zero_amount(""));
        assert!(is_zero_amount("garbage"));
        assert!(!is_zero_amount("123901.0129310"));
    }
}
