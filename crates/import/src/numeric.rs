use rust_decimal::Decimal;
use statera_core::config::NumericConfig;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid number: {0}")]
pub struct NumericError(pub String);

/// A bank's thousands/decimal separator convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumericConvention {
    thousands: String,
    decimal: String,
}

impl Default for NumericConvention {
    fn default() -> Self {
        Self {
            thousands: ",".to_string(),
            decimal: ".".to_string(),
        }
    }
}

impl From<&NumericConfig> for NumericConvention {
    fn from(cfg: &NumericConfig) -> Self {
        Self {
            thousands: cfg.thousands_separator.clone(),
            decimal: cfg.decimal_separator.clone(),
        }
    }
}

impl NumericConvention {
    /// Normalize a raw numeric token into a decimal.
    ///
    /// Blank or sign-only input is `Ok(None)`. A pair of parentheses marks a
    /// negative value. No rounding is applied.
    pub fn parse(&self, raw: &str) -> Result<Option<Decimal>, NumericError> {
        let s = raw.replace('\u{00A0}', " ");
        let s = s.trim();
        if s.is_empty() {
            return Ok(None);
        }
        let negative = s.contains('(') && s.contains(')');

        let mut s = s.to_string();
        if !self.thousands.is_empty() {
            s = s.replace(self.thousands.as_str(), "");
        }
        if self.decimal != "." && !self.decimal.is_empty() {
            s = s.replace(self.decimal.as_str(), ".");
        }
        let s: String = s
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
            .collect();
        if s.is_empty() || s == "-" {
            return Ok(None);
        }

        let value = Decimal::from_str(&s).map_err(|_| NumericError(raw.trim().to_string()))?;
        Ok(Some(if negative { -value } else { value }))
    }

    pub fn is_number(&self, raw: &str) -> bool {
        matches!(self.parse(raw), Ok(Some(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn european() -> NumericConvention {
        NumericConvention::from(&NumericConfig {
            thousands_separator: ".".to_string(),
            decimal_separator: ",".to_string(),
        })
    }

    #[test]
    fn plain_and_grouped() {
        let conv = NumericConvention::default();
        assert_eq!(conv.parse("123.45").unwrap(), Some(dec("123.45")));
        assert_eq!(conv.parse("1,234.56").unwrap(), Some(dec("1234.56")));
        assert_eq!(conv.parse("12,34,567.00").unwrap(), Some(dec("1234567.00")));
    }

    #[test]
    fn accounting_parentheses_negate() {
        let conv = NumericConvention::default();
        assert_eq!(conv.parse("(1,234.56)").unwrap(), Some(dec("-1234.56")));
    }

    #[test]
    fn currency_text_is_stripped() {
        let conv = NumericConvention::default();
        assert_eq!(conv.parse("INR 500.00 Cr").unwrap(), Some(dec("500.00")));
        assert_eq!(conv.parse("\u{00A0}₹ 75\u{00A0}").unwrap(), Some(dec("75")));
    }

    #[test]
    fn blank_and_sign_only_are_no_value() {
        let conv = NumericConvention::default();
        assert_eq!(conv.parse("").unwrap(), None);
        assert_eq!(conv.parse("   ").unwrap(), None);
        assert_eq!(conv.parse("-").unwrap(), None);
        assert_eq!(conv.parse("N/A").unwrap(), None);
    }

    #[test]
    fn no_rounding() {
        let conv = NumericConvention::default();
        assert_eq!(conv.parse("0.005").unwrap(), Some(dec("0.005")));
    }

    #[test]
    fn european_convention() {
        let conv = european();
        assert_eq!(conv.parse("1.234,56").unwrap(), Some(dec("1234.56")));
        assert_eq!(conv.parse("(12,5)").unwrap(), Some(dec("-12.5")));
    }

    #[test]
    fn malformed_is_an_error() {
        let conv = NumericConvention::default();
        assert!(conv.parse("1.2.3").is_err());
        assert!(conv.parse("--5").is_err());
        assert!(!conv.is_number("1.2.3"));
        assert!(conv.is_number("42"));
    }
}
