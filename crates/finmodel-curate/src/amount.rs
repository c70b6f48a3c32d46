//! Parsing of locale-formatted amount strings.
//!
//! Filings write amounts as `1,234,567`, `(1,234)` for negatives, and now and
//! then with trailing units such as `천원` or `만원`. Units are stripped, never
//! applied: the regulator feed already reports every amount in base currency
//! units.

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::LazyLock;

static UNIT_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(원|천원|백만원|억원|KRW|USD|만|천|백만|억)$")
        .expect("valid unit suffix regex")
});

/// Outcome of parsing one amount string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedAmount {
    /// Parsed value; `None` when the input carried no value
    pub value: Option<Decimal>,
    /// Input as received
    pub original: Option<String>,
    /// Input was written in parentheses
    pub is_negative: bool,
    /// Parsing succeeded (a blank input is a success with no value)
    pub success: bool,
    /// Why parsing failed
    pub error: Option<String>,
}

impl ParsedAmount {
    const fn empty(original: Option<String>) -> Self {
        Self { value: None, original, is_negative: false, success: true, error: None }
    }
}

/// Parse an amount string into an exact decimal.
///
/// Never fails: malformed input is reported through [`ParsedAmount::success`]
/// and [`ParsedAmount::error`].
pub fn parse_amount(input: Option<&str>) -> ParsedAmount {
    let original = input.map(str::to_string);
    let Some(text) = input.map(str::trim) else {
        return ParsedAmount::empty(original);
    };
    if text.is_empty() || text == "-" {
        return ParsedAmount::empty(original);
    }

    let (body, is_negative) = match text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        Some(inner) => (inner, true),
        None => (text, false),
    };

    let compact: String = body.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    let cleaned = strip_units(&compact);

    match parse_decimal(cleaned) {
        Ok(magnitude) => ParsedAmount {
            value: Some(if is_negative { -magnitude } else { magnitude }),
            original,
            is_negative,
            success: true,
            error: None,
        },
        Err(err) => ParsedAmount {
            value: None,
            original,
            is_negative,
            success: false,
            error: Some(format!("Failed to parse amount {text:?}: {err}")),
        },
    }
}

/// Strip trailing units until none is left, so `100만원` loses both `원` and `만`.
fn strip_units(text: &str) -> &str {
    let mut rest = text;
    while let Some(unit) = UNIT_SUFFIX.find(rest) {
        rest = &rest[..unit.start()];
    }
    rest
}

fn parse_decimal(text: &str) -> std::result::Result<Decimal, rust_decimal::Error> {
    Decimal::from_str(text).or_else(|err| {
        if text.contains(['e', 'E']) { Decimal::from_scientific(text) } else { Err(err) }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case("1,234,567", dec!(1234567))]
    #[case("(1,234)", dec!(-1234))]
    #[case("9,999천원", dec!(9999))]
    #[case("  42 ", dec!(42))]
    #[case("-500", dec!(-500))]
    #[case("1 000 000", dec!(1000000))]
    #[case("12.50", dec!(12.50))]
    #[case("100USD", dec!(100))]
    #[case("100krw", dec!(100))]
    #[case("3백만원", dec!(3))]
    #[case("100만원", dec!(100))]
    #[case("5억원", dec!(5))]
    #[case("(2천만원)", dec!(-2))]
    #[case("( 7 )", dec!(-7))]
    #[case("1.5e3", dec!(1500))]
    fn test_parse_values(#[case] input: &str, #[case] expected: Decimal) {
        let parsed = parse_amount(Some(input));
        assert!(parsed.success, "{input}: {:?}", parsed.error);
        assert_eq!(parsed.value, Some(expected));
        assert_eq!(parsed.original.as_deref(), Some(input));
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    #[case(Some("   "))]
    #[case(Some("-"))]
    fn test_no_value(#[case] input: Option<&str>) {
        let parsed = parse_amount(input);
        assert!(parsed.success);
        assert_eq!(parsed.value, None);
        assert!(parsed.error.is_none());
    }

    #[test]
    fn test_parenthesis_symmetry() {
        for text in ["1", "1,234", "987,654,321", "0.25"] {
            let plain = parse_amount(Some(text)).value.unwrap();
            let wrapped = parse_amount(Some(&format!("({text})"))).value.unwrap();
            assert_eq!(wrapped, -plain);
            assert!(parse_amount(Some(&format!("({text})"))).is_negative);
        }
    }

    #[test]
    fn test_malformed_reports_failure() {
        let parsed = parse_amount(Some("12a34"));
        assert!(!parsed.success);
        assert!(parsed.value.is_none());
        assert!(parsed.error.as_deref().unwrap().contains("12a34"));
    }

    #[test]
    fn test_unit_only_is_malformed() {
        let parsed = parse_amount(Some("만원"));
        assert!(!parsed.success);
        assert!(parsed.value.is_none());
    }

    #[test]
    fn test_large_values_keep_precision() {
        let parsed = parse_amount(Some("300,870,903,000,000"));
        assert_eq!(parsed.value, Some(dec!(300870903000000)));
    }
}
