//! Fixed-point amount codec.
//!
//! Every balance and price on the network is an `i64` count of the smallest
//! unit, with [`ONE`] units to a whole coin. Decimal strings are the public
//! form: always exactly [`DECIMALS`] fractional digits on output, at most that
//! many on input. Nothing here touches floating point.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of fractional decimal digits carried by an amount.
pub const DECIMALS: usize = 6;

/// Raw value of one whole unit.
pub const ONE: i64 = 1_000_000;

/// Longest decimal string `parse` will look at. The widest valid value,
/// `-9223372036854.775808`, is 21 characters; the slack leaves room for
/// leading zeros. Anything longer is rejected before any arithmetic.
const MAX_DECIMAL_LEN: usize = 32;

/// Amount codec error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("invalid amount format: {0}")]
    InvalidFormat(&'static str),
}

/// A network amount in raw fixed-point units.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(into = "String", try_from = "String")]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_raw(raw: i64) -> Self {
        Amount(raw)
    }

    pub const fn raw(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format(self.0))
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s).map(Amount)
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        format(amount.0)
    }
}

impl TryFrom<String> for Amount {
    type Error = AmountError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Parse a decimal string such as `"-12.5"` into raw units.
///
/// Accepts an optional leading `-`, one or more digits, and an optional `.`
/// followed by 1 to [`DECIMALS`] digits. The scaled value must fit in an `i64`.
pub fn parse(input: &str) -> Result<i64, AmountError> {
    if input.is_empty() {
        return Err(AmountError::InvalidFormat("empty input"));
    }
    if input.len() > MAX_DECIMAL_LEN {
        return Err(AmountError::InvalidFormat("value out of range"));
    }

    let (negative, unsigned) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => {
            if fraction.is_empty() {
                return Err(AmountError::InvalidFormat("missing fractional digits"));
            }
            (whole, fraction)
        }
        None => (unsigned, ""),
    };

    if whole.is_empty() || !is_digits(whole) || !is_digits(fraction) {
        return Err(AmountError::InvalidFormat("expected decimal digits"));
    }
    if fraction.len() > DECIMALS {
        return Err(AmountError::InvalidFormat("too many fractional digits"));
    }

    // At most 32 + 6 digits, which always fits in an i128.
    let padding = std::iter::repeat(b'0').take(DECIMALS - fraction.len());
    let magnitude = whole
        .bytes()
        .chain(fraction.bytes())
        .chain(padding)
        .fold(0i128, |acc, digit| acc * 10 + i128::from(digit - b'0'));

    let signed = if negative { -magnitude } else { magnitude };
    i64::try_from(signed).map_err(|_| AmountError::InvalidFormat("value out of range"))
}

/// Render raw units as a decimal string with exactly [`DECIMALS`] fractional
/// digits.
pub fn format(raw: i64) -> String {
    let sign = if raw < 0 { "-" } else { "" };
    let magnitude = raw.unsigned_abs();
    let one = ONE.unsigned_abs();
    format!(
        "{sign}{}.{:0width$}",
        magnitude / one,
        magnitude % one,
        width = DECIMALS
    )
}

/// Convert an integer string of raw units, of any length, into the decimal
/// form produced by [`format`].
///
/// Unlike [`parse`] this is not limited to the `i64` range: the conversion is
/// a decimal point shift done on the digits themselves, so its cost is linear
/// in the input length.
pub fn int_string_to_amount(input: &str) -> Result<String, AmountError> {
    let (negative, digits) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };
    if digits.is_empty() {
        return Err(AmountError::InvalidFormat("expected integer digits"));
    }
    // Also rules out exponents and special values such as `1e9`, `Inf`, `nan`.
    if !is_digits(digits) {
        return Err(AmountError::InvalidFormat("expected integer digits"));
    }

    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(format(0));
    }

    let mut out = String::with_capacity(digits.len() + DECIMALS + 3);
    if negative {
        out.push('-');
    }
    if digits.len() > DECIMALS {
        let (whole, fraction) = digits.split_at(digits.len() - DECIMALS);
        out.push_str(whole);
        out.push('.');
        out.push_str(fraction);
    } else {
        out.push_str("0.");
        out.extend(std::iter::repeat('0').take(DECIMALS - digits.len()));
        out.push_str(digits);
    }
    Ok(out)
}

fn is_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CASES: &[(&str, i64, bool)] = &[
        ("1000.000000", 1000000000, true),
        ("-1000.000000", -1000000000, true),
        ("1000.000001", 1000000001, true),
        ("1230.000001", 1230000001, true),
        ("1230.0000001", 0, false),
        ("9223372036854.775807", i64::MAX, true),
        ("9223372036854.775808", 0, false),
        ("9223372036855", 0, false),
        ("-9223372036854.775808", i64::MIN, true),
        ("-9223372036854.775809", 0, false),
        ("-9223372036855", 0, false),
        ("10000000000000.000000", 0, false),
        ("10000000000000", 0, false),
        ("-5.000000", -5000000, true),
        ("5.000000", 5000000, true),
        ("1.2345678", 0, false),
        ("1E9223372036854775807", 0, false),
        ("1e9223372036854775807", 0, false),
        ("Inf", 0, false),
    ];

    #[test]
    fn test_parse() {
        for &(input, expected, valid) in CASES {
            match parse(input) {
                Ok(raw) => {
                    assert!(valid, "expected error for {input}");
                    assert_eq!(raw, expected, "{input}");
                }
                Err(e) => assert!(!valid, "couldn't parse {input}: {e}"),
            }
        }
    }

    #[test]
    fn test_format() {
        for &(expected, raw, valid) in CASES {
            if valid {
                assert_eq!(format(raw), expected);
            }
        }
        assert_eq!(format(0), "0.000000");
        assert_eq!(format(-1), "-0.000001");
    }

    #[test]
    fn test_parse_short_forms() {
        assert_eq!(parse("1").unwrap(), ONE);
        assert_eq!(parse("0.5").unwrap(), ONE / 2);
        assert_eq!(parse("-0").unwrap(), 0);
        assert!(parse("").is_err());
        assert!(parse("-").is_err());
        assert!(parse(".5").is_err());
        assert!(parse("1.").is_err());
        assert!(parse("+1").is_err());
        assert!(parse("1.2.3").is_err());
        assert!(parse(" 1").is_err());
    }

    #[test]
    fn test_parse_rejects_huge_input_quickly() {
        let input = "1".repeat(1_000_000);
        let start = std::time::Instant::now();
        assert_eq!(
            parse(&input),
            Err(AmountError::InvalidFormat("value out of range"))
        );
        assert!(start.elapsed() < std::time::Duration::from_secs(1));
    }

    #[test]
    fn test_int_string_to_amount() {
        let cases = [
            ("1000000000", "1000.000000"),
            ("-1000000000", "-1000.000000"),
            ("1000000001", "1000.000001"),
            ("1230000001", "1230.000001"),
            ("9223372036854775807", "9223372036854.775807"),
            ("9223372036854775808", "9223372036854.775808"),
            ("922337203686", "922337.203686"),
            ("-9223372036854775808", "-9223372036854.775808"),
            ("-9223372036854775809", "-9223372036854.775809"),
            ("-922337203686", "-922337.203686"),
            ("10000000000000000000", "10000000000000.000000"),
            ("0", "0.000000"),
            ("-0", "0.000000"),
            ("42", "0.000042"),
            ("-000123", "-0.000123"),
        ];
        for (input, expected) in cases {
            assert_eq!(int_string_to_amount(input).unwrap(), expected, "{input}");
        }

        let big = format!("1{}", "0".repeat(20));
        assert_eq!(
            int_string_to_amount(&big).unwrap(),
            format!("1{}.000000", "0".repeat(14))
        );
        let huge = format!("1{}", "0".repeat(1_000_000));
        assert_eq!(
            int_string_to_amount(&huge).unwrap(),
            format!("1{}.000000", "0".repeat(1_000_000 - DECIMALS))
        );
    }

    #[test]
    fn test_int_string_to_amount_invalid() {
        for input in ["nan", "", "-", "1E9223372036854775807", "1e9223372036854775807", "Inf", "1.5", "+1"] {
            assert!(int_string_to_amount(input).is_err(), "{input}");
        }
    }

    #[test]
    fn test_entry_points_have_different_ranges() {
        assert!(int_string_to_amount("9223372036854775808").is_ok());
        assert!(parse("9223372036854.775808").is_err());
    }

    #[test]
    fn test_amount_serde_as_string() {
        let amount: Amount = "12.5".parse().unwrap();
        assert_eq!(serde_json::to_string(&amount).unwrap(), "\"12.500000\"");
        let back: Amount = serde_json::from_str("\"12.500000\"").unwrap();
        assert_eq!(back, amount);
        assert!(serde_json::from_str::<Amount>("\"12.5000001\"").is_err());
    }

    proptest! {
        #[test]
        fn format_then_parse_round_trips(raw in any::<i64>()) {
            prop_assert_eq!(parse(&format(raw)).unwrap(), raw);
        }

        #[test]
        fn int_string_agrees_with_format(raw in any::<i64>()) {
            prop_assert_eq!(int_string_to_amount(&raw.to_string()).unwrap(), format(raw));
        }

        #[test]
        fn canonical_rendering_is_stable(whole in 0i64..9_223_372_036_854, fraction in "[0-9]{1,6}") {
            let input = format!("{whole}.{fraction}");
            let canonical = format(parse(&input).unwrap());
            prop_assert_eq!(format(parse(&canonical).unwrap()), canonical);
        }
    }
}
