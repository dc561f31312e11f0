//! Strict numeric literals.
//!
//! Stored values and command arguments are raw bytes. These helpers accept
//! exactly the canonical forms: no surrounding whitespace, no `+` sign, and
//! no leading zeros for integers.

use bytes::Bytes;

/// Parse a canonical base-10 signed 64-bit integer.
///
/// Rejects empty input, a leading `+`, leading zeros, `-0`, embedded
/// whitespace, and values outside the `i64` range.
pub fn parse_i64_strict(raw: &[u8]) -> Option<i64> {
    if raw == b"0" {
        return Some(0);
    }

    let digits = match raw.split_first() {
        Some((b'-', rest)) => rest,
        _ => raw,
    };
    let (&first, _) = digits.split_first()?;
    if !(b'1'..=b'9').contains(&first) || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }

    std::str::from_utf8(raw).ok()?.parse::<i64>().ok()
}

/// Parse a float literal.
///
/// Leading whitespace, trailing garbage, and NaN are rejected, as are finite
/// literals too large to represent. Explicit infinities parse, and are then
/// refused by the arithmetic that uses them.
pub fn parse_f64_strict(raw: &[u8]) -> Option<f64> {
    let text = std::str::from_utf8(raw).ok()?;
    if text.is_empty() || text.starts_with(|c: char| c.is_ascii_whitespace()) {
        return None;
    }

    let value: f64 = text.parse().ok()?;
    if value.is_nan() {
        return None;
    }
    if value.is_infinite() && !names_infinity(text) {
        return None;
    }
    Some(value)
}

fn names_infinity(text: &str) -> bool {
    let unsigned = text.trim_start_matches(['+', '-']);
    unsigned.eq_ignore_ascii_case("inf") || unsigned.eq_ignore_ascii_case("infinity")
}

/// Render an integer as stored bytes.
pub fn format_i64(value: i64) -> Bytes {
    Bytes::from(value.to_string())
}

/// Significant digits kept when rendering a float. Binary noise past this
/// point (`0.1 + 0.2`) is rounded away.
pub const FLOAT_SIGNIFICANT_DIGITS: usize = 15;

/// Render a float in plain decimal notation, rounded to
/// [`FLOAT_SIGNIFICANT_DIGITS`], without exponent and without trailing zeros.
pub fn format_f64(value: f64) -> Bytes {
    if value == 0.0 {
        return Bytes::from_static(b"0");
    }
    if !value.is_finite() {
        return Bytes::from(value.to_string());
    }

    // `{:e}` yields `[-]d.ddddde[-]x`.
    let sci = format!("{:.*e}", FLOAT_SIGNIFICANT_DIGITS - 1, value);
    let Some((mantissa, exponent)) = sci.split_once('e') else {
        return Bytes::from(value.to_string());
    };
    let Ok(exponent) = exponent.parse::<i64>() else {
        return Bytes::from(value.to_string());
    };
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };

    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let digits = digits.trim_end_matches('0');
    let digits = if digits.is_empty() { "0" } else { digits };

    // Count of digits before the decimal point.
    let point = exponent + 1;
    let mut out = String::from(sign);
    if point <= 0 {
        out.push_str("0.");
        out.extend(std::iter::repeat('0').take(point.unsigned_abs() as usize));
        out.push_str(digits);
    } else if point as usize >= digits.len() {
        out.push_str(digits);
        out.extend(std::iter::repeat('0').take(point as usize - digits.len()));
    } else {
        let (int, frac) = digits.split_at(point as usize);
        out.push_str(int);
        out.push('.');
        out.push_str(frac);
    }
    Bytes::from(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_i64_accepts_canonical() {
        assert_eq!(parse_i64_strict(b"0"), Some(0));
        assert_eq!(parse_i64_strict(b"42"), Some(42));
        assert_eq!(parse_i64_strict(b"-17"), Some(-17));
        assert_eq!(
            parse_i64_strict(b"9223372036854775807"),
            Some(i64::MAX)
        );
        assert_eq!(
            parse_i64_strict(b"-9223372036854775808"),
            Some(i64::MIN)
        );
    }

    #[test]
    fn test_parse_i64_rejects_non_canonical() {
        for raw in [
            &b""[..],
            b"-",
            b"+1",
            b"01",
            b"-0",
            b" 1",
            b"1 ",
            b"1.0",
            b"abc",
            b"9223372036854775808",
            b"-9223372036854775809",
        ] {
            assert_eq!(parse_i64_strict(raw), None, "{:?}", raw);
        }
    }

    #[test]
    fn test_parse_f64() {
        assert_eq!(parse_f64_strict(b"1.5"), Some(1.5));
        assert_eq!(parse_f64_strict(b"-2"), Some(-2.0));
        assert_eq!(parse_f64_strict(b"1e3"), Some(1000.0));
        assert_eq!(parse_f64_strict(b"inf"), Some(f64::INFINITY));
        assert_eq!(parse_f64_strict(b"-Infinity"), Some(f64::NEG_INFINITY));
    }

    #[test]
    fn test_parse_f64_rejects() {
        for raw in [&b""[..], b" 1", b"1 ", b"nan", b"1x", b"1e999", b"\xff"] {
            assert_eq!(parse_f64_strict(raw), None, "{:?}", raw);
        }
    }

    #[test]
    fn test_format_f64_is_plain_decimal() {
        assert_eq!(format_f64(3.0), Bytes::from_static(b"3"));
        assert_eq!(format_f64(10.5), Bytes::from_static(b"10.5"));
        assert_eq!(format_f64(-0.25), Bytes::from_static(b"-0.25"));
        assert_eq!(format_f64(1e21), Bytes::from_static(b"1000000000000000000000"));
        assert_eq!(format_f64(0.00125), Bytes::from_static(b"0.00125"));
        assert_eq!(format_f64(-0.0), Bytes::from_static(b"0"));
    }

    #[test]
    fn test_format_f64_rounds_binary_noise() {
        assert_eq!(format_f64(0.1 + 0.2), Bytes::from_static(b"0.3"));
        assert_eq!(format_f64(1.1 * 3.0), Bytes::from_static(b"3.3"));
        assert_eq!(
            format_f64(123456.789012345),
            Bytes::from_static(b"123456.789012345")
        );
    }

    #[test]
    fn test_format_i64() {
        assert_eq!(format_i64(-8), Bytes::from_static(b"-8"));
    }
}
