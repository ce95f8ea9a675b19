//! Value Formatting
//!
//! Renders fetched values for display:
//! - `format_currency`: magnitude-abbreviated dollar amounts
//! - `format_time` / `format_clock`: zero-padded 24-hour timestamps
//! - `display_value`: plain string form of any JSON value
//!
//! Numeric parsing is lenient: the longest numeric prefix of a string
//! counts (`"42.5 USD"` is 42.5), so feeds that quote their numbers still
//! chart and format.

use chrono::Timelike;
use serde_json::Value;

/// Shown wherever a selected path does not resolve
pub const MISSING_PLACEHOLDER: &str = "N/A";

/// Lenient numeric reading of a JSON value
///
/// Numbers are taken as-is; strings are parsed by their longest numeric
/// prefix after leading whitespace; an array reads as its first element.
/// Booleans, `null`, objects, and non-finite results are not numeric.
pub fn numeric_value(value: &Value) -> Option<f64> {
    let num = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_float_lenient(s),
        Value::Array(items) => items.first().and_then(numeric_value),
        Value::Null | Value::Bool(_) | Value::Object(_) => None,
    }?;

    num.is_finite().then_some(num)
}

/// Parse the longest decimal prefix of `input`
///
/// Accepts an optional sign, digits with an optional fraction, and an
/// optional exponent. Trailing garbage is ignored.
pub fn parse_float_lenient(input: &str) -> Option<f64> {
    let s = input.trim_start();
    let bytes = s.as_bytes();
    let len = bytes.len();
    let count_digits = |from: usize| bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count();

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }

    let int_digits = count_digits(end);
    end += int_digits;
    let mut mantissa_digits = int_digits;

    if end < len && bytes[end] == b'.' {
        let frac_digits = count_digits(end + 1);
        if int_digits + frac_digits > 0 {
            end += 1 + frac_digits;
            mantissa_digits += frac_digits;
        }
    }

    if mantissa_digits == 0 {
        return None;
    }

    if end < len && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < len && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits = count_digits(exp_end);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    s[..end].parse::<f64>().ok()
}

/// Render a value as an abbreviated currency amount
///
/// Values that do not read as numbers come back in their string form.
pub fn format_currency(value: &Value) -> String {
    match numeric_value(value) {
        Some(num) => format_amount(num),
        None => display_value(value),
    }
}

/// [`format_currency`] for a path that may not have resolved
pub fn format_currency_opt(value: Option<&Value>) -> String {
    value
        .map(format_currency)
        .unwrap_or_else(|| MISSING_PLACEHOLDER.to_string())
}

/// Abbreviate a number: B / M / K above a thousand, six decimals below one
pub fn format_amount(num: f64) -> String {
    if num >= 1_000_000_000.0 {
        format!("${:.2}B", round_half_up(num / 1_000_000_000.0, 2))
    } else if num >= 1_000_000.0 {
        format!("${:.2}M", round_half_up(num / 1_000_000.0, 2))
    } else if num >= 1_000.0 {
        format!("${:.2}K", round_half_up(num / 1_000.0, 2))
    } else if num > 0.0 && num < 1.0 {
        format!("${:.6}", round_half_up(num, 6))
    } else {
        format!("${}", group_thousands(&format!("{:.2}", round_half_up(num, 2))))
    }
}

/// Round to `decimals` places with ties away from zero
///
/// `{:.N}` alone rounds exact ties to even (`1.125` would show as `1.12`).
fn round_half_up(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Insert `,` separators into the integer part of a plain decimal string
fn group_thousands(formatted: &str) -> String {
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

/// Plain string form of a value
///
/// Strings are shown without quotes, integral numbers without a fraction,
/// containers as compact JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => {
                format!("{}", f as i64)
            }
            _ => n.to_string(),
        },
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// [`display_value`] for a path that may not have resolved
pub fn display_value_opt(value: Option<&Value>) -> String {
    value
        .map(display_value)
        .unwrap_or_else(|| MISSING_PLACEHOLDER.to_string())
}

/// Zero-padded 24-hour `HH:MM`
pub fn format_time<T: Timelike>(time: &T) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}

/// Zero-padded 24-hour `HH:MM:SS`, used for "last updated" stamps
pub fn format_clock<T: Timelike>(time: &T) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        time.hour(),
        time.minute(),
        time.second()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use serde_json::json;

    #[test]
    fn test_format_currency_examples() {
        assert_eq!(format_currency(&json!(999)), "$999.00");
        assert_eq!(format_currency(&json!(1500)), "$1.50K");
        assert_eq!(format_currency(&json!(2_500_000)), "$2.50M");
        assert_eq!(format_currency(&json!(0.0000123)), "$0.000012");
        assert_eq!(format_currency(&json!("abc")), "abc");
    }

    #[test]
    fn test_format_currency_ranges() {
        assert_eq!(format_currency(&json!(3_210_000_000u64)), "$3.21B");
        assert_eq!(format_currency(&json!(0)), "$0.00");
        assert_eq!(format_currency(&json!(1)), "$1.00");
        assert_eq!(format_currency(&json!(0.5)), "$0.500000");
        assert_eq!(format_currency(&json!(-1234.5)), "$-1,234.50");
        assert_eq!(format_currency(&json!(-12)), "$-12.00");
    }

    #[test]
    fn test_format_currency_rounds_ties_up() {
        assert_eq!(format_currency(&json!(1125)), "$1.13K");
        assert_eq!(format_currency(&json!(2_125_000)), "$2.13M");
        assert_eq!(format_currency(&json!(10.125)), "$10.13");
        assert_eq!(format_currency(&json!(-10.125)), "$-10.13");
    }

    #[test]
    fn test_format_currency_lenient_strings() {
        assert_eq!(format_currency(&json!("1500")), "$1.50K");
        assert_eq!(format_currency(&json!("  42.5 USD")), "$42.50");
        assert_eq!(format_currency(&json!(["7"])), "$7.00");
        assert_eq!(format_currency(&json!(true)), "true");
        assert_eq!(format_currency(&Value::Null), "null");
        assert_eq!(format_currency_opt(None), MISSING_PLACEHOLDER);
    }

    #[test]
    fn test_parse_float_lenient() {
        assert_eq!(parse_float_lenient("12abc"), Some(12.0));
        assert_eq!(parse_float_lenient(".5"), Some(0.5));
        assert_eq!(parse_float_lenient("-3.25e2x"), Some(-325.0));
        assert_eq!(parse_float_lenient("1e"), Some(1.0));
        assert_eq!(parse_float_lenient("0x10"), Some(0.0));
        assert_eq!(parse_float_lenient("abc"), None);
        assert_eq!(parse_float_lenient("."), None);
        assert_eq!(parse_float_lenient("-"), None);
        assert_eq!(parse_float_lenient(""), None);
    }

    #[test]
    fn test_non_finite_is_not_numeric() {
        assert_eq!(numeric_value(&json!("1e999")), None);
        assert_eq!(format_currency(&json!("1e999")), "1e999");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("999.00"), "999.00");
        assert_eq!(group_thousands("-1234567.89"), "-1,234,567.89");
        assert_eq!(group_thousands("100"), "100");
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&json!("BTC")), "BTC");
        assert_eq!(display_value(&json!(1.0)), "1");
        assert_eq!(display_value(&json!(1.25)), "1.25");
        assert_eq!(display_value(&json!({"a": 1})), r#"{"a":1}"#);
        assert_eq!(display_value_opt(None), MISSING_PLACEHOLDER);
    }

    #[test]
    fn test_format_time() {
        let t = NaiveTime::from_hms_opt(7, 5, 9).unwrap();
        assert_eq!(format_time(&t), "07:05");
        assert_eq!(format_clock(&t), "07:05:09");

        let t = NaiveTime::from_hms_opt(23, 59, 0).unwrap();
        assert_eq!(format_time(&t), "23:59");
    }
}
