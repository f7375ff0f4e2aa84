//! Integer, double and boolean conversions between strings and values.

/// Parses an integer: optional surrounding whitespace, optional sign and an
/// optional `0x`/`0o`/`0b` base prefix. Prefixed forms accept the full
/// unsigned 64-bit range and wrap into `i64`; decimal must fit `i64`.
pub fn parse_int(s: &str) -> Option<i64> {
    let t = s.trim_matches(is_space);
    let (neg, body) = match t.as_bytes().first()? {
        b'-' => (true, &t[1..]),
        b'+' => (false, &t[1..]),
        _ => (false, t),
    };
    let (radix, digits) = match body.as_bytes() {
        [b'0', b'x' | b'X', ..] => (16, &body[2..]),
        [b'0', b'o' | b'O', ..] => (8, &body[2..]),
        [b'0', b'b' | b'B', ..] => (2, &body[2..]),
        _ => (10, body),
    };
    if digits.is_empty() || !digits.bytes().all(|b| (b as char).is_digit(radix)) {
        return None;
    }
    if radix == 10 {
        let magnitude: u64 = digits.parse().ok()?;
        if neg {
            if magnitude > i64::MAX as u64 + 1 {
                return None;
            }
            Some((magnitude as i64).wrapping_neg())
        } else {
            i64::try_from(magnitude).ok()
        }
    } else {
        let magnitude = u64::from_str_radix(digits, radix).ok()? as i64;
        Some(if neg { magnitude.wrapping_neg() } else { magnitude })
    }
}

/// Parses a double. Base prefixes are integer-only syntax and are rejected
/// here; use [`parse_int`] first when either form is acceptable.
pub fn parse_double(s: &str) -> Option<f64> {
    let t = s.trim_matches(is_space);
    let unsigned = t.trim_start_matches(['+', '-']);
    if unsigned.len() > 1 && unsigned.as_bytes()[0] == b'0' && unsigned.as_bytes()[1].is_ascii_alphabetic() {
        if !matches!(unsigned.as_bytes()[1], b'e' | b'E') {
            return None;
        }
    }
    if t.is_empty() || t.ends_with(['+', '-']) {
        return None;
    }
    t.parse::<f64>().ok()
}

pub fn parse_bool(s: &str) -> Option<bool> {
    let t = s.trim_matches(is_space);
    if let Some(i) = parse_int(t) {
        return Some(i != 0);
    }
    if let Some(d) = parse_double(t) {
        return Some(d != 0.0);
    }
    match t.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c')
}

/// The canonical string form of a double: `%.12g`, with `.0` appended when
/// the result would otherwise read as an integer.
pub fn format_double(d: f64) -> String {
    if d.is_nan() {
        return "NaN".to_string();
    }
    if d.is_infinite() {
        return if d > 0.0 { "Inf".to_string() } else { "-Inf".to_string() };
    }
    let mut s = format_g(d, 12, false, false);
    if !s.contains(['.', 'e', 'n', 'N', 'i', 'I']) {
        s.push_str(".0");
    }
    s
}

/// C-style `%g`: `precision` significant digits, exponent form when the
/// exponent is below -4 or at least the precision. `alt` keeps trailing
/// zeros (the `#` flag).
pub fn format_g(d: f64, precision: usize, alt: bool, upper: bool) -> String {
    if !d.is_finite() {
        return format_special(d, upper);
    }
    let p = precision.max(1);
    let exp = if d == 0.0 { 0 } else { decimal_exponent(d, p) };
    let mut s = if exp < -4 || exp >= p as i32 {
        format_e(d, p - 1, upper)
    } else {
        format!("{:.*}", (p as i32 - 1 - exp).max(0) as usize, d)
    };
    if !alt {
        s = strip_fraction_zeros(&s);
    } else if !s.contains('.') {
        // `%#g` always shows the decimal point.
        match s.find(['e', 'E']) {
            Some(pos) => s.insert(pos, '.'),
            None => s.push('.'),
        }
    }
    s
}

/// C-style `%e` with `precision` fraction digits and a signed, at least
/// two-digit exponent.
pub fn format_e(d: f64, precision: usize, upper: bool) -> String {
    if !d.is_finite() {
        return format_special(d, upper);
    }
    let raw = format!("{:.*e}", precision, d);
    let (mantissa, exp) = raw.split_once('e').unwrap_or((raw.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let sign = if exp < 0 { '-' } else { '+' };
    let e = if upper { 'E' } else { 'e' };
    format!("{mantissa}{e}{sign}{:02}", exp.abs())
}

fn format_special(d: f64, upper: bool) -> String {
    let s = if d.is_nan() {
        "nan"
    } else if d > 0.0 {
        "inf"
    } else {
        "-inf"
    };
    if upper { s.to_ascii_uppercase() } else { s.to_string() }
}

/// Exponent of `d` after rounding to `digits` significant digits.
fn decimal_exponent(d: f64, digits: usize) -> i32 {
    let raw = format!("{:.*e}", digits - 1, d);
    raw.split_once('e').and_then(|(_, e)| e.parse().ok()).unwrap_or(0)
}

fn strip_fraction_zeros(s: &str) -> String {
    let (mantissa, exp) = match s.find(['e', 'E']) {
        Some(pos) => (&s[..pos], &s[pos..]),
        None => (s, ""),
    };
    if !mantissa.contains('.') {
        return s.to_string();
    }
    let trimmed = mantissa.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed}{exp}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ints_with_prefixes_and_whitespace() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("  -17 "), Some(-17));
        assert_eq!(parse_int("+5"), Some(5));
        assert_eq!(parse_int("0x1F"), Some(31));
        assert_eq!(parse_int("-0x10"), Some(-16));
        assert_eq!(parse_int("0o17"), Some(15));
        assert_eq!(parse_int("0b101"), Some(5));
        assert_eq!(parse_int("0xffffffffffffffff"), Some(-1));
        assert_eq!(parse_int("010"), Some(10));
    }

    #[test]
    fn int_rejects() {
        assert_eq!(parse_int(""), None);
        assert_eq!(parse_int("-"), None);
        assert_eq!(parse_int("0x"), None);
        assert_eq!(parse_int("1.5"), None);
        assert_eq!(parse_int("12abc"), None);
        assert_eq!(parse_int("1 2"), None);
        assert_eq!(parse_int("99999999999999999999"), None);
    }

    #[test]
    fn int_extremes() {
        assert_eq!(parse_int("9223372036854775807"), Some(i64::MAX));
        assert_eq!(parse_int("-9223372036854775808"), Some(i64::MIN));
        assert_eq!(parse_int("9223372036854775808"), None);
    }

    #[test]
    fn doubles() {
        assert_eq!(parse_double("1.5"), Some(1.5));
        assert_eq!(parse_double(" 2e3 "), Some(2000.0));
        assert_eq!(parse_double(".5"), Some(0.5));
        assert_eq!(parse_double("-Inf"), Some(f64::NEG_INFINITY));
        assert!(parse_double("NaN").is_some_and(f64::is_nan));
        assert_eq!(parse_double("0x10"), None);
        assert_eq!(parse_double("0x1.8"), None);
        assert_eq!(parse_double("abc"), None);
        assert_eq!(parse_double(""), None);
        assert_eq!(parse_double("0e5"), Some(0.0));
    }

    #[test]
    fn booleans() {
        for t in ["1", "true", "YES", "On", "5", "0.5"] {
            assert_eq!(parse_bool(t), Some(true), "{t}");
        }
        for f in ["0", "false", "no", "OFF", "0.0"] {
            assert_eq!(parse_bool(f), Some(false), "{f}");
        }
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn canonical_double_strings() {
        assert_eq!(format_double(1.0), "1.0");
        assert_eq!(format_double(0.1), "0.1");
        assert_eq!(format_double(1.5), "1.5");
        assert_eq!(format_double(-2.25), "-2.25");
        assert_eq!(format_double(1e20), "1e+20");
        assert_eq!(format_double(1.0 / 3.0), "0.333333333333");
        assert_eq!(format_double(f64::INFINITY), "Inf");
        assert_eq!(format_double(f64::NEG_INFINITY), "-Inf");
        assert_eq!(format_double(f64::NAN), "NaN");
        assert_eq!(format_double(0.0), "0.0");
    }

    #[test]
    fn percent_g() {
        assert_eq!(format_g(100000.0, 6, false, false), "100000");
        assert_eq!(format_g(1000000.0, 6, false, false), "1e+06");
        assert_eq!(format_g(0.0001, 6, false, false), "0.0001");
        assert_eq!(format_g(0.00001, 6, false, false), "1e-05");
        assert_eq!(format_g(1.5, 6, true, false), "1.50000");
        assert_eq!(format_g(2.0, 6, false, true), "2");
    }

    #[test]
    fn percent_e() {
        assert_eq!(format_e(1234.5, 2, false), "1.23e+03");
        assert_eq!(format_e(0.00012, 1, true), "1.2E-04");
    }
}
