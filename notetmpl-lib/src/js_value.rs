//! Loosely typed operations on `serde_json::Value` as template authors know
//! them from Handlebars: numeric conversion, loose and strict equality,
//! relational comparison and truthiness.
//!
//! ```rust
//! use notetmpl_lib::js_value::*;
//! use serde_json::json;
//!
//! assert!(loose_eq(&json!("20"), &json!(20)));
//! assert!(!strict_eq(&json!("20"), &json!(20)));
//! assert_eq!(parse_float(&json!("5.5 kg")), 5.5);
//! assert_eq!(number_value(44.0), json!(44));
//! assert_eq!(number_value(1.0 / 0.0), json!("Infinity"));
//! ```
use serde_json::Value;
use std::cmp::Ordering;

/// Converts a value into a string, `null` becomes `"null"`, arrays are
/// joined with `,`.
pub fn to_js_string(v: &Value) -> String {
    match v {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => number_to_string(f),
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(a) => a
            .iter()
            .map(|v| match v {
                Value::Null => String::new(),
                v => to_js_string(v),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Prints `f` without a trailing `.0` for integral values.
pub fn number_to_string(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if f.fract() == 0.0 && f.abs() < 1e21 {
        format!("{}", f as i128)
    } else {
        format!("{f}")
    }
}

/// Wraps a computed number into a value that renders like a number
/// should: integral numbers without fraction, non finite numbers as text.
pub fn number_value(f: f64) -> Value {
    if !f.is_finite() {
        Value::String(number_to_string(f))
    } else if f.fract() == 0.0 && f.abs() <= i64::MAX as f64 {
        Value::from(f as i64)
    } else {
        Value::from(f)
    }
}

/// Length of the longest prefix of `s` that reads as a decimal number.
fn numeric_prefix_len(s: &str) -> usize {
    let b = s.as_bytes();
    let mut i = 0;
    if i < b.len() && (b[i] == b'+' || b[i] == b'-') {
        i += 1;
    }
    let int_start = i;
    while i < b.len() && b[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;
    if i < b.len() && b[i] == b'.' {
        let frac_start = i + 1;
        let mut j = frac_start;
        while j < b.len() && b[j].is_ascii_digit() {
            j += 1;
        }
        digits += j - frac_start;
        if digits > 0 {
            i = j;
        }
    }
    if digits == 0 {
        return 0;
    }
    if i < b.len() && (b[i] == b'e' || b[i] == b'E') {
        let mut j = i + 1;
        if j < b.len() && (b[j] == b'+' || b[j] == b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < b.len() && b[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }
    i
}

/// Reads the leading number of a string, ignoring what follows:
/// `"12px"` is `12`, `"abc"` is `NaN`. Booleans and `null` are `NaN`.
pub fn parse_float(v: &Value) -> f64 {
    match v {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::Bool(_) | Value::Null | Value::Object(_) => f64::NAN,
        v => parse_float_str(&to_js_string(v)),
    }
}

pub fn parse_float_str(s: &str) -> f64 {
    let s = s.trim_start();
    for (prefix, value) in [
        ("Infinity", f64::INFINITY),
        ("+Infinity", f64::INFINITY),
        ("-Infinity", f64::NEG_INFINITY),
    ] {
        if s.starts_with(prefix) {
            return value;
        }
    }
    match numeric_prefix_len(s) {
        0 => f64::NAN,
        n => s[..n].parse().unwrap_or(f64::NAN),
    }
}

/// Reads the leading integer: `"3.7"` is `3`, `"x"` is `None`.
pub fn parse_int(v: &Value) -> Option<i64> {
    let s = match v {
        Value::Number(n) if n.is_f64() => {
            let f = n.as_f64()?;
            return f.is_finite().then_some(f.trunc() as i64);
        }
        Value::Bool(_) | Value::Null | Value::Object(_) => return None,
        v => to_js_string(v),
    };
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let len = digits.bytes().take_while(|b| b.is_ascii_digit()).count();
    if len == 0 {
        return None;
    }
    let n: i64 = digits[..len].parse().unwrap_or(i64::MAX);
    Some(if negative { -n } else { n })
}

/// Numeric conversion of a whole value: `""` is `0`, `"12px"` is `NaN`,
/// `true` is `1`, `null` is `0`.
pub fn to_number(v: &Value) -> f64 {
    match v {
        Value::Null => 0.0,
        Value::Bool(b) => *b as u8 as f64,
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => string_to_number(s),
        Value::Array(_) => string_to_number(&to_js_string(v)),
        Value::Object(_) => f64::NAN,
    }
}

fn string_to_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16)
            .map(|n| n as f64)
            .unwrap_or(f64::NAN);
    }
    if numeric_prefix_len(s) == s.len() {
        s.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

/// `false`, `0`, `NaN`, `""` and `null` are false, all the rest is true.
pub fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Equality with type coercion (`==`).
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Number(_), Value::Number(_)) => to_number(a) == to_number(b),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Bool(x), _) => loose_eq(&Value::from(*x as u8), b),
        (_, Value::Bool(y)) => loose_eq(a, &Value::from(*y as u8)),
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
            to_number(a) == to_number(b)
        }
        (Value::Array(_) | Value::Object(_), Value::Array(_) | Value::Object(_)) => a == b,
        (Value::Array(_) | Value::Object(_), _) => {
            loose_eq(&Value::String(to_js_string(a)), b)
        }
        (_, Value::Array(_) | Value::Object(_)) => {
            loose_eq(a, &Value::String(to_js_string(b)))
        }
    }
}

/// Equality without type coercion (`===`).
pub fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => to_number(a) == to_number(b),
        _ => a == b,
    }
}

/// Relational order: two strings compare as text, everything else
/// numerically. `None` when a side is `NaN`.
pub fn js_partial_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    let prim = |v: &Value| match v {
        Value::Array(_) | Value::Object(_) => Value::String(to_js_string(v)),
        v => v.clone(),
    };
    match (prim(a), prim(b)) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(&y)),
        (x, y) => to_number(&x).partial_cmp(&to_number(&y)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_float(&json!(11)), 11.0);
        assert_eq!(parse_float(&json!("4")), 4.0);
        assert_eq!(parse_float(&json!(" -1.5e2x")), -150.0);
        assert_eq!(parse_float(&json!(".5")), 0.5);
        assert_eq!(parse_float(&json!("1e")), 1.0);
        assert_eq!(parse_float(&json!("Infinity")), f64::INFINITY);
        assert_eq!(parse_float(&json!([7, 8])), 7.0);
        assert!(parse_float(&json!("abc")).is_nan());
        assert!(parse_float(&json!("")).is_nan());
        assert!(parse_float(&json!(".")).is_nan());
        assert!(parse_float(&json!(true)).is_nan());
        assert!(parse_float(&Value::Null).is_nan());
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int(&json!(3)), Some(3));
        assert_eq!(parse_int(&json!(3.7)), Some(3));
        assert_eq!(parse_int(&json!("3.7")), Some(3));
        assert_eq!(parse_int(&json!(" -2x")), Some(-2));
        assert_eq!(parse_int(&json!("x")), None);
        assert_eq!(parse_int(&json!(false)), None);
    }

    #[test]
    fn test_to_number() {
        assert_eq!(to_number(&json!("")), 0.0);
        assert_eq!(to_number(&json!(" 12 ")), 12.0);
        assert_eq!(to_number(&json!("0x10")), 16.0);
        assert_eq!(to_number(&json!(true)), 1.0);
        assert_eq!(to_number(&Value::Null), 0.0);
        assert!(to_number(&json!("12px")).is_nan());
        assert!(to_number(&json!("inf")).is_nan());
    }

    #[test]
    fn test_equality() {
        assert!(loose_eq(&json!("val1"), &json!("val1")));
        assert!(loose_eq(&json!(1), &json!(true)));
        assert!(loose_eq(&json!("1"), &json!(true)));
        assert!(loose_eq(&json!(""), &json!(false)));
        assert!(loose_eq(&json!("false"), &json!("false")));
        assert!(!loose_eq(&json!("false"), &json!(false)));
        assert!(loose_eq(&json!(1.0), &json!(1)));
        assert!(loose_eq(&json!([2]), &json!(2)));
        assert!(!loose_eq(&Value::Null, &json!(0)));
        assert!(!loose_eq(&json!("NaN"), &json!("nan")));
        assert!(!loose_eq(&json!("abc"), &json!(0)));

        assert!(strict_eq(&json!(1.0), &json!(1)));
        assert!(!strict_eq(&json!("1"), &json!(1)));
        assert!(!strict_eq(&json!(false), &json!(0)));
        assert!(strict_eq(&json!(false), &json!(false)));
    }

    #[test]
    fn test_ordering() {
        assert_eq!(js_partial_cmp(&json!(20), &json!(40)), Some(Ordering::Less));
        assert_eq!(js_partial_cmp(&json!("20"), &json!(40)), Some(Ordering::Less));
        // Text comparison.
        assert_eq!(
            js_partial_cmp(&json!("20"), &json!("4")),
            Some(Ordering::Less)
        );
        assert_eq!(js_partial_cmp(&json!("abc"), &json!(4)), None);
        assert_eq!(
            js_partial_cmp(&json!(true), &json!(0)),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn test_truthy() {
        for v in [json!(false), json!(0), json!(0.0), json!(""), Value::Null] {
            assert!(!truthy(&v), "{v}");
        }
        for v in [json!(true), json!(-1), json!("0"), json!("false"), json!([]), json!({})] {
            assert!(truthy(&v), "{v}");
        }
    }

    #[test]
    fn test_number_output() {
        assert_eq!(number_value(15.0), json!(15));
        assert_eq!(number_value(5.5), json!(5.5));
        assert_eq!(number_value(-0.0), json!(0));
        assert_eq!(number_value(f64::NEG_INFINITY), json!("-Infinity"));
        assert_eq!(number_value(f64::NAN), json!("NaN"));
        assert_eq!(to_js_string(&json!(5.5)), "5.5");
        assert_eq!(to_js_string(&json!(2.0)), "2");
        assert_eq!(to_js_string(&json!([1, null, "a"])), "1,,a");
        assert_eq!(to_js_string(&Value::Null), "null");
    }
}
