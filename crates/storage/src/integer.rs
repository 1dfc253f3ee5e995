//! Integer coercion for values read back from the database.

use crate::{Error, Result};
use serde_json::Value;

/// Exclusive upper bound of `i64` as a float (2^63). `i64::MAX as f64` rounds up to it.
const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;

/// Coerce a result cell into an integer.
///
/// Accepts native integers (and integral floats, since JSON numbers carry
/// no integer/float distinction) and text whose numeric value is such an
/// integer, e.g. `"42"`, `"5.0"` or `"1e3"`. Anything else, including
/// values outside the `i64` range, fails with [`Error::NotAnInteger`].
pub fn coerce_integer(value: &Value) -> Result<i64> {
    let parsed = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => parse_text(s.trim()),
        _ => None,
    };

    parsed.ok_or_else(|| Error::NotAnInteger {
        value: value.to_string(),
    })
}

fn parse_text(text: &str) -> Option<i64> {
    text.parse::<i64>()
        .ok()
        .or_else(|| text.parse::<f64>().ok().and_then(integral))
}

/// An integral float that fits `i64` exactly.
fn integral(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f >= -I64_UPPER && f < I64_UPPER).then(|| f as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_native_integers() {
        assert_eq!(coerce_integer(&json!(5)).unwrap(), 5);
        assert_eq!(coerce_integer(&json!(-3)).unwrap(), -3);
        assert_eq!(coerce_integer(&json!(0)).unwrap(), 0);
        assert_eq!(coerce_integer(&json!(7.0)).unwrap(), 7);
    }

    #[test]
    fn accepts_numeric_text() {
        assert_eq!(coerce_integer(&json!("42")).unwrap(), 42);
        assert_eq!(coerce_integer(&json!(" 12 ")).unwrap(), 12);
        assert_eq!(coerce_integer(&json!("-8")).unwrap(), -8);
    }

    #[test]
    fn accepts_integral_text_in_any_notation() {
        assert_eq!(coerce_integer(&json!("5.0")).unwrap(), 5);
        assert_eq!(coerce_integer(&json!("1e3")).unwrap(), 1000);
        assert_eq!(coerce_integer(&json!("-2.0")).unwrap(), -2);
    }

    #[test]
    fn text_and_native_numbers_agree() {
        assert_eq!(
            coerce_integer(&json!("7.0")).unwrap(),
            coerce_integer(&json!(7.0)).unwrap()
        );
    }

    #[test]
    fn rejects_values_outside_i64() {
        for value in [
            json!(9223372036854775808u64),
            json!(u64::MAX),
            json!(1e19),
            json!(-1e19),
            json!("9223372036854775808"),
            json!("1e19"),
        ] {
            let err = coerce_integer(&value).unwrap_err();
            assert!(
                matches!(err, Error::NotAnInteger { .. }),
                "expected NotAnInteger for {value}"
            );
        }
    }

    #[test]
    fn keeps_i64_bounds() {
        assert_eq!(coerce_integer(&json!(i64::MAX)).unwrap(), i64::MAX);
        assert_eq!(coerce_integer(&json!(i64::MIN)).unwrap(), i64::MIN);
        assert_eq!(coerce_integer(&json!(i64::MAX.to_string())).unwrap(), i64::MAX);
    }

    #[test]
    fn rejects_everything_else() {
        for value in [
            json!("1.5"),
            json!("abc"),
            json!(""),
            json!("NaN"),
            json!("inf"),
            json!("1e-3"),
            json!(1.5),
            json!(true),
            json!(null),
            json!({"a": 1}),
            json!([1]),
        ] {
            let err = coerce_integer(&value).unwrap_err();
            assert!(
                matches!(err, Error::NotAnInteger { .. }),
                "expected NotAnInteger for {value}"
            );
        }
    }

    #[test]
    fn error_names_the_value() {
        let err = coerce_integer(&json!("x1")).unwrap_err();
        assert_eq!(err.to_string(), r#""x1" is not an integer"#);
    }
}
