use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;

/// Scalar value stored in a dataset row.
///
/// Submission exports are loosely typed: the same column can carry numbers, numeric strings,
/// dates formatted as text, or nothing at all. `Value` keeps the original shape and exposes the
/// two coercions the report pipeline needs (see [`Value::as_text`] and [`Value::coerce_number`]).
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Blank,
    Number(f64),
    Text(String),
}

impl Value {
    pub fn is_blank(&self) -> bool {
        matches!(self, Value::Blank)
    }

    /// String coercion used for grouping and filter membership.
    ///
    /// Integral numbers are printed without a fractional part (`3.0` -> `"3"`) so a numeric
    /// column groups the same way whether it arrived as `3` or `"3"`. Blank values have no text.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Blank => None,
            Value::Text(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Number(n) => Some(Cow::Owned(format_number(*n))),
        }
    }

    /// String coercion with a caller-supplied literal for blank values.
    pub fn text_or(&self, fallback: &str) -> String {
        self.as_text()
            .map(Cow::into_owned)
            .unwrap_or_else(|| fallback.to_string())
    }

    /// Numeric coercion used for measures. Never returns NaN or an infinity: anything that is not
    /// a finite number (blank, unparseable text, NaN payloads) coerces to `0`.
    pub fn coerce_number(&self) -> f64 {
        let n = match self {
            Value::Blank => 0.0,
            Value::Number(n) => *n,
            Value::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        };
        if n.is_finite() {
            n
        } else {
            0.0
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        // Normalize -0 to 0.
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) => f.write_str(&text),
            None => Ok(()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(value as f64)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Blank)
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Blank => serializer.serialize_none(),
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Text(s) => serializer.serialize_str(s),
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, number, boolean or null")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Text(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Number(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::Number(v as f64))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Number(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::Text(v))
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Blank)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Blank)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn integral_numbers_coerce_to_text_without_fraction() {
        assert_eq!(Value::from(3.0).text_or("N/A"), "3");
        assert_eq!(Value::from(-0.0).text_or("N/A"), "0");
        assert_eq!(Value::from(2.5).text_or("N/A"), "2.5");
        assert_eq!(Value::Blank.text_or("N/A"), "N/A");
    }

    #[test]
    fn numeric_coercion_never_yields_nan() {
        assert_eq!(Value::from("  12.5 ").coerce_number(), 12.5);
        assert_eq!(Value::from("abc").coerce_number(), 0.0);
        assert_eq!(Value::from("NaN").coerce_number(), 0.0);
        assert_eq!(Value::from(f64::INFINITY).coerce_number(), 0.0);
        assert_eq!(Value::Blank.coerce_number(), 0.0);
    }

    #[test]
    fn deserializes_loose_json_scalars() {
        let values: Vec<Value> =
            serde_json::from_value(json!(["a", 1, 2.5, true, null])).unwrap();
        assert_eq!(
            values,
            vec![
                Value::from("a"),
                Value::from(1.0),
                Value::from(2.5),
                Value::from("true"),
                Value::Blank,
            ]
        );
    }
}
