//! Test-case data values
//!
//! Literal arguments, expected results and observed results all use this
//! type. It is plain data: no identity, no sharing, no functions. Runtime
//! values cross into it through [`crate::convert`].
//!
//! Equality is structural ([`deep_equal`]):
//! - numbers compare with same-value-zero (NaN equals NaN, `+0` equals `-0`)
//! - sequences compare element-wise, mappings key-wise with order ignored
//! - a sequence never equals a mapping, `null` only equals `null`

use indexmap::IndexMap;
use profai_script::stdlib::json::quote;
use profai_script::value::number_to_string;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::fmt;

/// Whole numbers below this magnitude serialize as JSON integers (2^63)
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Data value
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent value; serializes as `null`
    #[default]
    Undefined,
    Null,
    Bool(bool),
    /// IEEE 754 double, like the script engine's numbers
    Number(f64),
    String(String),
    /// Ordered sequence
    Sequence(Vec<Value>),
    /// String-keyed mapping; order is kept for display only
    Mapping(IndexMap<String, Value>),
}

impl Value {
    pub fn sequence(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Sequence(items.into_iter().collect())
    }

    pub fn mapping<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    /// Short type name for reports
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
        }
    }

    /// Compact JSON text; `undefined` inside containers renders as `null`
    pub fn to_json(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            other => serde_json::to_string(other).unwrap_or_else(|_| "null".to_string()),
        }
    }
}

/// Structural equality used to score test cases
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y || (x.is_nan() && y.is_nan()),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Sequence(xs), Value::Sequence(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| deep_equal(x, y))
        }
        (Value::Mapping(xs), Value::Mapping(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).is_some_and(|y| deep_equal(x, y)))
        }
        _ => false,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        deep_equal(self, other)
    }
}

/// Script-literal text: like compact JSON, but `undefined`, `NaN` and
/// `Infinity` are spelled out and numbers use script formatting
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => f.write_str(&number_to_string(*n)),
            Value::String(s) => f.write_str(&quote(s)),
            Value::Sequence(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Mapping(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}:{}", quote(key), value)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Sequence(items)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::sequence(items.into_iter().map(Value::from)),
            serde_json::Value::Object(entries) => {
                Value::Mapping(entries.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

// ============================================================================
// Serde
// ============================================================================

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Undefined | Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) if !n.is_finite() => serializer.serialize_unit(),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < I64_BOUND => {
                // -0 serializes as 0
                serializer.serialize_i64(*n as i64)
            }
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Mapping(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Value::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, b: bool) -> Result<Value, E> {
        Ok(Value::Bool(b))
    }

    fn visit_i64<E: de::Error>(self, n: i64) -> Result<Value, E> {
        Ok(Value::Number(n as f64))
    }

    fn visit_u64<E: de::Error>(self, n: u64) -> Result<Value, E> {
        Ok(Value::Number(n as f64))
    }

    fn visit_f64<E: de::Error>(self, n: f64) -> Result<Value, E> {
        Ok(Value::Number(n))
    }

    fn visit_str<E: de::Error>(self, s: &str) -> Result<Value, E> {
        Ok(Value::String(s.to_string()))
    }

    fn visit_string<E: de::Error>(self, s: String) -> Result<Value, E> {
        Ok(Value::String(s))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some(item) = access.next_element()? {
            items.push(item);
        }
        Ok(Value::Sequence(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
        let mut entries = IndexMap::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, Value>()? {
            entries.insert(key, value);
        }
        Ok(Value::Mapping(entries))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn json(text: &str) -> Value {
        serde_json::from_str(text).unwrap()
    }

    #[rstest]
    #[case("5", "5", true)]
    #[case("5", "5.0", true)]
    #[case("\"5\"", "5", false)]
    #[case("null", "null", true)]
    #[case("null", "0", false)]
    #[case("[1, [2, 3]]", "[1, [2, 3]]", true)]
    #[case("[1, 2]", "[2, 1]", false)]
    #[case("[1]", "[1, 1]", false)]
    #[case("{\"a\": 1, \"b\": 2}", "{\"b\": 2, \"a\": 1}", true)]
    #[case("{\"a\": 1}", "{\"a\": 1, \"b\": 2}", false)]
    #[case("{\"a\": [1, 2]}", "{\"a\": [1, 2]}", true)]
    #[case("[]", "{}", false)]
    #[case("{\"0\": 1}", "[1]", false)]
    fn test_deep_equal(#[case] a: &str, #[case] b: &str, #[case] expected: bool) {
        assert_eq!(deep_equal(&json(a), &json(b)), expected);
        assert_eq!(deep_equal(&json(b), &json(a)), expected);
    }

    #[test]
    fn test_same_value_zero() {
        assert!(deep_equal(&Value::Number(f64::NAN), &Value::Number(f64::NAN)));
        assert!(deep_equal(&Value::Number(0.0), &Value::Number(-0.0)));
        assert!(!deep_equal(&Value::Undefined, &Value::Null));
    }

    #[test]
    fn test_serialization() {
        let value = Value::mapping([
            ("int", Value::Number(5.0)),
            ("neg_zero", Value::Number(-0.0)),
            ("frac", Value::Number(0.5)),
            ("nan", Value::Number(f64::NAN)),
            ("undef", Value::Undefined),
            ("list", Value::sequence([Value::Bool(true), Value::from("s")])),
        ]);
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"int":5,"neg_zero":0,"frac":0.5,"nan":null,"undef":null,"list":[true,"s"]}"#
        );
    }

    #[test]
    fn test_large_integers_serialize_without_fraction() {
        let value = Value::sequence([
            Value::Number(9_007_199_254_740_992.0),
            Value::Number(-1e18),
            Value::Number(1e300),
        ]);
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            "[9007199254740992,-1000000000000000000,1e300]"
        );
    }

    #[rstest]
    #[case(Value::Undefined, "undefined")]
    #[case(Value::Number(f64::NAN), "NaN")]
    #[case(Value::Number(f64::NEG_INFINITY), "-Infinity")]
    #[case(Value::Number(9_007_199_254_740_992.0), "9007199254740992")]
    #[case(Value::Number(-0.0), "0")]
    #[case(Value::Null, "null")]
    #[case(Value::sequence([Value::Undefined, Value::from("a\"b")]), r#"[undefined,"a\"b"]"#)]
    #[case(Value::mapping([("k", Value::Number(f64::INFINITY))]), r#"{"k":Infinity}"#)]
    fn test_display_spells_out_non_json_values(#[case] value: Value, #[case] expected: &str) {
        assert_eq!(value.to_string(), expected);
    }

    #[test]
    fn test_deserialization_keeps_order() {
        let value = json(r#"{"z": 1, "a": [null, 2.5]}"#);
        let keys: Vec<&String> = value.as_mapping().unwrap().keys().collect();
        assert_eq!(keys, vec!["z", "a"]);
        assert_eq!(value.to_json(), r#"{"z":1,"a":[null,2.5]}"#);
    }
}
