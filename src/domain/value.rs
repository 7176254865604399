//! OTLP `AnyValue` as a tagged sum type, per the "dynamic-typing -> tagged variants"
//! design note: no generic dynamic-value type, exhaustive match everywhere.

use opentelemetry_proto::tonic::common::v1::{any_value, AnyValue as WireAnyValue, KeyValue};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, PartialEq)]
pub enum AnyValue {
    String(String),
    Int(i64),
    Double(f64),
    Bool(bool),
    Bytes(Vec<u8>),
    Array(Vec<AnyValue>),
    KvList(Vec<(String, AnyValue)>),
}

/// The five promotable value-type names used throughout the promotion policy and
/// the typed attribute tables. `Array`/`KvList` never reach this type — they are
/// always routed to the catch-all before a `ValueType` is even consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    String,
    Int,
    Double,
    Bool,
    Bytes,
}

impl ValueType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Double => "double",
            Self::Bool => "bool",
            Self::Bytes => "bytes",
        }
    }
}

impl AnyValue {
    /// Whether this value is a "complex" type that is never promotable and is
    /// always routed to the catch-all JSON map, regardless of promotion policy.
    #[must_use]
    pub const fn is_complex(&self) -> bool {
        matches!(self, Self::Array(_) | Self::KvList(_))
    }

    /// The promotable value type, or `None` for complex types.
    #[must_use]
    pub const fn value_type(&self) -> Option<ValueType> {
        match self {
            Self::String(_) => Some(ValueType::String),
            Self::Int(_) => Some(ValueType::Int),
            Self::Double(_) => Some(ValueType::Double),
            Self::Bool(_) => Some(ValueType::Bool),
            Self::Bytes(_) => Some(ValueType::Bytes),
            Self::Array(_) | Self::KvList(_) => None,
        }
    }

    /// Deterministic JSON rendering used both for the catch-all column and for
    /// canonical hashing (resource/scope identity).
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::String(s) => JsonValue::String(s.clone()),
            Self::Int(i) => JsonValue::Number((*i).into()),
            Self::Double(d) => serde_json::Number::from_f64(*d)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Bytes(b) => JsonValue::String(hex::encode(b)),
            Self::Array(items) => JsonValue::Array(items.iter().map(AnyValue::to_json).collect()),
            Self::KvList(pairs) => {
                let mut map = serde_json::Map::new();
                for (k, v) in pairs {
                    map.insert(k.clone(), v.to_json());
                }
                JsonValue::Object(map)
            }
        }
    }
}

impl From<&WireAnyValue> for AnyValue {
    fn from(value: &WireAnyValue) -> Self {
        match &value.value {
            Some(any_value::Value::StringValue(s)) => Self::String(s.clone()),
            Some(any_value::Value::IntValue(i)) => Self::Int(*i),
            Some(any_value::Value::DoubleValue(d)) => Self::Double(*d),
            Some(any_value::Value::BoolValue(b)) => Self::Bool(*b),
            Some(any_value::Value::BytesValue(b)) => Self::Bytes(b.clone()),
            Some(any_value::Value::ArrayValue(arr)) => {
                Self::Array(arr.values.iter().map(AnyValue::from).collect())
            }
            Some(any_value::Value::KvlistValue(kv)) => Self::KvList(
                kv.values
                    .iter()
                    .filter_map(|pair| pair.value.as_ref().map(|v| (pair.key.clone(), AnyValue::from(v))))
                    .collect(),
            ),
            None => Self::String(String::new()),
        }
    }
}

/// Converts an OTLP `KeyValue` list into `(key, AnyValue)` pairs, dropping entries
/// whose value is entirely absent on the wire (protocol allows `value: None`).
#[must_use]
pub fn convert_key_values(kvs: &[KeyValue]) -> Vec<(String, AnyValue)> {
    kvs.iter()
        .filter_map(|kv| kv.value.as_ref().map(|v| (kv.key.clone(), AnyValue::from(v))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_value_type_and_json() {
        let v = AnyValue::String("hello".into());
        assert_eq!(v.value_type(), Some(ValueType::String));
        assert!(!v.is_complex());
        assert_eq!(v.to_json(), JsonValue::String("hello".into()));
    }

    #[test]
    fn test_bytes_rendered_as_hex_in_json() {
        let v = AnyValue::Bytes(vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(v.to_json(), JsonValue::String("deadbeef".into()));
    }

    #[test]
    fn test_array_and_kvlist_are_complex() {
        assert!(AnyValue::Array(vec![AnyValue::Int(1)]).is_complex());
        assert!(AnyValue::KvList(vec![("a".into(), AnyValue::Bool(true))]).is_complex());
        assert_eq!(AnyValue::Array(vec![]).value_type(), None);
    }

    #[test]
    fn test_from_wire_int_value() {
        let wire = WireAnyValue {
            value: Some(any_value::Value::IntValue(42)),
        };
        assert_eq!(AnyValue::from(&wire), AnyValue::Int(42));
    }

    #[test]
    fn test_from_wire_missing_value_defaults_to_empty_string() {
        let wire = WireAnyValue { value: None };
        assert_eq!(AnyValue::from(&wire), AnyValue::String(String::new()));
    }

    #[test]
    fn test_convert_key_values_drops_absent_values() {
        let kvs = vec![
            KeyValue {
                key: "present".into(),
                value: Some(WireAnyValue {
                    value: Some(any_value::Value::BoolValue(true)),
                }),
            },
            KeyValue {
                key: "absent".into(),
                value: None,
            },
        ];
        let converted = convert_key_values(&kvs);
        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0].0, "present");
    }
}
