//! Canonical hashing for resource/scope/metric identity. Every hash is SHA-256
//! over a deterministic JSON rendering: keys sorted, no
//! whitespace, so semantically identical inputs hash identically regardless of
//! map-iteration order or producer formatting.

use crate::domain::value::AnyValue;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// SHA-256 of the sorted-key, whitespace-free JSON rendering of a resource's
/// attribute set.
#[must_use]
pub fn resource_hash(attributes: &[(String, AnyValue)]) -> String {
    let mut map = Map::new();
    for (k, v) in attributes {
        map.insert(k.clone(), v.to_json());
    }
    let value = Value::Object(sort_object(map));
    hash_json(&value)
}

/// SHA-256 of `{name, version, schema_url}` as a 3-key JSON object; absent fields
/// are rendered as empty strings (never `null`), so omission and explicit-empty
/// hash identically.
#[must_use]
pub fn scope_hash(name: &str, version: &str, schema_url: &str) -> String {
    let mut map = Map::new();
    map.insert("name".to_string(), Value::String(name.to_string()));
    map.insert("version".to_string(), Value::String(version.to_string()));
    map.insert(
        "schema_url".to_string(),
        Value::String(schema_url.to_string()),
    );
    hash_json(&Value::Object(map))
}

/// Metric identity hash over `{name, metric_type, unit, temporality, is_monotonic}`.
/// `description` is deliberately excluded: it may drift across SDK versions
/// without forking the `metrics_dim` row that identifies this metric.
#[must_use]
pub fn metric_identity_hash(
    name: &str,
    metric_type_id: i16,
    unit: &str,
    temporality_id: Option<i16>,
    is_monotonic: Option<bool>,
) -> String {
    let map = metric_identity_fields(name, metric_type_id, unit, temporality_id, is_monotonic);
    hash_json(&Value::Object(map))
}

fn metric_identity_fields(
    name: &str,
    metric_type_id: i16,
    unit: &str,
    temporality_id: Option<i16>,
    is_monotonic: Option<bool>,
) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("name".to_string(), Value::String(name.to_string()));
    map.insert("metric_type_id".to_string(), Value::from(metric_type_id));
    map.insert("unit".to_string(), Value::String(unit.to_string()));
    map.insert(
        "temporality_id".to_string(),
        temporality_id.map_or(Value::Null, Value::from),
    );
    map.insert(
        "is_monotonic".to_string(),
        is_monotonic.map_or(Value::Null, Value::from),
    );
    map
}

fn hash_json(value: &Value) -> String {
    // `serde_json`'s default `Display` for `Value::Object` does not guarantee key
    // order is preserved as inserted unless the `preserve_order` feature is on; we
    // sort explicitly so the textual form is independent of that feature flag.
    let canonical = to_canonical_string(value);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

fn to_canonical_string(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let body = entries
                .iter()
                .map(|(k, v)| format!("{}:{}", serde_json::to_string(k).unwrap(), to_canonical_string(v)))
                .collect::<Vec<_>>()
                .join(",");
            format!("{{{body}}}")
        }
        Value::Array(items) => {
            let body = items
                .iter()
                .map(to_canonical_string)
                .collect::<Vec<_>>()
                .join(",");
            format!("[{body}]")
        }
        other => serde_json::to_string(other).unwrap(),
    }
}

fn sort_object(map: Map<String, Value>) -> Map<String, Value> {
    let mut sorted = Map::new();
    let mut entries: Vec<_> = map.into_iter().collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    for (k, v) in entries {
        sorted.insert(k, v);
    }
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_hash_is_independent_of_attribute_order() {
        let a = vec![
            ("service.name".to_string(), AnyValue::String("api".into())),
            ("service.namespace".to_string(), AnyValue::String("core".into())),
        ];
        let b = vec![
            ("service.namespace".to_string(), AnyValue::String("core".into())),
            ("service.name".to_string(), AnyValue::String("api".into())),
        ];
        assert_eq!(resource_hash(&a), resource_hash(&b));
    }

    #[test]
    fn test_resource_hash_differs_on_different_content() {
        let a = vec![("service.name".to_string(), AnyValue::String("api".into()))];
        let b = vec![("service.name".to_string(), AnyValue::String("worker".into()))];
        assert_ne!(resource_hash(&a), resource_hash(&b));
    }

    #[test]
    fn test_resource_hash_is_64_char_lowercase_hex() {
        let h = resource_hash(&[]);
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_scope_hash_distinguishes_schema_url() {
        let a = scope_hash("otlp-lib", "1.0", "https://a");
        let b = scope_hash("otlp-lib", "1.0", "https://b");
        assert_ne!(a, b);
    }

    #[test]
    fn test_scope_hash_omission_matches_explicit_empty() {
        let omitted = scope_hash("lib", "1.0", "");
        let explicit = scope_hash("lib", "1.0", "");
        assert_eq!(omitted, explicit);
    }

    #[test]
    fn test_metric_identity_hash_is_stable_for_same_identity() {
        let i1 = metric_identity_hash("http.server.duration", 3, "ms", Some(2), None);
        let i2 = metric_identity_hash("http.server.duration", 3, "ms", Some(2), None);
        assert_eq!(i1, i2);
    }

    #[test]
    fn test_metric_identity_hash_differs_on_unit() {
        let a = metric_identity_hash("http.server.duration", 3, "ms", Some(2), None);
        let b = metric_identity_hash("http.server.duration", 3, "s", Some(2), None);
        assert_ne!(a, b);
    }
}
