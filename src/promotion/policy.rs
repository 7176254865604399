//! Promotion policy: a pure decision function
//! `classify(signal, key, value_type) -> {PROMOTE, DROP, OTHER}`, loaded once at
//! startup from a required base config and an optional operator override, merged
//! so that `promote` is additive and `drop` (override-only) always wins.

use crate::domain::value::ValueType;
use crate::error::IngestError;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// The five signal families a promotion rule can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Resource,
    Scope,
    Logs,
    Spans,
    Metrics,
}

impl Signal {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "resource" => Some(Self::Resource),
            "scope" => Some(Self::Scope),
            "logs" => Some(Self::Logs),
            "spans" => Some(Self::Spans),
            "metrics" => Some(Self::Metrics),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Promote,
    Drop,
    Other,
}

/// On-disk shape shared by both the base config and the operator override:
///
/// ```yaml
/// promote:
///   <signal>:
///     <value_type>: [ <key>, ... ]
/// drop:
///   <signal>: [ <key>, ... ]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
struct PromotionConfigFile {
    #[serde(default)]
    promote: HashMap<String, HashMap<String, Vec<String>>>,
    #[serde(default)]
    drop: HashMap<String, Vec<String>>,
}

/// Immutable, loaded-once policy. Lookup is O(1): a hash-set membership test per
/// `(signal, value_type)` promote bucket and per-signal drop bucket.
#[derive(Debug, Clone)]
pub struct PromotionPolicy {
    promote: HashMap<(Signal, ValueType), HashSet<String>>,
    drop: HashMap<Signal, HashSet<String>>,
}

impl PromotionPolicy {
    /// Loads the base config (fatal if missing or unparseable) and merges in the
    /// optional override (silently skipped if its path is `None` or the file is
    /// absent on disk).
    pub fn load(
        base_path: &Path,
        override_path: Option<&Path>,
    ) -> Result<Self, IngestError> {
        let base_text = std::fs::read_to_string(base_path).map_err(|e| {
            IngestError::ConfigFatal(format!(
                "base promotion config missing at {}: {e}",
                base_path.display()
            ))
        })?;
        let base: PromotionConfigFile = serde_yaml::from_str(&base_text)?;

        let override_cfg = match override_path {
            Some(path) if path.exists() => {
                let text = std::fs::read_to_string(path)?;
                Some(serde_yaml::from_str::<PromotionConfigFile>(&text)?)
            }
            _ => None,
        };

        Ok(Self::merge(base, override_cfg))
    }

    fn merge(base: PromotionConfigFile, override_cfg: Option<PromotionConfigFile>) -> Self {
        let mut promote: HashMap<(Signal, ValueType), HashSet<String>> = HashMap::new();
        let mut drop: HashMap<Signal, HashSet<String>> = HashMap::new();

        merge_promote(&mut promote, &base.promote);
        if let Some(ref ov) = override_cfg {
            merge_promote(&mut promote, &ov.promote);
        }

        // `drop` is override-only; base has no drop list.
        if let Some(ov) = override_cfg {
            for (signal_str, keys) in ov.drop {
                if let Some(signal) = Signal::parse(&signal_str) {
                    drop.entry(signal).or_default().extend(keys);
                }
            }
        }

        Self { promote, drop }
    }

    /// Pure, constant-time classification of a single attribute key.
    #[must_use]
    pub fn classify(&self, signal: Signal, key: &str, value_type: ValueType) -> Classification {
        if self
            .drop
            .get(&signal)
            .is_some_and(|keys| keys.contains(key))
        {
            return Classification::Drop;
        }
        if self
            .promote
            .get(&(signal, value_type))
            .is_some_and(|keys| keys.contains(key))
        {
            return Classification::Promote;
        }
        Classification::Other
    }
}

fn merge_promote(
    promote: &mut HashMap<(Signal, ValueType), HashSet<String>>,
    source: &HashMap<String, HashMap<String, Vec<String>>>,
) {
    for (signal_str, by_type) in source {
        let Some(signal) = Signal::parse(signal_str) else {
            continue;
        };
        for (type_str, keys) in by_type {
            let Some(value_type) = parse_value_type(type_str) else {
                continue;
            };
            promote
                .entry((signal, value_type))
                .or_default()
                .extend(keys.iter().cloned());
        }
    }
}

fn parse_value_type(s: &str) -> Option<ValueType> {
    match s {
        "string" => Some(ValueType::String),
        "int" => Some(ValueType::Int),
        "double" => Some(ValueType::Double),
        "bool" => Some(ValueType::Bool),
        "bytes" => Some(ValueType::Bytes),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_only(yaml: &str) -> PromotionPolicy {
        let base: PromotionConfigFile = serde_yaml::from_str(yaml).unwrap();
        PromotionPolicy::merge(base, None)
    }

    #[test]
    fn test_promote_lookup() {
        let policy = base_only(
            "promote:\n  resource:\n    string: [service.name, service.namespace]\n",
        );
        assert_eq!(
            policy.classify(Signal::Resource, "service.name", ValueType::String),
            Classification::Promote
        );
        assert_eq!(
            policy.classify(Signal::Resource, "unrelated", ValueType::String),
            Classification::Other
        );
    }

    #[test]
    fn test_wrong_value_type_is_not_promoted() {
        let policy = base_only("promote:\n  spans:\n    string: [http.method]\n");
        assert_eq!(
            policy.classify(Signal::Spans, "http.method", ValueType::Int),
            Classification::Other
        );
    }

    #[test]
    fn test_drop_always_wins_over_promote() {
        let base: PromotionConfigFile =
            serde_yaml::from_str("promote:\n  logs:\n    string: [password]\n").unwrap();
        let ov: PromotionConfigFile =
            serde_yaml::from_str("drop:\n  logs: [password]\n").unwrap();
        let policy = PromotionPolicy::merge(base, Some(ov));
        assert_eq!(
            policy.classify(Signal::Logs, "password", ValueType::String),
            Classification::Drop
        );
    }

    #[test]
    fn test_override_promote_is_additive_with_base() {
        let base: PromotionConfigFile =
            serde_yaml::from_str("promote:\n  resource:\n    string: [service.name]\n").unwrap();
        let ov: PromotionConfigFile =
            serde_yaml::from_str("promote:\n  resource:\n    string: [service.namespace]\n")
                .unwrap();
        let policy = PromotionPolicy::merge(base, Some(ov));
        assert_eq!(
            policy.classify(Signal::Resource, "service.name", ValueType::String),
            Classification::Promote
        );
        assert_eq!(
            policy.classify(Signal::Resource, "service.namespace", ValueType::String),
            Classification::Promote
        );
    }

    #[test]
    fn test_base_drop_section_is_ignored() {
        // base configs have no drop list per the spec; a `drop:` key in the base
        // document (if present) is simply never consulted.
        let base: PromotionConfigFile =
            serde_yaml::from_str("drop:\n  logs: [ignored]\npromote: {}\n").unwrap();
        let policy = PromotionPolicy::merge(base, None);
        assert_eq!(
            policy.classify(Signal::Logs, "ignored", ValueType::String),
            Classification::Other
        );
    }

    #[test]
    fn test_missing_base_config_is_fatal() {
        let result = PromotionPolicy::load(Path::new("/nonexistent/promotion.yaml"), None);
        assert!(matches!(result, Err(IngestError::ConfigFatal(_))));
    }

    #[test]
    fn test_missing_override_is_not_an_error() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "promote: {}\n").unwrap();
        let result =
            PromotionPolicy::load(tmp.path(), Some(Path::new("/nonexistent/override.yaml")));
        assert!(result.is_ok());
    }
}
