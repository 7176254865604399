//! Attribute Router: splits an owner row's attribute bag into
//! typed-table inserts and a JSONB catch-all, per `(owner, key)` never landing in
//! more than one destination.

use crate::domain::value::{AnyValue, ValueType};
use crate::error::IngestError;
use crate::promotion::{Classification, PromotionPolicy, Signal};
use crate::registry::KeyRegistry;
use serde_json::{Map, Value};
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Transaction};

/// The owner kinds an attribute bag can belong to. Each maps to exactly one
/// promotion `Signal` and one typed-table name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerKind {
    Resource,
    Scope,
    Log,
    Span,
    SpanEvent,
    SpanLink,
    MetricDatapoint,
}

impl OwnerKind {
    const fn signal(self) -> Signal {
        match self {
            Self::Resource => Signal::Resource,
            Self::Scope => Signal::Scope,
            Self::Log => Signal::Logs,
            Self::Span | Self::SpanEvent | Self::SpanLink => Signal::Spans,
            Self::MetricDatapoint => Signal::Metrics,
        }
    }

    const fn table_prefix(self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::Scope => "scope",
            Self::Log => "log",
            Self::Span => "span",
            Self::SpanEvent => "span_event",
            Self::SpanLink => "span_link",
            Self::MetricDatapoint => "metric_datapoint",
        }
    }
}

/// The result of classifying an attribute bag, before anything has been written:
/// which `(key_id, value_type, value)` triples go to typed tables, and what's left
/// for the catch-all JSON.
struct Routed {
    promoted: Vec<(i32, ValueType, AnyValue)>,
    other: Map<String, Value>,
}

pub struct AttributeRouter<'a> {
    registry: &'a KeyRegistry,
    policy: &'a PromotionPolicy,
}

impl<'a> AttributeRouter<'a> {
    #[must_use]
    pub fn new(registry: &'a KeyRegistry, policy: &'a PromotionPolicy) -> Self {
        Self { registry, policy }
    }

    /// Resolves key ids and promotion decisions for `attrs`. Pure with respect to
    /// storage: the only database work here is the key-registry lookup, which is
    /// always autocommit regardless of which pool the caller ultimately persists
    /// typed rows through.
    async fn route(&self, signal: Signal, attrs: &[(String, AnyValue)]) -> Result<Routed, IngestError> {
        let mut promoted = Vec::new();
        let mut other = Map::new();

        for (key, value) in attrs {
            let key_id = self.registry.get_or_create_key_id(key).await?;

            if value.is_complex() {
                other.insert(key.clone(), value.to_json());
                continue;
            }
            let value_type = value
                .value_type()
                .expect("non-complex AnyValue always has a value_type");

            match self.policy.classify(signal, key, value_type) {
                Classification::Drop => {}
                Classification::Promote => promoted.push((key_id, value_type, value.clone())),
                Classification::Other => {
                    other.insert(key.clone(), value.to_json());
                }
            }
        }

        Ok(Routed { promoted, other })
    }

    /// Routes every attribute in `attrs` for `owner_id`, writing typed rows and the
    /// catch-all row (if non-empty) inside `tx`. Used for fact-row owners (logs,
    /// spans, metric data points), which are written inside the per-batch
    /// transaction.
    pub async fn store_attributes(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        owner: OwnerKind,
        owner_id: i64,
        attrs: &[(String, AnyValue)],
    ) -> Result<(usize, Map<String, Value>), IngestError> {
        let routed = self.route(owner.signal(), attrs).await?;
        for (key_id, value_type, value) in &routed.promoted {
            let table = format!("{}_attrs_{}", owner.table_prefix(), value_type.as_str());
            let query = typed_insert_query(&table);
            bind_typed(sqlx::query(&query), owner_id, *key_id, value)
                .execute(&mut **tx)
                .await?;
        }
        if !routed.other.is_empty() {
            let table = format!("{}_attrs_other", owner.table_prefix());
            let query = other_insert_query(&table);
            sqlx::query(&query)
                .bind(owner_id)
                .bind(Value::Object(routed.other.clone()))
                .execute(&mut **tx)
                .await?;
        }
        Ok((routed.promoted.len(), routed.other))
    }

    /// Same routing and write shape as `store_attributes`, but against the
    /// autocommit pool instead of a transaction. Used for resource/scope
    /// attributes: those owners are shared dimension rows written outside the
    /// per-batch fact transaction, so their attribute rows must be too — dimension
    /// work never sits in a long-lived transaction.
    pub async fn store_attributes_autocommit(
        &self,
        pool: &PgPool,
        owner: OwnerKind,
        owner_id: i64,
        attrs: &[(String, AnyValue)],
    ) -> Result<(usize, Map<String, Value>), IngestError> {
        let routed = self.route(owner.signal(), attrs).await?;
        for (key_id, value_type, value) in &routed.promoted {
            let table = format!("{}_attrs_{}", owner.table_prefix(), value_type.as_str());
            let query = typed_insert_query(&table);
            bind_typed(sqlx::query(&query), owner_id, *key_id, value)
                .execute(pool)
                .await?;
        }
        if !routed.other.is_empty() {
            let table = format!("{}_attrs_other", owner.table_prefix());
            let query = other_insert_query(&table);
            sqlx::query(&query)
                .bind(owner_id)
                .bind(Value::Object(routed.other.clone()))
                .execute(pool)
                .await?;
        }
        Ok((routed.promoted.len(), routed.other))
    }
}

fn typed_insert_query(table: &str) -> String {
    format!(
        "INSERT INTO {table} (owner_id, key_id, value) VALUES ($1, $2, $3)
         ON CONFLICT (owner_id, key_id) DO NOTHING"
    )
}

fn other_insert_query(table: &str) -> String {
    format!(
        "INSERT INTO {table} (owner_id, attributes) VALUES ($1, $2)
         ON CONFLICT (owner_id) DO UPDATE SET attributes = EXCLUDED.attributes"
    )
}

fn bind_typed<'q>(
    query: Query<'q, Postgres, PgArguments>,
    owner_id: i64,
    key_id: i32,
    value: &'q AnyValue,
) -> Query<'q, Postgres, PgArguments> {
    let query = query.bind(owner_id).bind(key_id);
    match value {
        AnyValue::String(s) => query.bind(s),
        AnyValue::Int(i) => query.bind(i),
        AnyValue::Double(d) => query.bind(d),
        AnyValue::Bool(b) => query.bind(b),
        AnyValue::Bytes(b) => query.bind(b),
        AnyValue::Array(_) | AnyValue::KvList(_) => {
            unreachable!("complex values never reach bind_typed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_kind_maps_to_expected_signal() {
        assert_eq!(OwnerKind::Resource.signal(), Signal::Resource);
        assert_eq!(OwnerKind::Span.signal(), Signal::Spans);
        assert_eq!(OwnerKind::SpanEvent.signal(), Signal::Spans);
        assert_eq!(OwnerKind::SpanLink.signal(), Signal::Spans);
        assert_eq!(OwnerKind::MetricDatapoint.signal(), Signal::Metrics);
    }

    #[test]
    fn test_table_prefix_naming() {
        assert_eq!(OwnerKind::Log.table_prefix(), "log");
        assert_eq!(OwnerKind::SpanEvent.table_prefix(), "span_event");
    }

    #[test]
    fn test_typed_insert_query_targets_expected_table() {
        let q = typed_insert_query("span_attrs_string");
        assert!(q.contains("INSERT INTO span_attrs_string"));
        assert!(q.contains("ON CONFLICT (owner_id, key_id) DO NOTHING"));
    }

    #[test]
    fn test_other_insert_query_upserts_on_owner_id() {
        let q = other_insert_query("log_attrs_other");
        assert!(q.contains("ON CONFLICT (owner_id) DO UPDATE"));
    }
}
