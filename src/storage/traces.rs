//! Span signal storage. Events and links are persisted as JSON arrays on the span
//! row rather than dedicated child tables (see DESIGN.md for the rationale).

use super::{SignalStorage, StoreOutcome};
use crate::attributes::{AttributeRouter, OwnerKind};
use crate::db::Pools;
use crate::dimensions::{ResourceManager, ScopeManager};
use crate::domain::batch::{SpanEventInput, SpanLinkInput, SpanRecordInput};
use crate::domain::enums::{SpanKind, StatusCode};
use crate::domain::ids::{encode_span_id, encode_trace_id};
use crate::error::IngestError;
use crate::promotion::PromotionPolicy;
use crate::registry::KeyRegistry;
use crate::timestamp;
use serde_json::{json, Value};
use tracing::{info, warn};

pub struct TracesStorage {
    pools: Pools,
    resources: ResourceManager,
    scopes: ScopeManager,
    registry: KeyRegistry,
    policy: PromotionPolicy,
}

impl TracesStorage {
    #[must_use]
    pub fn new(
        pools: Pools,
        resources: ResourceManager,
        scopes: ScopeManager,
        registry: KeyRegistry,
        policy: PromotionPolicy,
    ) -> Self {
        Self {
            pools,
            resources,
            scopes,
            registry,
            policy,
        }
    }
}

impl SignalStorage for TracesStorage {
    type Batch = Vec<SpanRecordInput>;

    async fn store(&self, batch: Self::Batch) -> Result<StoreOutcome, IngestError> {
        info!(signal = "spans", batch_size = batch.len(), "storing span batch");
        let mut outcome = StoreOutcome::default();
        let router = AttributeRouter::new(&self.registry, &self.policy);

        let mut tx = self.pools.transactional.begin().await?;

        for record in batch {
            if record.trace_id.len() != 16 || record.span_id.len() != 8 {
                warn!(
                    signal = "spans",
                    "dropping span with malformed trace_id/span_id length"
                );
                outcome.record(false);
                continue;
            }

            let (resource_id, resource_created, _) = self
                .resources
                .get_or_create_resource(&record.resource.attributes)
                .await?;
            if resource_created {
                router
                    .store_attributes_autocommit(
                        &self.pools.autocommit,
                        OwnerKind::Resource,
                        resource_id,
                        &record.resource.attributes,
                    )
                    .await?;
            }
            let (scope_id, scope_created, _) = self
                .scopes
                .get_or_create_scope(&record.scope.name, &record.scope.version, &record.scope.schema_url)
                .await?;
            if scope_created {
                router
                    .store_attributes_autocommit(
                        &self.pools.autocommit,
                        OwnerKind::Scope,
                        scope_id,
                        &record.scope.attributes,
                    )
                    .await?;
            }

            let trace_id_hex = encode_trace_id(&record.trace_id);
            let span_id_hex = encode_span_id(&record.span_id);
            let parent_span_id_hex =
                (!record.parent_span_id.is_empty()).then(|| encode_span_id(&record.parent_span_id));

            let start = timestamp::encode(record.start_time_unix_nano);
            let end = timestamp::encode(record.end_time_unix_nano);
            let kind = SpanKind::from(record.kind).id();
            let status_code = StatusCode::from(record.status_code).id();
            let events = encode_events(&record.events);
            let links = encode_links(&record.links);

            let row: (i64,) = sqlx::query_as(
                "INSERT INTO otel_spans_fact
                    (resource_id, scope_id, trace_id, span_id_hex, parent_span_id_hex, trace_state,
                     name, kind, start_time, start_time_nanos_fraction, end_time, end_time_nanos_fraction,
                     status_code, status_message, events, links,
                     dropped_attributes_count, dropped_events_count, dropped_links_count, flags)
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20)
                 ON CONFLICT (trace_id, span_id_hex) DO UPDATE SET
                    name = EXCLUDED.name
                 RETURNING span_id",
            )
            .bind(resource_id)
            .bind(scope_id)
            .bind(&trace_id_hex)
            .bind(&span_id_hex)
            .bind(&parent_span_id_hex)
            .bind(&record.trace_state)
            .bind(&record.name)
            .bind(kind)
            .bind(start.timestamp)
            .bind(start.nanos_fraction)
            .bind(end.timestamp)
            .bind(end.nanos_fraction)
            .bind(status_code)
            .bind(&record.status_message)
            .bind(events)
            .bind(links)
            .bind(record.dropped_attributes_count as i32)
            .bind(record.dropped_events_count as i32)
            .bind(record.dropped_links_count as i32)
            .bind(record.flags as i32)
            .fetch_one(&mut *tx)
            .await?;

            router
                .store_attributes(&mut tx, OwnerKind::Span, row.0, &record.attributes)
                .await?;

            outcome.record(true);
        }

        tx.commit().await?;
        info!(signal = "spans", accepted = outcome.accepted, rejected = outcome.rejected, "span batch committed");
        Ok(outcome)
    }
}

fn encode_events(events: &[SpanEventInput]) -> Value {
    Value::Array(
        events
            .iter()
            .map(|e| {
                let attrs: serde_json::Map<String, Value> =
                    e.attributes.iter().map(|(k, v)| (k.clone(), v.to_json())).collect();
                json!({
                    "name": e.name,
                    "time_unix_nano": e.time_unix_nano,
                    "attributes": attrs,
                    "dropped_attributes_count": e.dropped_attributes_count,
                })
            })
            .collect(),
    )
}

fn encode_links(links: &[SpanLinkInput]) -> Value {
    Value::Array(
        links
            .iter()
            .map(|l| {
                let attrs: serde_json::Map<String, Value> =
                    l.attributes.iter().map(|(k, v)| (k.clone(), v.to_json())).collect();
                json!({
                    "trace_id": encode_trace_id(&l.trace_id),
                    "span_id": encode_span_id(&l.span_id),
                    "trace_state": l.trace_state,
                    "attributes": attrs,
                    "dropped_attributes_count": l.dropped_attributes_count,
                })
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value::AnyValue;

    #[test]
    fn test_encode_events_renders_name_and_attributes() {
        let events = vec![SpanEventInput {
            time_unix_nano: 5,
            name: "retry".to_string(),
            attributes: vec![("attempt".to_string(), AnyValue::Int(2))],
            dropped_attributes_count: 0,
        }];
        let encoded = encode_events(&events);
        assert_eq!(encoded[0]["name"], "retry");
        assert_eq!(encoded[0]["attributes"]["attempt"], 2);
    }

    #[test]
    fn test_encode_links_renders_hex_ids() {
        let links = vec![SpanLinkInput {
            trace_id: (1..=16).collect(),
            span_id: (1..=8).collect(),
            trace_state: String::new(),
            attributes: vec![],
            dropped_attributes_count: 0,
        }];
        let encoded = encode_links(&links);
        assert_eq!(encoded[0]["trace_id"], "0102030405060708090a0b0c0d0e0f10");
        assert_eq!(encoded[0]["span_id"], "0102030405060708");
    }
}
