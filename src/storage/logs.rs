//! Log signal storage: dimension upserts followed by a fact-row insert and
//! promoted-attribute routing, one transaction per batch.

use super::{SignalStorage, StoreOutcome};
use crate::attributes::{AttributeRouter, OwnerKind};
use crate::db::Pools;
use crate::dimensions::{ResourceManager, ScopeManager};
use crate::domain::batch::LogRecordInput;
use crate::domain::enums::{LogBodyType, LogSeverityNumber};
use crate::domain::ids::{encode_span_id, encode_trace_id};
use crate::domain::value::AnyValue;
use crate::error::IngestError;
use crate::promotion::PromotionPolicy;
use crate::registry::KeyRegistry;
use crate::timestamp;
use tracing::{info, warn};

pub struct LogsStorage {
    pools: Pools,
    resources: ResourceManager,
    scopes: ScopeManager,
    registry: KeyRegistry,
    policy: PromotionPolicy,
}

impl LogsStorage {
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

impl SignalStorage for LogsStorage {
    type Batch = Vec<LogRecordInput>;

    async fn store(&self, batch: Self::Batch) -> Result<StoreOutcome, IngestError> {
        let batch_len = batch.len();
        info!(signal = "logs", batch_size = batch_len, "storing log batch");
        let mut outcome = StoreOutcome::default();
        let router = AttributeRouter::new(&self.registry, &self.policy);

        let mut tx = self.pools.transactional.begin().await?;

        for record in batch {
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

            let time_nanos = timestamp::resolve_log_time(record.time_unix_nano, record.observed_time_unix_nano);
            let observed_nanos = timestamp::resolve_observed_time(record.observed_time_unix_nano, time_nanos);
            let time = timestamp::encode(time_nanos);
            let observed_time = timestamp::encode(observed_nanos);

            let severity_number = (record.severity_number != 0)
                .then(|| LogSeverityNumber::from(record.severity_number).id());
            let body_type_id = LogBodyType::from_any_value(record.body.as_ref()).id();
            let body_json = record.body.as_ref().map(AnyValue::to_json);
            let trace_id = (!record.trace_id.is_empty()).then(|| encode_trace_id(&record.trace_id));
            let span_id = (!record.span_id.is_empty()).then(|| encode_span_id(&record.span_id));

            let row: (i64,) = sqlx::query_as(
                "INSERT INTO otel_logs_fact
                    (resource_id, scope_id, time, time_nanos_fraction, observed_time,
                     observed_time_nanos_fraction, severity_number, severity_text, body_type_id,
                     body, trace_id, span_id, trace_flags, dropped_attributes_count, flags)
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15)
                 RETURNING log_id",
            )
            .bind(resource_id)
            .bind(scope_id)
            .bind(time.timestamp)
            .bind(time.nanos_fraction)
            .bind(observed_time.timestamp)
            .bind(observed_time.nanos_fraction)
            .bind(severity_number)
            .bind(&record.severity_text)
            .bind(body_type_id)
            .bind(body_json)
            .bind(&trace_id)
            .bind(&span_id)
            .bind((record.flags & 0xFF) as i32)
            .bind(record.dropped_attributes_count as i32)
            .bind(record.flags as i32)
            .fetch_one(&mut *tx)
            .await?;

            router
                .store_attributes(&mut tx, OwnerKind::Log, row.0, &record.attributes)
                .await?;

            outcome.record(true);
        }

        tx.commit().await?;
        info!(signal = "logs", accepted = outcome.accepted, rejected = outcome.rejected, "log batch committed");
        if outcome.rejected > 0 {
            warn!(signal = "logs", rejected = outcome.rejected, "dropped invalid log records");
        }
        Ok(outcome)
    }
}
