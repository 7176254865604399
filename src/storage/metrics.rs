//! Metric signal storage. A full implementation by symmetry with logs and traces
//! (see DESIGN.md), covering all four data point shapes.

use super::{SignalStorage, StoreOutcome};
use crate::attributes::{AttributeRouter, OwnerKind};
use crate::db::Pools;
use crate::dimensions::{MetricDimensionManager, ResourceManager, ScopeManager};
use crate::domain::batch::{
    DataPointInput, ExponentialHistogramDataPointInput, HistogramDataPointInput, MetricRecordInput,
    NumberDataPointInput, SummaryDataPointInput,
};
use crate::domain::enums::{AggregationTemporality, MetricType};
use crate::error::IngestError;
use crate::promotion::PromotionPolicy;
use crate::registry::KeyRegistry;
use crate::timestamp;
use tracing::info;

pub struct MetricsStorage {
    pools: Pools,
    resources: ResourceManager,
    scopes: ScopeManager,
    metrics: MetricDimensionManager,
    registry: KeyRegistry,
    policy: PromotionPolicy,
}

impl MetricsStorage {
    #[must_use]
    pub fn new(
        pools: Pools,
        resources: ResourceManager,
        scopes: ScopeManager,
        metrics: MetricDimensionManager,
        registry: KeyRegistry,
        policy: PromotionPolicy,
    ) -> Self {
        Self {
            pools,
            resources,
            scopes,
            metrics,
            registry,
            policy,
        }
    }
}

/// Gauge and Sum data points share the `Number` shape; the record's `temporality`/
/// `is_monotonic` fields (absent for Gauge, present for Sum) disambiguate which
/// metric type a batch of Number data points belongs to.
fn metric_type_for(record: &MetricRecordInput) -> MetricType {
    match record.data_points.first() {
        Some(DataPointInput::Histogram(_)) => MetricType::Histogram,
        Some(DataPointInput::ExponentialHistogram(_)) => MetricType::ExponentialHistogram,
        Some(DataPointInput::Summary(_)) => MetricType::Summary,
        Some(DataPointInput::Number(_)) | None => {
            if record.temporality.is_some() || record.is_monotonic.is_some() {
                MetricType::Sum
            } else {
                MetricType::Gauge
            }
        }
    }
}

impl SignalStorage for MetricsStorage {
    type Batch = Vec<MetricRecordInput>;

    async fn store(&self, batch: Self::Batch) -> Result<StoreOutcome, IngestError> {
        info!(signal = "metrics", batch_size = batch.len(), "storing metric batch");
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

            let metric_type = metric_type_for(&record);
            let temporality = record.temporality.map(AggregationTemporality::from);
            let (metric_id, _) = self
                .metrics
                .get_or_create_metric(
                    &record.name,
                    metric_type,
                    &record.unit,
                    temporality,
                    record.is_monotonic,
                    &record.description,
                )
                .await?;

            for data_point in &record.data_points {
                let dp_id = match data_point {
                    DataPointInput::Number(dp) => {
                        insert_number(&mut tx, metric_id, resource_id, scope_id, dp).await?
                    }
                    DataPointInput::Histogram(dp) => {
                        insert_histogram(&mut tx, metric_id, resource_id, scope_id, dp).await?
                    }
                    DataPointInput::ExponentialHistogram(dp) => {
                        insert_exp_histogram(&mut tx, metric_id, resource_id, scope_id, dp).await?
                    }
                    DataPointInput::Summary(dp) => {
                        insert_summary(&mut tx, metric_id, resource_id, scope_id, dp).await?
                    }
                };

                let attrs: &[(String, crate::domain::value::AnyValue)] = match data_point {
                    DataPointInput::Number(dp) => &dp.attributes,
                    DataPointInput::Histogram(dp) => &dp.attributes,
                    DataPointInput::ExponentialHistogram(dp) => &dp.attributes,
                    DataPointInput::Summary(dp) => &dp.attributes,
                };
                router
                    .store_attributes(&mut tx, OwnerKind::MetricDatapoint, dp_id, attrs)
                    .await?;

                outcome.record(true);
            }
        }

        tx.commit().await?;
        info!(signal = "metrics", accepted = outcome.accepted, rejected = outcome.rejected, "metric batch committed");
        Ok(outcome)
    }
}

async fn insert_number(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    metric_id: i64,
    resource_id: i64,
    scope_id: i64,
    dp: &NumberDataPointInput,
) -> Result<i64, IngestError> {
    let start = timestamp::encode(dp.start_time_unix_nano);
    let time = timestamp::encode(dp.time_unix_nano);
    let exemplars = serde_json::to_value(&dp.exemplars).unwrap_or(serde_json::Value::Null);

    let row: (i64,) = sqlx::query_as(
        "INSERT INTO otel_metrics_data_points_number
            (metric_id, resource_id, scope_id, start_time, start_time_nanos_fraction,
             time, time_nanos_fraction, value_int, value_double, flags, exemplars)
         VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
         RETURNING data_point_id",
    )
    .bind(metric_id)
    .bind(resource_id)
    .bind(scope_id)
    .bind(start.timestamp)
    .bind(start.nanos_fraction)
    .bind(time.timestamp)
    .bind(time.nanos_fraction)
    .bind(dp.value_int)
    .bind(dp.value_double)
    .bind(dp.flags as i32)
    .bind(exemplars)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row.0)
}

async fn insert_histogram(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    metric_id: i64,
    resource_id: i64,
    scope_id: i64,
    dp: &HistogramDataPointInput,
) -> Result<i64, IngestError> {
    let start = timestamp::encode(dp.start_time_unix_nano);
    let time = timestamp::encode(dp.time_unix_nano);
    let exemplars = serde_json::to_value(&dp.exemplars).unwrap_or(serde_json::Value::Null);
    let bucket_counts: Vec<i64> = dp.bucket_counts.iter().map(|&c| c as i64).collect();
    let explicit_bounds = dp.explicit_bounds.clone();

    let row: (i64,) = sqlx::query_as(
        "INSERT INTO otel_metrics_data_points_histogram
            (metric_id, resource_id, scope_id, start_time, start_time_nanos_fraction,
             time, time_nanos_fraction, count, sum, min, max, bucket_counts, explicit_bounds,
             flags, exemplars)
         VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15)
         RETURNING data_point_id",
    )
    .bind(metric_id)
    .bind(resource_id)
    .bind(scope_id)
    .bind(start.timestamp)
    .bind(start.nanos_fraction)
    .bind(time.timestamp)
    .bind(time.nanos_fraction)
    .bind(dp.count as i64)
    .bind(dp.sum)
    .bind(dp.min)
    .bind(dp.max)
    .bind(bucket_counts)
    .bind(explicit_bounds)
    .bind(dp.flags as i32)
    .bind(exemplars)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row.0)
}

async fn insert_exp_histogram(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    metric_id: i64,
    resource_id: i64,
    scope_id: i64,
    dp: &ExponentialHistogramDataPointInput,
) -> Result<i64, IngestError> {
    let start = timestamp::encode(dp.start_time_unix_nano);
    let time = timestamp::encode(dp.time_unix_nano);
    let exemplars = serde_json::to_value(&dp.exemplars).unwrap_or(serde_json::Value::Null);
    let positive_bucket_counts: Vec<i64> = dp.positive_bucket_counts.iter().map(|&c| c as i64).collect();
    let negative_bucket_counts: Vec<i64> = dp.negative_bucket_counts.iter().map(|&c| c as i64).collect();

    let row: (i64,) = sqlx::query_as(
        "INSERT INTO otel_metrics_data_points_exp_histogram
            (metric_id, resource_id, scope_id, start_time, start_time_nanos_fraction,
             time, time_nanos_fraction, count, sum, min, max, scale, zero_count,
             positive_offset, positive_bucket_counts, negative_offset, negative_bucket_counts,
             flags, exemplars)
         VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19)
         RETURNING data_point_id",
    )
    .bind(metric_id)
    .bind(resource_id)
    .bind(scope_id)
    .bind(start.timestamp)
    .bind(start.nanos_fraction)
    .bind(time.timestamp)
    .bind(time.nanos_fraction)
    .bind(dp.count as i64)
    .bind(dp.sum)
    .bind(dp.min)
    .bind(dp.max)
    .bind(dp.scale)
    .bind(dp.zero_count as i64)
    .bind(dp.positive_offset)
    .bind(positive_bucket_counts)
    .bind(dp.negative_offset)
    .bind(negative_bucket_counts)
    .bind(dp.flags as i32)
    .bind(exemplars)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row.0)
}

async fn insert_summary(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    metric_id: i64,
    resource_id: i64,
    scope_id: i64,
    dp: &SummaryDataPointInput,
) -> Result<i64, IngestError> {
    let start = timestamp::encode(dp.start_time_unix_nano);
    let time = timestamp::encode(dp.time_unix_nano);
    let quantile_values = serde_json::to_value(
        dp.quantile_values
            .iter()
            .map(|(q, v)| serde_json::json!({"quantile": q, "value": v}))
            .collect::<Vec<_>>(),
    )
    .unwrap_or(serde_json::Value::Null);

    let row: (i64,) = sqlx::query_as(
        "INSERT INTO otel_metrics_data_points_summary
            (metric_id, resource_id, scope_id, start_time, start_time_nanos_fraction,
             time, time_nanos_fraction, count, sum, quantile_values, flags)
         VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
         RETURNING data_point_id",
    )
    .bind(metric_id)
    .bind(resource_id)
    .bind(scope_id)
    .bind(start.timestamp)
    .bind(start.nanos_fraction)
    .bind(time.timestamp)
    .bind(time.nanos_fraction)
    .bind(dp.count as i64)
    .bind(dp.sum)
    .bind(quantile_values)
    .bind(dp.flags as i32)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_record(data_points: Vec<DataPointInput>) -> MetricRecordInput {
        MetricRecordInput {
            resource: Default::default(),
            scope: Default::default(),
            name: "requests".to_string(),
            description: String::new(),
            unit: "1".to_string(),
            temporality: None,
            is_monotonic: None,
            data_points,
        }
    }

    #[test]
    fn test_metric_type_for_gauge_has_no_temporality() {
        let record = base_record(vec![DataPointInput::Number(NumberDataPointInput {
            attributes: vec![],
            start_time_unix_nano: 0,
            time_unix_nano: 0,
            flags: 0,
            exemplars: vec![],
            value_int: Some(1),
            value_double: None,
        })]);
        assert_eq!(metric_type_for(&record), MetricType::Gauge);
    }

    #[test]
    fn test_metric_type_for_sum_has_temporality() {
        let mut record = base_record(vec![DataPointInput::Number(NumberDataPointInput {
            attributes: vec![],
            start_time_unix_nano: 0,
            time_unix_nano: 0,
            flags: 0,
            exemplars: vec![],
            value_int: Some(1),
            value_double: None,
        })]);
        record.temporality = Some(2);
        record.is_monotonic = Some(true);
        assert_eq!(metric_type_for(&record), MetricType::Sum);
    }

    #[test]
    fn test_metric_type_for_histogram() {
        let record = base_record(vec![DataPointInput::Histogram(HistogramDataPointInput {
            attributes: vec![],
            start_time_unix_nano: 0,
            time_unix_nano: 0,
            flags: 0,
            exemplars: vec![],
            count: 1,
            sum: Some(1.0),
            min: None,
            max: None,
            bucket_counts: vec![1],
            explicit_bounds: vec![],
        })]);
        assert_eq!(metric_type_for(&record), MetricType::Histogram);
    }
}
