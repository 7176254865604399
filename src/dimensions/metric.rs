//! Metric dimension manager: identity is `{name, type, unit, temporality,
//! monotonic}` (`metric_identity_hash`), the upsert's conflict target, so a
//! description change on an existing metric updates the row in place rather than
//! forking a new `metrics_dim` identity.

use super::hash::metric_identity_hash;
use crate::domain::enums::{AggregationTemporality, MetricType};
use crate::error::IngestError;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::RwLock;

struct CachedMetric {
    id: i64,
    last_refreshed: DateTime<Utc>,
    cached_at: DateTime<Utc>,
}

pub struct MetricDimensionManager {
    autocommit_pool: PgPool,
    cache: RwLock<HashMap<String, CachedMetric>>,
    last_seen_threshold_secs: i64,
    cache_ttl_secs: i64,
}

impl MetricDimensionManager {
    #[must_use]
    pub fn new(autocommit_pool: PgPool, last_seen_threshold_secs: i64, cache_ttl_secs: i64) -> Self {
        Self {
            autocommit_pool,
            cache: RwLock::new(HashMap::new()),
            last_seen_threshold_secs,
            cache_ttl_secs,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn get_or_create_metric(
        &self,
        name: &str,
        metric_type: MetricType,
        unit: &str,
        temporality: Option<AggregationTemporality>,
        is_monotonic: Option<bool>,
        description: &str,
    ) -> Result<(i64, String), IngestError> {
        let temporality_id = temporality.map(AggregationTemporality::id);
        let identity_hash = metric_identity_hash(name, metric_type.id(), unit, temporality_id, is_monotonic);
        let now = Utc::now();

        if let Some(id) = self.cache_lookup(&identity_hash, now) {
            self.maybe_refresh_last_seen(&identity_hash, id, now).await?;
            return Ok((id, identity_hash));
        }

        let row: (i64,) = sqlx::query_as(
            "INSERT INTO metrics_dim
                (metric_hash, name, metric_type_id, unit,
                 aggregation_temporality_id, is_monotonic, description, first_seen, last_seen)
             VALUES ($1, $2, $3, $4, $5, $6, $7, now(), now())
             ON CONFLICT (metric_hash) DO UPDATE SET
                description = EXCLUDED.description,
                last_seen = CASE
                    WHEN metrics_dim.last_seen < now() - ($8 * INTERVAL '1 second')
                    THEN now()
                    ELSE metrics_dim.last_seen
                END
             RETURNING metric_id",
        )
        .bind(&identity_hash)
        .bind(name)
        .bind(metric_type.id())
        .bind(unit)
        .bind(temporality_id)
        .bind(is_monotonic)
        .bind(description)
        .bind(self.last_seen_threshold_secs as f64)
        .fetch_one(&self.autocommit_pool)
        .await?;

        self.cache.write().unwrap().insert(
            identity_hash.clone(),
            CachedMetric {
                id: row.0,
                last_refreshed: now,
                cached_at: now,
            },
        );
        Ok((row.0, identity_hash))
    }

    fn cache_lookup(&self, hash: &str, now: DateTime<Utc>) -> Option<i64> {
        let cache = self.cache.read().unwrap();
        let entry = cache.get(hash)?;
        if (now - entry.cached_at).num_seconds() > self.cache_ttl_secs {
            return None;
        }
        Some(entry.id)
    }

    async fn maybe_refresh_last_seen(
        &self,
        hash: &str,
        id: i64,
        now: DateTime<Utc>,
    ) -> Result<(), IngestError> {
        let stale = {
            let cache = self.cache.read().unwrap();
            cache
                .get(hash)
                .is_none_or(|e| (now - e.last_refreshed).num_seconds() >= self.last_seen_threshold_secs)
        };
        if !stale {
            return Ok(());
        }

        sqlx::query(
            "UPDATE metrics_dim SET last_seen = CASE
                WHEN last_seen < now() - ($2 * INTERVAL '1 second') THEN now()
                ELSE last_seen
             END WHERE metric_id = $1",
        )
        .bind(id)
        .bind(self.last_seen_threshold_secs as f64)
        .execute(&self.autocommit_pool)
        .await?;

        if let Some(entry) = self.cache.write().unwrap().get_mut(hash) {
            entry.last_refreshed = now;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_hash_is_independent_of_description() {
        // Identity is keyed on {name, type, unit, temporality, monotonic} only;
        // description is not part of the hash, so the field can drift across SDK
        // versions without forking the dimension row.
        let identity_a = metric_identity_hash("requests", MetricType::Sum.id(), "1", Some(2), Some(true));
        let identity_b = metric_identity_hash("requests", MetricType::Sum.id(), "1", Some(2), Some(true));
        assert_eq!(identity_a, identity_b);
    }
}
