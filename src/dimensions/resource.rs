//! Resource dimension manager: deduplicates resource identities
//! by canonical hash, extracting `service.name`/`service.namespace` into promoted
//! columns on first insert only.

use super::hash::resource_hash;
use crate::domain::value::AnyValue;
use crate::error::IngestError;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::RwLock;

struct CachedResource {
    id: i64,
    last_refreshed: DateTime<Utc>,
    cached_at: DateTime<Utc>,
}

pub struct ResourceManager {
    autocommit_pool: PgPool,
    cache: RwLock<HashMap<String, CachedResource>>,
    last_seen_threshold_secs: i64,
    cache_ttl_secs: i64,
}

impl ResourceManager {
    #[must_use]
    pub fn new(autocommit_pool: PgPool, last_seen_threshold_secs: i64, cache_ttl_secs: i64) -> Self {
        Self {
            autocommit_pool,
            cache: RwLock::new(HashMap::new()),
            last_seen_threshold_secs,
            cache_ttl_secs,
        }
    }

    /// Returns `(resource_id, created, resource_hash)` for the given attribute set,
    /// creating the dimension row on first sight and throttling `last_seen` writes.
    /// `created` is `true` only the one time this process actually inserted the row
    /// (via Postgres's `xmax = 0` upsert idiom) — callers use it to decide whether
    /// the full attribute set still needs routing into the typed attribute tables,
    /// since a shared dimension row's attributes only need writing once.
    pub async fn get_or_create_resource(
        &self,
        attributes: &[(String, AnyValue)],
    ) -> Result<(i64, bool, String), IngestError> {
        let hash = resource_hash(attributes);
        let now = Utc::now();

        if let Some(cached_id) = self.cache_lookup(&hash, now) {
            self.maybe_refresh_last_seen(&hash, cached_id, now).await?;
            return Ok((cached_id, false, hash));
        }

        let (service_name, service_namespace) = extract_promoted_columns(attributes);
        let row: (i64, bool) = sqlx::query_as(
            "INSERT INTO otel_resources_dim
                (resource_hash, service_name, service_namespace, first_seen, last_seen)
             VALUES ($1, $2, $3, now(), now())
             ON CONFLICT (resource_hash) DO UPDATE SET
                last_seen = CASE
                    WHEN otel_resources_dim.last_seen < now() - ($4 * INTERVAL '1 second')
                    THEN now()
                    ELSE otel_resources_dim.last_seen
                END
             RETURNING resource_id, (xmax = 0) AS created",
        )
        .bind(&hash)
        .bind(service_name)
        .bind(service_namespace)
        .bind(self.last_seen_threshold_secs as f64)
        .fetch_one(&self.autocommit_pool)
        .await?;

        self.cache.write().unwrap().insert(
            hash.clone(),
            CachedResource {
                id: row.0,
                last_refreshed: now,
                cached_at: now,
            },
        );
        Ok((row.0, row.1, hash))
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
            "UPDATE otel_resources_dim SET last_seen = CASE
                WHEN last_seen < now() - ($2 * INTERVAL '1 second') THEN now()
                ELSE last_seen
             END WHERE resource_id = $1",
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

/// Extracts `service.name`/`service.namespace` string values for the promoted
/// columns. Non-string values for these well-known keys are treated as absent
/// rather than coerced, mirroring the strict typed-column contract.
fn extract_promoted_columns(attributes: &[(String, AnyValue)]) -> (Option<String>, Option<String>) {
    let mut service_name = None;
    let mut service_namespace = None;
    for (key, value) in attributes {
        match (key.as_str(), value) {
            ("service.name", AnyValue::String(s)) => service_name = Some(s.clone()),
            ("service.namespace", AnyValue::String(s)) => service_namespace = Some(s.clone()),
            _ => {}
        }
    }
    (service_name, service_namespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_promoted_columns() {
        let attrs = vec![
            ("service.name".to_string(), AnyValue::String("api".into())),
            ("service.namespace".to_string(), AnyValue::String("core".into())),
            ("unrelated".to_string(), AnyValue::Bool(true)),
        ];
        let (name, ns) = extract_promoted_columns(&attrs);
        assert_eq!(name, Some("api".to_string()));
        assert_eq!(ns, Some("core".to_string()));
    }

    #[test]
    fn test_extract_promoted_columns_ignores_wrong_type() {
        let attrs = vec![("service.name".to_string(), AnyValue::Int(5))];
        let (name, _) = extract_promoted_columns(&attrs);
        assert_eq!(name, None);
    }

    #[test]
    fn test_cache_entry_considered_stale_past_ttl() {
        let cache_ttl_secs: i64 = 1800;
        let cached_at = Utc::now() - chrono::Duration::seconds(2000);
        let now = Utc::now();
        let age_secs = (now - cached_at).num_seconds();
        assert!(age_secs > cache_ttl_secs, "entry older than ttl must be treated as expired");
    }

    #[test]
    fn test_cache_entry_fresh_within_ttl() {
        let cache_ttl_secs: i64 = 1800;
        let cached_at = Utc::now() - chrono::Duration::seconds(10);
        let now = Utc::now();
        let age_secs = (now - cached_at).num_seconds();
        assert!(age_secs <= cache_ttl_secs);
    }
}
