//! Scope dimension manager: analogous to `ResourceManager`, but
//! hashed over `{name, version, schema_url}` with attributes stored separately via
//! the typed attribute tables rather than promoted columns.

use super::hash::scope_hash;
use crate::error::IngestError;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::RwLock;

struct CachedScope {
    id: i64,
    last_refreshed: DateTime<Utc>,
    cached_at: DateTime<Utc>,
}

pub struct ScopeManager {
    autocommit_pool: PgPool,
    cache: RwLock<HashMap<String, CachedScope>>,
    last_seen_threshold_secs: i64,
    cache_ttl_secs: i64,
}

impl ScopeManager {
    #[must_use]
    pub fn new(autocommit_pool: PgPool, last_seen_threshold_secs: i64, cache_ttl_secs: i64) -> Self {
        Self {
            autocommit_pool,
            cache: RwLock::new(HashMap::new()),
            last_seen_threshold_secs,
            cache_ttl_secs,
        }
    }

    /// Returns `(scope_id, created, scope_hash)`; `created` is `true` only the one
    /// time this process actually inserted the row, mirroring
    /// `ResourceManager::get_or_create_resource`.
    pub async fn get_or_create_scope(
        &self,
        name: &str,
        version: &str,
        schema_url: &str,
    ) -> Result<(i64, bool, String), IngestError> {
        let hash = scope_hash(name, version, schema_url);
        let now = Utc::now();

        if let Some(id) = self.cache_lookup(&hash, now) {
            self.maybe_refresh_last_seen(&hash, id, now).await?;
            return Ok((id, false, hash));
        }

        let row: (i64, bool) = sqlx::query_as(
            "INSERT INTO otel_scopes_dim
                (scope_hash, name, version, schema_url, first_seen, last_seen)
             VALUES ($1, $2, $3, $4, now(), now())
             ON CONFLICT (scope_hash) DO UPDATE SET
                last_seen = CASE
                    WHEN otel_scopes_dim.last_seen < now() - ($5 * INTERVAL '1 second')
                    THEN now()
                    ELSE otel_scopes_dim.last_seen
                END
             RETURNING scope_id, (xmax = 0) AS created",
        )
        .bind(&hash)
        .bind(name)
        .bind(version)
        .bind(schema_url)
        .bind(self.last_seen_threshold_secs as f64)
        .fetch_one(&self.autocommit_pool)
        .await?;

        self.cache.write().unwrap().insert(
            hash.clone(),
            CachedScope {
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
            "UPDATE otel_scopes_dim SET last_seen = CASE
                WHEN last_seen < now() - ($2 * INTERVAL '1 second') THEN now()
                ELSE last_seen
             END WHERE scope_id = $1",
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
    fn test_scope_hash_used_as_cache_key_is_stable() {
        let a = scope_hash("lib", "1.2.3", "https://schema");
        let b = scope_hash("lib", "1.2.3", "https://schema");
        assert_eq!(a, b);
    }
}
