//! Attribute Key Registry: stable small-int ids for attribute
//! key strings, deduplicated across all signals via an in-process cache backed by
//! an idempotent upsert-or-select against `attribute_keys` on the autocommit pool.

use crate::error::IngestError;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::RwLock;

pub struct KeyRegistry {
    autocommit_pool: PgPool,
    cache: RwLock<HashMap<String, i32>>,
}

impl KeyRegistry {
    #[must_use]
    pub fn new(autocommit_pool: PgPool) -> Self {
        Self {
            autocommit_pool,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the stable id for `name`, creating the row on first sight. A
    /// duplicate-key race during the insert is not an error — the `ON CONFLICT`
    /// clause returns the winner's id to every racing caller.
    pub async fn get_or_create_key_id(&self, name: &str) -> Result<i32, IngestError> {
        if let Some(id) = self.cache.read().unwrap().get(name).copied() {
            return Ok(id);
        }

        let row: (i32,) = sqlx::query_as(
            "INSERT INTO attribute_keys (key_name) VALUES ($1)
             ON CONFLICT (key_name) DO UPDATE SET key_name = EXCLUDED.key_name
             RETURNING key_id",
        )
        .bind(name)
        .fetch_one(&self.autocommit_pool)
        .await?;

        self.cache.write().unwrap().insert(name.to_string(), row.0);
        Ok(row.0)
    }

    #[cfg(test)]
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache.read().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The cache itself (independent of the database round trip) must be a pure
    /// name-stable map: inserting the same name twice never grows the cache.
    #[test]
    fn test_cache_is_idempotent_per_name() {
        let cache: RwLock<HashMap<String, i32>> = RwLock::new(HashMap::new());
        cache.write().unwrap().insert("http.method".to_string(), 1);
        cache.write().unwrap().insert("http.method".to_string(), 1);
        assert_eq!(cache.read().unwrap().len(), 1);
    }

    #[test]
    fn test_cache_distinguishes_distinct_names() {
        let cache: RwLock<HashMap<String, i32>> = RwLock::new(HashMap::new());
        cache.write().unwrap().insert("a".to_string(), 1);
        cache.write().unwrap().insert("b".to_string(), 2);
        assert_eq!(cache.read().unwrap().len(), 2);
    }
}
