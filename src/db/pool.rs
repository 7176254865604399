//! Two-pool builder: an autocommit pool for dimension upserts and a transactional
//! pool from which signal storages open one `Transaction` per batch.
//! Both point at the same DSN; they differ only in how callers are expected to use
//! them, never in connection-level settings that would make one "autocommit" in a
//! literal sense — the contract is enforced by convention (never call `.begin()` on
//! the autocommit pool), not by a server-side session setting.

use crate::config::Settings;
use crate::error::IngestError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// The two connection pools every component downstream of the composition root is
/// constructed with.
#[derive(Clone)]
pub struct Pools {
    pub autocommit: PgPool,
    pub transactional: PgPool,
}

impl Pools {
    pub async fn connect(settings: &Settings) -> Result<Self, IngestError> {
        let autocommit = PgPoolOptions::new()
            .max_connections(settings.autocommit_pool_size)
            .connect(&settings.database_url)
            .await?;
        let transactional = PgPoolOptions::new()
            .max_connections(settings.transactional_pool_size)
            .connect(&settings.database_url)
            .await?;
        Ok(Self {
            autocommit,
            transactional,
        })
    }

    /// Closes both pools, waiting for in-flight connections to finish their current
    /// statement or transaction. Called once, from the shutdown path.
    pub async fn close(&self) {
        self.autocommit.close().await;
        self.transactional.close().await;
    }
}
