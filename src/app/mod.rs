//! Composition root: wires configuration, the two connection pools, the
//! dimension/key/promotion layers, the three signal storages, the gRPC receiver
//! and the readiness supervisor together, and owns the process's
//! graceful-shutdown sequencing. Shared state is constructed once and handed to a
//! `serve` routine that owns the listener and the shutdown signal.

pub mod tracing;

use crate::config::{self, Settings};
use crate::db::Pools;
use crate::dimensions::{MetricDimensionManager, ResourceManager, ScopeManager};
use crate::error::IngestError;
use crate::promotion::PromotionPolicy;
use crate::readiness::ReadinessSupervisor;
use crate::receiver::Receiver;
use crate::registry::KeyRegistry;
use crate::storage::{LogsStorage, MetricsStorage, TracesStorage};
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Application entry point: loads configuration, stands up storage and the
/// receiver, and blocks until a shutdown signal is received.
pub async fn run() -> Result<(), IngestError> {
    let settings = config::get_configuration()?;
    tracing::init_tracing(&settings.log_format);
    ::tracing::info!(database_url = %settings.redacted_database_url(), "loaded configuration");

    let shutdown_token = CancellationToken::new();

    let pools = Pools::connect(&settings).await?;
    let policy = load_promotion_policy(&settings)?;

    let traces = Arc::new(build_traces_storage(&pools, &settings, policy.clone()));
    let logs = Arc::new(build_logs_storage(&pools, &settings, policy.clone()));
    let metrics = Arc::new(build_metrics_storage(&pools, &settings, policy));

    let receiver = Receiver::new(traces, logs, metrics, settings.worker_pool_size);
    let addr = format!("0.0.0.0:{}", settings.ingest_port)
        .parse()
        .map_err(|e| IngestError::ConfigFatal(format!("invalid ingest_port: {e}")))?;
    let health_reporter = receiver.serve(addr, shutdown_token.clone()).await?;

    let readiness = ReadinessSupervisor::new(
        pools.autocommit.clone(),
        settings.readiness_poll_interval_secs,
    );
    let readiness_handle = tokio::spawn(readiness.run(health_reporter, shutdown_token.clone()));

    wait_for_shutdown_signal().await;
    ::tracing::info!("shutdown signal received, draining");
    shutdown_token.cancel();
    let _ = readiness_handle.await;
    pools.close().await;
    ::tracing::info!("shutdown complete");

    Ok(())
}

fn load_promotion_policy(settings: &Settings) -> Result<PromotionPolicy, IngestError> {
    let base_path = Path::new(&settings.base_promotion_config_path);
    let override_path = settings.override_promotion_config_path.as_deref().map(Path::new);
    PromotionPolicy::load(base_path, override_path)
}

fn build_traces_storage(pools: &Pools, settings: &Settings, policy: PromotionPolicy) -> TracesStorage {
    TracesStorage::new(
        pools.clone(),
        ResourceManager::new(
            pools.autocommit.clone(),
            settings.last_seen_threshold_secs,
            settings.dimension_cache_ttl_secs,
        ),
        ScopeManager::new(
            pools.autocommit.clone(),
            settings.last_seen_threshold_secs,
            settings.dimension_cache_ttl_secs,
        ),
        KeyRegistry::new(pools.autocommit.clone()),
        policy,
    )
}

fn build_logs_storage(pools: &Pools, settings: &Settings, policy: PromotionPolicy) -> LogsStorage {
    LogsStorage::new(
        pools.clone(),
        ResourceManager::new(
            pools.autocommit.clone(),
            settings.last_seen_threshold_secs,
            settings.dimension_cache_ttl_secs,
        ),
        ScopeManager::new(
            pools.autocommit.clone(),
            settings.last_seen_threshold_secs,
            settings.dimension_cache_ttl_secs,
        ),
        KeyRegistry::new(pools.autocommit.clone()),
        policy,
    )
}

fn build_metrics_storage(
    pools: &Pools,
    settings: &Settings,
    policy: PromotionPolicy,
) -> MetricsStorage {
    MetricsStorage::new(
        pools.clone(),
        ResourceManager::new(
            pools.autocommit.clone(),
            settings.last_seen_threshold_secs,
            settings.dimension_cache_ttl_secs,
        ),
        ScopeManager::new(
            pools.autocommit.clone(),
            settings.last_seen_threshold_secs,
            settings.dimension_cache_ttl_secs,
        ),
        MetricDimensionManager::new(
            pools.autocommit.clone(),
            settings.last_seen_threshold_secs,
            settings.dimension_cache_ttl_secs,
        ),
        KeyRegistry::new(pools.autocommit.clone()),
        policy,
    )
}

/// Waits for either SIGINT or (on unix) SIGTERM.
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => ::tracing::info!("received SIGINT"),
        () = terminate => ::tracing::info!("received SIGTERM"),
    }
}
