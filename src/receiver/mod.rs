//! Receiver: terminates OTLP gRPC for all three signals and feeds the signal
//! storages. Binds one tonic gRPC server carrying three `Export` services plus
//! the standard gRPC health-checking protocol (`tonic-health`, since `tonic`
//! itself only supplies transport, not the health proto).

pub mod backpressure;
pub mod convert;
mod services;

use crate::error::IngestError;
use crate::storage::{LogsStorage, MetricsStorage, TracesStorage};
use backpressure::Backpressure;
use opentelemetry_proto::tonic::collector::logs::v1::logs_service_server::LogsServiceServer;
use opentelemetry_proto::tonic::collector::metrics::v1::metrics_service_server::MetricsServiceServer;
use opentelemetry_proto::tonic::collector::trace::v1::trace_service_server::TraceServiceServer;
use services::{LogsServiceImpl, MetricsServiceImpl, TraceServiceImpl};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tonic_health::server::HealthReporter;
use tracing::info;

/// The "readiness" channel name the health service reports on, distinct from the
/// empty-string channel that always reports serving while the process is up.
pub const READINESS_SERVICE_NAME: &str = "readiness";

pub struct Receiver {
    traces: Arc<TracesStorage>,
    logs: Arc<LogsStorage>,
    metrics: Arc<MetricsStorage>,
    backpressure: Arc<Backpressure>,
}

impl Receiver {
    #[must_use]
    pub fn new(
        traces: Arc<TracesStorage>,
        logs: Arc<LogsStorage>,
        metrics: Arc<MetricsStorage>,
        worker_pool_size: usize,
    ) -> Self {
        // The queue depth beyond the active worker pool has no dedicated config
        // field; 4x the worker pool size is a generous but bounded multiple so
        // short bursts queue instead of bouncing immediately.
        let backpressure = Arc::new(Backpressure::new(worker_pool_size, worker_pool_size * 4));
        Self {
            traces,
            logs,
            metrics,
            backpressure,
        }
    }

    /// Binds `addr` and serves the three OTLP services plus gRPC health until
    /// `shutdown` is cancelled. Liveness is set `SERVING` immediately (the process
    /// is up); readiness starts `NOT_SERVING` and is driven by the readiness
    /// supervisor via the returned `HealthReporter`.
    pub async fn serve(
        self,
        addr: SocketAddr,
        shutdown: CancellationToken,
    ) -> Result<HealthReporter, IngestError> {
        let (mut health_reporter, health_service) = tonic_health::server::health_reporter();
        health_reporter.set_service_status("", tonic_health::ServingStatus::Serving).await;
        health_reporter
            .set_service_status(READINESS_SERVICE_NAME, tonic_health::ServingStatus::NotServing)
            .await;

        let trace_service =
            TraceServiceServer::new(TraceServiceImpl::new(self.traces, self.backpressure.clone()));
        let logs_service =
            LogsServiceServer::new(LogsServiceImpl::new(self.logs, self.backpressure.clone()));
        let metrics_service =
            MetricsServiceServer::new(MetricsServiceImpl::new(self.metrics, self.backpressure));

        info!(%addr, "OTLP gRPC receiver listening");
        let reporter_for_readiness = health_reporter.clone();

        tokio::spawn(async move {
            let result = Server::builder()
                .add_service(health_service)
                .add_service(trace_service)
                .add_service(logs_service)
                .add_service(metrics_service)
                .serve_with_shutdown(addr, shutdown.cancelled_owned())
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "OTLP gRPC receiver terminated with error");
            }
        });

        Ok(reporter_for_readiness)
    }
}
