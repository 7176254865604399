//! Tonic service implementations for the three OTLP `Export` RPCs: admit, convert
//! the wire request to the neutral domain batch, store, and respond with a
//! partial-success summary.

use super::backpressure::Backpressure;
use super::convert::{convert_logs_request, convert_metrics_request, convert_trace_request};
use crate::storage::{LogsStorage, MetricsStorage, SignalStorage, StoreOutcome, TracesStorage};
use opentelemetry_proto::tonic::collector::logs::v1::{
    logs_service_server::LogsService, ExportLogsPartialSuccess, ExportLogsServiceRequest,
    ExportLogsServiceResponse,
};
use opentelemetry_proto::tonic::collector::metrics::v1::{
    metrics_service_server::MetricsService, ExportMetricsPartialSuccess,
    ExportMetricsServiceRequest, ExportMetricsServiceResponse,
};
use opentelemetry_proto::tonic::collector::trace::v1::{
    trace_service_server::TraceService, ExportTracePartialSuccess, ExportTraceServiceRequest,
    ExportTraceServiceResponse,
};
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{info, instrument};

fn partial_success_message(outcome: StoreOutcome) -> Option<String> {
    (outcome.rejected > 0).then(|| {
        format!(
            "{} of {} records dropped as invalid",
            outcome.rejected,
            outcome.accepted + outcome.rejected
        )
    })
}

pub struct TraceServiceImpl {
    storage: Arc<TracesStorage>,
    backpressure: Arc<Backpressure>,
}

impl TraceServiceImpl {
    #[must_use]
    pub fn new(storage: Arc<TracesStorage>, backpressure: Arc<Backpressure>) -> Self {
        Self { storage, backpressure }
    }
}

#[tonic::async_trait]
impl TraceService for TraceServiceImpl {
    #[instrument(skip_all, name = "otlp_export_traces")]
    async fn export(
        &self,
        request: Request<ExportTraceServiceRequest>,
    ) -> Result<Response<ExportTraceServiceResponse>, Status> {
        let _permit = self.backpressure.admit().await?;
        let batch = convert_trace_request(request.get_ref());
        let batch_len = batch.len();
        let outcome = self.storage.store(batch).await?;
        info!(signal = "spans", batch_size = batch_len, accepted = outcome.accepted, "export handled");

        Ok(Response::new(ExportTraceServiceResponse {
            partial_success: partial_success_message(outcome).map(|error_message| {
                ExportTracePartialSuccess {
                    rejected_spans: outcome.rejected as i64,
                    error_message,
                }
            }),
        }))
    }
}

pub struct LogsServiceImpl {
    storage: Arc<LogsStorage>,
    backpressure: Arc<Backpressure>,
}

impl LogsServiceImpl {
    #[must_use]
    pub fn new(storage: Arc<LogsStorage>, backpressure: Arc<Backpressure>) -> Self {
        Self { storage, backpressure }
    }
}

#[tonic::async_trait]
impl LogsService for LogsServiceImpl {
    #[instrument(skip_all, name = "otlp_export_logs")]
    async fn export(
        &self,
        request: Request<ExportLogsServiceRequest>,
    ) -> Result<Response<ExportLogsServiceResponse>, Status> {
        let _permit = self.backpressure.admit().await?;
        let batch = convert_logs_request(request.get_ref());
        let batch_len = batch.len();
        let outcome = self.storage.store(batch).await?;
        info!(signal = "logs", batch_size = batch_len, accepted = outcome.accepted, "export handled");

        Ok(Response::new(ExportLogsServiceResponse {
            partial_success: partial_success_message(outcome).map(|error_message| {
                ExportLogsPartialSuccess {
                    rejected_log_records: outcome.rejected as i64,
                    error_message,
                }
            }),
        }))
    }
}

pub struct MetricsServiceImpl {
    storage: Arc<MetricsStorage>,
    backpressure: Arc<Backpressure>,
}

impl MetricsServiceImpl {
    #[must_use]
    pub fn new(storage: Arc<MetricsStorage>, backpressure: Arc<Backpressure>) -> Self {
        Self { storage, backpressure }
    }
}

#[tonic::async_trait]
impl MetricsService for MetricsServiceImpl {
    #[instrument(skip_all, name = "otlp_export_metrics")]
    async fn export(
        &self,
        request: Request<ExportMetricsServiceRequest>,
    ) -> Result<Response<ExportMetricsServiceResponse>, Status> {
        let _permit = self.backpressure.admit().await?;
        let batch = convert_metrics_request(request.get_ref());
        let batch_len = batch.len();
        let outcome = self.storage.store(batch).await?;
        info!(signal = "metrics", batch_size = batch_len, accepted = outcome.accepted, "export handled");

        Ok(Response::new(ExportMetricsServiceResponse {
            partial_success: partial_success_message(outcome).map(|error_message| {
                ExportMetricsPartialSuccess {
                    rejected_data_points: outcome.rejected as i64,
                    error_message,
                }
            }),
        }))
    }
}
