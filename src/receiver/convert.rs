//! Wire-to-domain conversion: turns OTLP protobuf request messages into the
//! neutral `domain::batch` structures the signal storages consume, using the
//! typed `AnyValue` model the rest of this crate uses rather than a
//! string-keyed map.

use crate::domain::batch::{
    ExemplarInput, ExponentialHistogramDataPointInput, HistogramDataPointInput,
    LogRecordInput, MetricRecordInput, NumberDataPointInput, DataPointInput, ResourceInput,
    ScopeInput, SpanEventInput, SpanLinkInput, SpanRecordInput, SummaryDataPointInput,
};
use crate::domain::ids::{encode_span_id, encode_trace_id};
use crate::domain::value::{convert_key_values, AnyValue};
use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsServiceRequest;
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::common::v1::InstrumentationScope;
use opentelemetry_proto::tonic::logs::v1::LogRecord;
use opentelemetry_proto::tonic::metrics::v1::{
    exponential_histogram_data_point::Buckets, metric::Data, number_data_point,
    ExponentialHistogramDataPoint, HistogramDataPoint, Metric, NumberDataPoint, SummaryDataPoint,
};
use opentelemetry_proto::tonic::resource::v1::Resource;
use opentelemetry_proto::tonic::trace::v1::{span, Span};

fn convert_resource(resource: Option<&Resource>, schema_url: &str) -> ResourceInput {
    match resource {
        Some(r) => ResourceInput {
            attributes: convert_key_values(&r.attributes),
            schema_url: schema_url.to_string(),
            dropped_attributes_count: r.dropped_attributes_count,
        },
        None => ResourceInput {
            schema_url: schema_url.to_string(),
            ..Default::default()
        },
    }
}

fn convert_scope(scope: Option<&InstrumentationScope>, schema_url: &str) -> ScopeInput {
    match scope {
        Some(s) => ScopeInput {
            name: s.name.clone(),
            version: s.version.clone(),
            schema_url: schema_url.to_string(),
            attributes: convert_key_values(&s.attributes),
            dropped_attributes_count: s.dropped_attributes_count,
        },
        None => ScopeInput {
            schema_url: schema_url.to_string(),
            ..Default::default()
        },
    }
}

/// Converts one gRPC `Export` request for traces into the flat batch the
/// `TracesStorage` orchestrator consumes, carrying each span's resource/scope
/// identity alongside it so the storage can deduplicate per-batch.
#[must_use]
pub fn convert_trace_request(request: &ExportTraceServiceRequest) -> Vec<SpanRecordInput> {
    let mut out = Vec::new();
    for resource_spans in &request.resource_spans {
        let resource = convert_resource(resource_spans.resource.as_ref(), &resource_spans.schema_url);
        for scope_spans in &resource_spans.scope_spans {
            let scope = convert_scope(scope_spans.scope.as_ref(), &scope_spans.schema_url);
            for span in &scope_spans.spans {
                out.push(convert_span(span, resource.clone(), scope.clone()));
            }
        }
    }
    out
}

fn convert_span(span: &Span, resource: ResourceInput, scope: ScopeInput) -> SpanRecordInput {
    let (status_code, status_message) = match &span.status {
        Some(status) => (status.code, status.message.clone()),
        None => (0, String::new()),
    };

    SpanRecordInput {
        resource,
        scope,
        trace_id: span.trace_id.clone(),
        span_id: span.span_id.clone(),
        parent_span_id: span.parent_span_id.clone(),
        trace_state: span.trace_state.clone(),
        name: span.name.clone(),
        kind: span.kind,
        start_time_unix_nano: span.start_time_unix_nano,
        end_time_unix_nano: span.end_time_unix_nano,
        attributes: convert_key_values(&span.attributes),
        dropped_attributes_count: span.dropped_attributes_count,
        events: span.events.iter().map(convert_span_event).collect(),
        dropped_events_count: span.dropped_events_count,
        links: span.links.iter().map(convert_span_link).collect(),
        dropped_links_count: span.dropped_links_count,
        status_code,
        status_message,
        flags: span.flags,
    }
}

fn convert_span_event(event: &span::Event) -> SpanEventInput {
    SpanEventInput {
        time_unix_nano: event.time_unix_nano,
        name: event.name.clone(),
        attributes: convert_key_values(&event.attributes),
        dropped_attributes_count: event.dropped_attributes_count,
    }
}

fn convert_span_link(link: &span::Link) -> SpanLinkInput {
    SpanLinkInput {
        trace_id: link.trace_id.clone(),
        span_id: link.span_id.clone(),
        trace_state: link.trace_state.clone(),
        attributes: convert_key_values(&link.attributes),
        dropped_attributes_count: link.dropped_attributes_count,
    }
}

/// Converts one gRPC `Export` request for logs into the flat batch the
/// `LogsStorage` orchestrator consumes.
#[must_use]
pub fn convert_logs_request(request: &ExportLogsServiceRequest) -> Vec<LogRecordInput> {
    let mut out = Vec::new();
    for resource_logs in &request.resource_logs {
        let resource = convert_resource(resource_logs.resource.as_ref(), &resource_logs.schema_url);
        for scope_logs in &resource_logs.scope_logs {
            let scope = convert_scope(scope_logs.scope.as_ref(), &scope_logs.schema_url);
            for record in &scope_logs.log_records {
                out.push(convert_log_record(record, resource.clone(), scope.clone()));
            }
        }
    }
    out
}

fn convert_log_record(record: &LogRecord, resource: ResourceInput, scope: ScopeInput) -> LogRecordInput {
    LogRecordInput {
        resource,
        scope,
        time_unix_nano: record.time_unix_nano,
        observed_time_unix_nano: record.observed_time_unix_nano,
        severity_number: record.severity_number,
        severity_text: record.severity_text.clone(),
        body: record.body.as_ref().map(AnyValue::from),
        attributes: convert_key_values(&record.attributes),
        dropped_attributes_count: record.dropped_attributes_count,
        trace_id: record.trace_id.clone(),
        span_id: record.span_id.clone(),
        flags: record.flags,
    }
}

/// Converts one gRPC `Export` request for metrics into one `MetricRecordInput`
/// per metric descriptor (each carrying its own homogeneous data-point shape, per
/// the OTLP `Metric.data` oneof).
#[must_use]
pub fn convert_metrics_request(request: &ExportMetricsServiceRequest) -> Vec<MetricRecordInput> {
    let mut out = Vec::new();
    for resource_metrics in &request.resource_metrics {
        let resource = convert_resource(resource_metrics.resource.as_ref(), &resource_metrics.schema_url);
        for scope_metrics in &resource_metrics.scope_metrics {
            let scope = convert_scope(scope_metrics.scope.as_ref(), &scope_metrics.schema_url);
            for metric in &scope_metrics.metrics {
                if let Some(record) = convert_metric(metric, resource.clone(), scope.clone()) {
                    out.push(record);
                }
            }
        }
    }
    out
}

fn convert_metric(metric: &Metric, resource: ResourceInput, scope: ScopeInput) -> Option<MetricRecordInput> {
    let (temporality, is_monotonic, data_points) = match metric.data.as_ref()? {
        Data::Gauge(gauge) => (
            None,
            None,
            gauge.data_points.iter().map(convert_number_dp).collect(),
        ),
        Data::Sum(sum) => (
            Some(sum.aggregation_temporality),
            Some(sum.is_monotonic),
            sum.data_points.iter().map(convert_number_dp).collect(),
        ),
        Data::Histogram(hist) => (
            Some(hist.aggregation_temporality),
            None,
            hist.data_points.iter().map(convert_histogram_dp).collect(),
        ),
        Data::ExponentialHistogram(hist) => (
            Some(hist.aggregation_temporality),
            None,
            hist.data_points
                .iter()
                .map(convert_exp_histogram_dp)
                .collect(),
        ),
        Data::Summary(summary) => (
            None,
            None,
            summary.data_points.iter().map(convert_summary_dp).collect(),
        ),
    };

    Some(MetricRecordInput {
        resource,
        scope,
        name: metric.name.clone(),
        description: metric.description.clone(),
        unit: metric.unit.clone(),
        temporality,
        is_monotonic,
        data_points,
    })
}

fn convert_exemplars(exemplars: &[opentelemetry_proto::tonic::metrics::v1::Exemplar]) -> Vec<ExemplarInput> {
    exemplars
        .iter()
        .map(|e| {
            use opentelemetry_proto::tonic::metrics::v1::exemplar::Value;
            let (value_int, value_double) = match e.value {
                Some(Value::AsInt(i)) => (Some(i), None),
                Some(Value::AsDouble(d)) => (None, Some(d)),
                None => (None, None),
            };
            ExemplarInput {
                time_unix_nano: e.time_unix_nano,
                value_int,
                value_double,
                span_id: encode_span_id(&e.span_id),
                trace_id: encode_trace_id(&e.trace_id),
                filtered_attributes: convert_key_values(&e.filtered_attributes)
                    .into_iter()
                    .map(|(k, v)| (k, stringify(&v)))
                    .collect(),
            }
        })
        .collect()
}

/// Flattens an `AnyValue` to a display string for the opaque exemplar
/// `filtered_attributes` bag, which is stored as JSON rather than routed through
/// the promotion policy.
fn stringify(value: &AnyValue) -> String {
    match value {
        AnyValue::String(s) => s.clone(),
        AnyValue::Int(i) => i.to_string(),
        AnyValue::Double(d) => d.to_string(),
        AnyValue::Bool(b) => b.to_string(),
        AnyValue::Bytes(b) => hex::encode(b),
        AnyValue::Array(_) | AnyValue::KvList(_) => value.to_json().to_string(),
    }
}

fn convert_number_dp(dp: &NumberDataPoint) -> DataPointInput {
    let (value_int, value_double) = match dp.value {
        Some(number_data_point::Value::AsInt(i)) => (Some(i), None),
        Some(number_data_point::Value::AsDouble(d)) => (None, Some(d)),
        None => (None, None),
    };
    DataPointInput::Number(NumberDataPointInput {
        attributes: convert_key_values(&dp.attributes),
        start_time_unix_nano: dp.start_time_unix_nano,
        time_unix_nano: dp.time_unix_nano,
        flags: dp.flags,
        exemplars: convert_exemplars(&dp.exemplars),
        value_int,
        value_double,
    })
}

fn convert_histogram_dp(dp: &HistogramDataPoint) -> DataPointInput {
    DataPointInput::Histogram(HistogramDataPointInput {
        attributes: convert_key_values(&dp.attributes),
        start_time_unix_nano: dp.start_time_unix_nano,
        time_unix_nano: dp.time_unix_nano,
        flags: dp.flags,
        exemplars: convert_exemplars(&dp.exemplars),
        count: dp.count,
        sum: dp.sum,
        min: dp.min,
        max: dp.max,
        bucket_counts: dp.bucket_counts.clone(),
        explicit_bounds: dp.explicit_bounds.clone(),
    })
}

fn convert_exp_histogram_dp(dp: &ExponentialHistogramDataPoint) -> DataPointInput {
    let empty_buckets = Buckets::default();
    let positive = dp.positive.as_ref().unwrap_or(&empty_buckets);
    let negative = dp.negative.as_ref().unwrap_or(&empty_buckets);
    DataPointInput::ExponentialHistogram(ExponentialHistogramDataPointInput {
        attributes: convert_key_values(&dp.attributes),
        start_time_unix_nano: dp.start_time_unix_nano,
        time_unix_nano: dp.time_unix_nano,
        flags: dp.flags,
        exemplars: convert_exemplars(&dp.exemplars),
        count: dp.count,
        sum: dp.sum,
        min: dp.min,
        max: dp.max,
        scale: dp.scale,
        zero_count: dp.zero_count,
        positive_offset: positive.offset,
        positive_bucket_counts: positive.bucket_counts.clone(),
        negative_offset: negative.offset,
        negative_bucket_counts: negative.bucket_counts.clone(),
    })
}

fn convert_summary_dp(dp: &SummaryDataPoint) -> DataPointInput {
    DataPointInput::Summary(SummaryDataPointInput {
        attributes: convert_key_values(&dp.attributes),
        start_time_unix_nano: dp.start_time_unix_nano,
        time_unix_nano: dp.time_unix_nano,
        flags: dp.flags,
        count: dp.count,
        sum: dp.sum,
        quantile_values: dp
            .quantile_values
            .iter()
            .map(|q| (q.quantile, q.value))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
    use opentelemetry_proto::tonic::common::v1::{any_value, AnyValue as WireAnyValue, KeyValue};
    use opentelemetry_proto::tonic::resource::v1::Resource as WireResource;
    use opentelemetry_proto::tonic::trace::v1::{ResourceSpans, ScopeSpans};

    fn string_kv(key: &str, value: &str) -> KeyValue {
        KeyValue {
            key: key.to_string(),
            value: Some(WireAnyValue {
                value: Some(any_value::Value::StringValue(value.to_string())),
            }),
        }
    }

    #[test]
    fn test_convert_trace_request_carries_resource_into_every_span() {
        let request = ExportTraceServiceRequest {
            resource_spans: vec![ResourceSpans {
                resource: Some(WireResource {
                    attributes: vec![string_kv("service.name", "checkout")],
                    ..Default::default()
                }),
                scope_spans: vec![ScopeSpans {
                    scope: None,
                    spans: vec![
                        Span {
                            trace_id: (1..=16).collect(),
                            span_id: (1..=8).collect(),
                            name: "a".to_string(),
                            ..Default::default()
                        },
                        Span {
                            trace_id: (1..=16).collect(),
                            span_id: (9..=16).collect(),
                            name: "b".to_string(),
                            ..Default::default()
                        },
                    ],
                    schema_url: String::new(),
                }],
                schema_url: String::new(),
            }],
        };

        let spans = convert_trace_request(&request);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].resource.attributes.len(), 1);
        assert_eq!(spans[1].resource.attributes, spans[0].resource.attributes);
        assert_eq!(spans[0].name, "a");
        assert_eq!(spans[1].name, "b");
    }

    #[test]
    fn test_convert_span_maps_missing_status_to_unset() {
        let span = Span {
            trace_id: vec![1; 16],
            span_id: vec![1; 8],
            ..Default::default()
        };
        let record = convert_span(&span, ResourceInput::default(), ScopeInput::default());
        assert_eq!(record.status_code, 0);
        assert!(record.status_message.is_empty());
    }

    #[test]
    fn test_convert_number_dp_prefers_present_variant() {
        let dp = NumberDataPoint {
            value: Some(number_data_point::Value::AsDouble(1.5)),
            ..Default::default()
        };
        match convert_number_dp(&dp) {
            DataPointInput::Number(n) => {
                assert_eq!(n.value_double, Some(1.5));
                assert_eq!(n.value_int, None);
            }
            _ => panic!("expected Number variant"),
        }
    }

    #[test]
    fn test_stringify_renders_bytes_as_hex() {
        assert_eq!(stringify(&AnyValue::Bytes(vec![0xab, 0xcd])), "abcd");
    }
}
