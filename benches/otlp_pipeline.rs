use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use opentelemetry_proto::tonic::{
    collector::{logs::v1::ExportLogsServiceRequest, trace::v1::ExportTraceServiceRequest},
    common::v1::{any_value, AnyValue, InstrumentationScope, KeyValue},
    logs::v1::{LogRecord, ResourceLogs, ScopeLogs},
    resource::v1::Resource,
    trace::v1::{ResourceSpans, ScopeSpans, Span, Status},
};
use otelstore::dimensions::hash::resource_hash;
use otelstore::domain::value::convert_key_values;
use otelstore::receiver::convert::{convert_logs_request, convert_trace_request};

fn make_attributes(n: usize) -> Vec<KeyValue> {
    (0..n)
        .map(|i| KeyValue {
            key: format!("key_{i}"),
            value: Some(AnyValue {
                value: Some(any_value::Value::StringValue(format!("value_{i}"))),
            }),
        })
        .collect()
}

fn make_log_request(n_logs: usize) -> ExportLogsServiceRequest {
    let records: Vec<LogRecord> = (0..n_logs)
        .map(|i| LogRecord {
            time_unix_nano: 1_700_000_000_000_000_000 + i as u64,
            observed_time_unix_nano: 1_700_000_000_000_000_000 + i as u64,
            trace_id: vec![0x01; 16],
            span_id: vec![0x02; 8],
            flags: 1,
            severity_text: "INFO".to_string(),
            severity_number: 9,
            body: Some(AnyValue {
                value: Some(any_value::Value::StringValue(format!(
                    "log message number {i}"
                ))),
            }),
            attributes: make_attributes(5),
            ..Default::default()
        })
        .collect();

    ExportLogsServiceRequest {
        resource_logs: vec![ResourceLogs {
            resource: Some(Resource {
                attributes: vec![KeyValue {
                    key: "service.name".to_string(),
                    value: Some(AnyValue {
                        value: Some(any_value::Value::StringValue("bench-service".to_string())),
                    }),
                }],
                ..Default::default()
            }),
            scope_logs: vec![ScopeLogs {
                scope: Some(InstrumentationScope {
                    name: "bench-scope".to_string(),
                    version: "1.0.0".to_string(),
                    ..Default::default()
                }),
                log_records: records,
                ..Default::default()
            }],
            ..Default::default()
        }],
    }
}

fn make_trace_request(n_spans: usize) -> ExportTraceServiceRequest {
    let spans: Vec<Span> = (0..n_spans)
        .map(|i| Span {
            trace_id: vec![0x01; 16],
            span_id: vec![0x02; 8],
            parent_span_id: vec![0x03; 8],
            name: format!("span-{i}"),
            kind: 2,
            start_time_unix_nano: 1_700_000_000_000_000_000,
            end_time_unix_nano: 1_700_000_000_000_000_000 + 1_000_000,
            attributes: make_attributes(8),
            status: Some(Status {
                code: 1,
                message: String::new(),
            }),
            ..Default::default()
        })
        .collect();

    ExportTraceServiceRequest {
        resource_spans: vec![ResourceSpans {
            resource: Some(Resource {
                attributes: vec![KeyValue {
                    key: "service.name".to_string(),
                    value: Some(AnyValue {
                        value: Some(any_value::Value::StringValue("bench-service".to_string())),
                    }),
                }],
                ..Default::default()
            }),
            scope_spans: vec![ScopeSpans {
                spans,
                ..Default::default()
            }],
            ..Default::default()
        }],
    }
}

fn bench_otlp_log_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("otlp_log_pipeline");

    for size in [10, 100, 1000] {
        let request = make_log_request(size);
        group.bench_with_input(BenchmarkId::new("convert", size), &request, |b, req| {
            b.iter(|| convert_logs_request(black_box(req)));
        });
    }

    group.finish();
}

fn bench_otlp_trace_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("otlp_trace_pipeline");

    for size in [10, 100, 1000] {
        let request = make_trace_request(size);
        group.bench_with_input(BenchmarkId::new("convert", size), &request, |b, req| {
            b.iter(|| convert_trace_request(black_box(req)));
        });
    }

    group.finish();
}

fn bench_resource_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("resource_hash");

    for size in [1, 10, 50] {
        let wire_attrs = make_attributes(size);
        let attrs = convert_key_values(&wire_attrs);
        group.bench_with_input(BenchmarkId::new("hash", size), &attrs, |b, attrs| {
            b.iter(|| resource_hash(black_box(attrs)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_otlp_log_pipeline,
    bench_otlp_trace_pipeline,
    bench_resource_hash,
);
criterion_main!(benches);
