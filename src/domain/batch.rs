//! Neutral batch structures the receiver builds from OTLP wire messages and the
//! signal storages consume. These carry raw wire-shaped fields (trace ids as bytes,
//! enum discriminants as `i32`) rather than pre-normalized domain values — the
//! per-record normalization (hex encoding, enum mapping, timestamp split) happens
//! once, in the signal storage, right before the row is written.

use super::value::AnyValue;
use serde::Serialize;

#[derive(Debug, Clone, Default)]
pub struct ResourceInput {
    pub attributes: Vec<(String, AnyValue)>,
    pub schema_url: String,
    pub dropped_attributes_count: u32,
}

#[derive(Debug, Clone, Default)]
pub struct ScopeInput {
    pub name: String,
    pub version: String,
    pub schema_url: String,
    pub attributes: Vec<(String, AnyValue)>,
    pub dropped_attributes_count: u32,
}

#[derive(Debug, Clone)]
pub struct LogRecordInput {
    pub resource: ResourceInput,
    pub scope: ScopeInput,
    pub time_unix_nano: u64,
    pub observed_time_unix_nano: u64,
    pub severity_number: i32,
    pub severity_text: String,
    pub body: Option<AnyValue>,
    pub attributes: Vec<(String, AnyValue)>,
    pub dropped_attributes_count: u32,
    pub trace_id: Vec<u8>,
    pub span_id: Vec<u8>,
    pub flags: u32,
}

#[derive(Debug, Clone)]
pub struct SpanEventInput {
    pub time_unix_nano: u64,
    pub name: String,
    pub attributes: Vec<(String, AnyValue)>,
    pub dropped_attributes_count: u32,
}

#[derive(Debug, Clone)]
pub struct SpanLinkInput {
    pub trace_id: Vec<u8>,
    pub span_id: Vec<u8>,
    pub trace_state: String,
    pub attributes: Vec<(String, AnyValue)>,
    pub dropped_attributes_count: u32,
}

#[derive(Debug, Clone)]
pub struct SpanRecordInput {
    pub resource: ResourceInput,
    pub scope: ScopeInput,
    pub trace_id: Vec<u8>,
    pub span_id: Vec<u8>,
    pub parent_span_id: Vec<u8>,
    pub trace_state: String,
    pub name: String,
    pub kind: i32,
    pub start_time_unix_nano: u64,
    pub end_time_unix_nano: u64,
    pub attributes: Vec<(String, AnyValue)>,
    pub dropped_attributes_count: u32,
    pub events: Vec<SpanEventInput>,
    pub dropped_events_count: u32,
    pub links: Vec<SpanLinkInput>,
    pub dropped_links_count: u32,
    pub status_code: i32,
    pub status_message: String,
    pub flags: u32,
}

/// Opaque exemplar, serialized as-is into the data point's `exemplars` JSON column.
#[derive(Debug, Clone, Serialize)]
pub struct ExemplarInput {
    pub time_unix_nano: u64,
    pub value_int: Option<i64>,
    pub value_double: Option<f64>,
    pub span_id: String,
    pub trace_id: String,
    pub filtered_attributes: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct NumberDataPointInput {
    pub attributes: Vec<(String, AnyValue)>,
    pub start_time_unix_nano: u64,
    pub time_unix_nano: u64,
    pub flags: u32,
    pub exemplars: Vec<ExemplarInput>,
    pub value_int: Option<i64>,
    pub value_double: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct HistogramDataPointInput {
    pub attributes: Vec<(String, AnyValue)>,
    pub start_time_unix_nano: u64,
    pub time_unix_nano: u64,
    pub flags: u32,
    pub exemplars: Vec<ExemplarInput>,
    pub count: u64,
    pub sum: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub bucket_counts: Vec<u64>,
    pub explicit_bounds: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct ExponentialHistogramDataPointInput {
    pub attributes: Vec<(String, AnyValue)>,
    pub start_time_unix_nano: u64,
    pub time_unix_nano: u64,
    pub flags: u32,
    pub exemplars: Vec<ExemplarInput>,
    pub count: u64,
    pub sum: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub scale: i32,
    pub zero_count: u64,
    pub positive_offset: i32,
    pub positive_bucket_counts: Vec<u64>,
    pub negative_offset: i32,
    pub negative_bucket_counts: Vec<u64>,
}

#[derive(Debug, Clone)]
pub struct SummaryDataPointInput {
    pub attributes: Vec<(String, AnyValue)>,
    pub start_time_unix_nano: u64,
    pub time_unix_nano: u64,
    pub flags: u32,
    pub count: u64,
    pub sum: f64,
    /// `(quantile, value)` pairs, stored opaquely as JSON.
    pub quantile_values: Vec<(f64, f64)>,
}

#[derive(Debug, Clone)]
pub enum DataPointInput {
    Number(NumberDataPointInput),
    Histogram(HistogramDataPointInput),
    ExponentialHistogram(ExponentialHistogramDataPointInput),
    Summary(SummaryDataPointInput),
}

#[derive(Debug, Clone)]
pub struct MetricRecordInput {
    pub resource: ResourceInput,
    pub scope: ScopeInput,
    pub name: String,
    pub description: String,
    pub unit: String,
    pub temporality: Option<i32>,
    pub is_monotonic: Option<bool>,
    pub data_points: Vec<DataPointInput>,
}
