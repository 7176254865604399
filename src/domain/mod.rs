//! Neutral, wire-independent domain model the receiver converts OTLP messages into
//! before handing batches to the signal storages.

pub mod batch;
pub mod enums;
pub mod ids;
pub mod value;

pub use batch::{
    LogRecordInput, MetricRecordInput, NumberDataPointInput, HistogramDataPointInput,
    ExponentialHistogramDataPointInput, SummaryDataPointInput, DataPointInput,
    ResourceInput, ScopeInput, SpanEventInput, SpanLinkInput, SpanRecordInput,
};
pub use enums::{
    AggregationTemporality, LogBodyType, LogSeverityNumber, MetricType, SpanKind, StatusCode,
};
pub use value::AnyValue;
