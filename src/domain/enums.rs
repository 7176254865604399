//! Enum reference tables, mirrored from the pre-seeded read-only dimension tables.
//! Ids here must stay in lockstep with the migration artifact's seed rows — these
//! are not derived from the database at runtime, they are the contract the core
//! assumes the schema honors.

use serde::{Deserialize, Serialize};

/// OTLP `SpanKind`, matching `span_kinds` (0-5).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[repr(i16)]
pub enum SpanKind {
    #[default]
    Unspecified = 0,
    Internal = 1,
    Server = 2,
    Client = 3,
    Producer = 4,
    Consumer = 5,
}

impl From<i32> for SpanKind {
    fn from(value: i32) -> Self {
        match value {
            1 => Self::Internal,
            2 => Self::Server,
            3 => Self::Client,
            4 => Self::Producer,
            5 => Self::Consumer,
            _ => Self::Unspecified,
        }
    }
}

impl SpanKind {
    #[must_use]
    pub const fn id(self) -> i16 {
        self as i16
    }
}

/// OTLP `StatusCode`, matching `status_codes` (0-2).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[repr(i16)]
pub enum StatusCode {
    #[default]
    Unset = 0,
    Ok = 1,
    Error = 2,
}

impl From<i32> for StatusCode {
    fn from(value: i32) -> Self {
        match value {
            1 => Self::Ok,
            2 => Self::Error,
            _ => Self::Unset,
        }
    }
}

impl StatusCode {
    #[must_use]
    pub const fn id(self) -> i16 {
        self as i16
    }
}

/// OTLP log `SeverityNumber`, matching `log_severity_numbers` (0-24). `display_order`
/// in the reference table equals the numeric id, so no separate mapping is kept here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[repr(i16)]
pub enum LogSeverityNumber {
    #[default]
    Unspecified = 0,
    Trace = 1,
    Trace2 = 2,
    Trace3 = 3,
    Trace4 = 4,
    Debug = 5,
    Debug2 = 6,
    Debug3 = 7,
    Debug4 = 8,
    Info = 9,
    Info2 = 10,
    Info3 = 11,
    Info4 = 12,
    Warn = 13,
    Warn2 = 14,
    Warn3 = 15,
    Warn4 = 16,
    Error = 17,
    Error2 = 18,
    Error3 = 19,
    Error4 = 20,
    Fatal = 21,
    Fatal2 = 22,
    Fatal3 = 23,
    Fatal4 = 24,
}

impl From<i32> for LogSeverityNumber {
    fn from(value: i32) -> Self {
        match value {
            1 => Self::Trace,
            2 => Self::Trace2,
            3 => Self::Trace3,
            4 => Self::Trace4,
            5 => Self::Debug,
            6 => Self::Debug2,
            7 => Self::Debug3,
            8 => Self::Debug4,
            9 => Self::Info,
            10 => Self::Info2,
            11 => Self::Info3,
            12 => Self::Info4,
            13 => Self::Warn,
            14 => Self::Warn2,
            15 => Self::Warn3,
            16 => Self::Warn4,
            17 => Self::Error,
            18 => Self::Error2,
            19 => Self::Error3,
            20 => Self::Error4,
            21 => Self::Fatal,
            22 => Self::Fatal2,
            23 => Self::Fatal3,
            24 => Self::Fatal4,
            _ => Self::Unspecified,
        }
    }
}

impl LogSeverityNumber {
    #[must_use]
    pub const fn id(self) -> i16 {
        self as i16
    }
}

/// OTLP log body `AnyValue` variant, matching `log_body_types` (0-7).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[repr(i16)]
pub enum LogBodyType {
    #[default]
    Empty = 0,
    String = 1,
    Int = 2,
    Double = 3,
    Bool = 4,
    Bytes = 5,
    Array = 6,
    KvList = 7,
}

impl LogBodyType {
    #[must_use]
    pub const fn id(self) -> i16 {
        self as i16
    }

    #[must_use]
    pub fn from_any_value(value: Option<&crate::domain::value::AnyValue>) -> Self {
        use crate::domain::value::AnyValue;
        match value {
            None => Self::Empty,
            Some(AnyValue::String(_)) => Self::String,
            Some(AnyValue::Int(_)) => Self::Int,
            Some(AnyValue::Double(_)) => Self::Double,
            Some(AnyValue::Bool(_)) => Self::Bool,
            Some(AnyValue::Bytes(_)) => Self::Bytes,
            Some(AnyValue::Array(_)) => Self::Array,
            Some(AnyValue::KvList(_)) => Self::KvList,
        }
    }
}

/// OTLP `MetricType`, matching `metric_types` (1-5; there is deliberately no 0/UNSPECIFIED
/// member since every metric data point arrives as one of these five concrete shapes).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[repr(i16)]
pub enum MetricType {
    Gauge = 1,
    Sum = 2,
    Histogram = 3,
    ExponentialHistogram = 4,
    Summary = 5,
}

impl MetricType {
    #[must_use]
    pub const fn id(self) -> i16 {
        self as i16
    }
}

/// OTLP `AggregationTemporality`, matching `aggregation_temporalities` (0-2).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[repr(i16)]
pub enum AggregationTemporality {
    #[default]
    Unspecified = 0,
    Delta = 1,
    Cumulative = 2,
}

impl From<i32> for AggregationTemporality {
    fn from(value: i32) -> Self {
        match value {
            1 => Self::Delta,
            2 => Self::Cumulative,
            _ => Self::Unspecified,
        }
    }
}

impl AggregationTemporality {
    #[must_use]
    pub const fn id(self) -> i16 {
        self as i16
    }
}
