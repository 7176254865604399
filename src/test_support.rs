//! Shared test fixtures for the domain batch types: one place for the small
//! values every test otherwise builds by hand. Builders for the neutral
//! `domain::batch` structs.

use crate::domain::batch::{LogRecordInput, ResourceInput, ScopeInput, SpanRecordInput};
use crate::domain::value::AnyValue;

#[must_use]
pub fn sample_resource() -> ResourceInput {
    ResourceInput {
        attributes: vec![("service.name".to_string(), AnyValue::String("test-service".to_string()))],
        schema_url: "https://opentelemetry.io/schemas/1.27.0".to_string(),
        dropped_attributes_count: 0,
    }
}

#[must_use]
pub fn sample_scope() -> ScopeInput {
    ScopeInput {
        name: "test-instrumentation".to_string(),
        version: "1.0.0".to_string(),
        schema_url: String::new(),
        attributes: Vec::new(),
        dropped_attributes_count: 0,
    }
}

#[must_use]
pub fn sample_log_record() -> LogRecordInput {
    LogRecordInput {
        resource: sample_resource(),
        scope: sample_scope(),
        time_unix_nano: 1_700_000_000_000_000_000,
        observed_time_unix_nano: 1_700_000_000_000_000_000,
        severity_number: 9,
        severity_text: "INFO".to_string(),
        body: Some(AnyValue::String("hello".to_string())),
        attributes: Vec::new(),
        dropped_attributes_count: 0,
        trace_id: vec![0u8; 16],
        span_id: vec![0u8; 8],
        flags: 0,
    }
}

#[must_use]
pub fn sample_span_record() -> SpanRecordInput {
    SpanRecordInput {
        resource: sample_resource(),
        scope: sample_scope(),
        trace_id: vec![1u8; 16],
        span_id: vec![2u8; 8],
        parent_span_id: Vec::new(),
        trace_state: String::new(),
        name: "test-span".to_string(),
        kind: 1,
        start_time_unix_nano: 1_700_000_000_000_000_000,
        end_time_unix_nano: 1_700_000_000_001_000_000,
        attributes: Vec::new(),
        dropped_attributes_count: 0,
        events: Vec::new(),
        dropped_events_count: 0,
        links: Vec::new(),
        dropped_links_count: 0,
        status_code: 0,
        status_message: String::new(),
        flags: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_span_record_has_valid_id_lengths() {
        let span = sample_span_record();
        assert_eq!(span.trace_id.len(), 16);
        assert_eq!(span.span_id.len(), 8);
    }
}
