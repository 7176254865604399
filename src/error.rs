use thiserror::Error;

/// The error taxonomy driving every recovery decision in the ingestion core.
///
/// Each variant maps to exactly one recovery locality: config fatals halt startup,
/// schema-not-ready and record-invalid recover without failing the caller's batch,
/// and the two batch-level variants differ only in whether the RPC status returned
/// upstream is retryable.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("configuration error: {0}")]
    ConfigFatal(String),

    #[error("schema not ready: {0}")]
    SchemaNotReady(String),

    #[error("record invalid: {0}")]
    RecordInvalid(String),

    #[error("batch transient error: {0}")]
    BatchTransient(String),

    #[error("batch permanent error (correlation_id={correlation_id}): {message}")]
    BatchPermanent {
        message: String,
        correlation_id: String,
    },

    #[error("request cancelled")]
    Cancelled,
}

impl From<sqlx::Error> for IngestError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                Self::BatchTransient(e.to_string())
            }
            sqlx::Error::Database(db_err) if is_transient_db_error(db_err.code().as_deref()) => {
                Self::BatchTransient(e.to_string())
            }
            _ => Self::BatchPermanent {
                message: e.to_string(),
                correlation_id: uuid_like_correlation_id(),
            },
        }
    }
}

impl From<config::ConfigError> for IngestError {
    fn from(e: config::ConfigError) -> Self {
        Self::ConfigFatal(e.to_string())
    }
}

impl From<serde_yaml::Error> for IngestError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::ConfigFatal(e.to_string())
    }
}

impl From<std::io::Error> for IngestError {
    fn from(e: std::io::Error) -> Self {
        Self::ConfigFatal(e.to_string())
    }
}

/// Maps the error onto the `tonic::Status` the receiver returns upstream.
///
/// `SchemaNotReady` and `BatchTransient` are retryable (`Unavailable`); everything
/// else that reaches an RPC boundary is a terminal status for that call.
impl From<IngestError> for tonic::Status {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::SchemaNotReady(msg) => tonic::Status::unavailable(msg),
            IngestError::BatchTransient(msg) => tonic::Status::unavailable(msg),
            IngestError::BatchPermanent {
                message,
                correlation_id,
            } => tonic::Status::internal(format!("{message} (correlation_id={correlation_id})")),
            IngestError::Cancelled => tonic::Status::cancelled("request cancelled"),
            IngestError::RecordInvalid(msg) => tonic::Status::invalid_argument(msg),
            IngestError::ConfigFatal(msg) => tonic::Status::internal(msg),
        }
    }
}

/// SQLSTATE class 08 (connection exceptions) and 40001 (serialization failure) are
/// treated as transient; everything else is assumed permanent (constraint violation,
/// data corruption) unless proven otherwise.
fn is_transient_db_error(code: Option<&str>) -> bool {
    matches!(code, Some(c) if c.starts_with("08") || c == "40001" || c == "40P01")
}

fn uuid_like_correlation_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{nanos:032x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_fatal_display() {
        let err = IngestError::ConfigFatal("missing base promotion config".into());
        assert!(err.to_string().contains("configuration error"));
    }

    #[test]
    fn test_schema_not_ready_maps_to_unavailable() {
        let status: tonic::Status = IngestError::SchemaNotReady("missing table".into()).into();
        assert_eq!(status.code(), tonic::Code::Unavailable);
    }

    #[test]
    fn test_batch_transient_maps_to_unavailable() {
        let status: tonic::Status = IngestError::BatchTransient("connection reset".into()).into();
        assert_eq!(status.code(), tonic::Code::Unavailable);
    }

    #[test]
    fn test_batch_permanent_maps_to_internal_and_carries_correlation_id() {
        let status: tonic::Status = IngestError::BatchPermanent {
            message: "check constraint violated".into(),
            correlation_id: "deadbeef".into(),
        }
        .into();
        assert_eq!(status.code(), tonic::Code::Internal);
        assert!(status.message().contains("deadbeef"));
    }

    #[test]
    fn test_cancelled_maps_to_cancelled_status() {
        let status: tonic::Status = IngestError::Cancelled.into();
        assert_eq!(status.code(), tonic::Code::Cancelled);
    }

    #[test]
    fn test_record_invalid_maps_to_invalid_argument() {
        let status: tonic::Status = IngestError::RecordInvalid("trace_id not 16 bytes".into()).into();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }

    #[test]
    fn test_error_implements_std_error() {
        fn assert_error<E: std::error::Error>() {}
        assert_error::<IngestError>();
    }

    #[test]
    fn test_transient_db_error_classification() {
        assert!(is_transient_db_error(Some("08006")));
        assert!(is_transient_db_error(Some("40001")));
        assert!(is_transient_db_error(Some("40P01")));
        assert!(!is_transient_db_error(Some("23505")));
        assert!(!is_transient_db_error(None));
    }
}
