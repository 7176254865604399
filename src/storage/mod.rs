//! Signal storages: `LogsStorage`/`TracesStorage`/`MetricsStorage` share the same
//! pipeline shape — dimension upsert on the autocommit pool, one transaction per
//! batch for facts and their promoted attributes — expressed here as a common
//! `SignalStorage` trait rather than three unrelated structs with a same-named
//! method.

pub mod logs;
pub mod metrics;
pub mod traces;

pub use logs::LogsStorage;
pub use metrics::MetricsStorage;
pub use traces::TracesStorage;

use crate::error::IngestError;

/// Per-batch result: how many records were written versus dropped as
/// `RecordInvalid`. The receiver folds this into the OTLP response's
/// `partial_success` field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOutcome {
    pub accepted: usize,
    pub rejected: usize,
}

impl StoreOutcome {
    fn record(&mut self, ok: bool) {
        if ok {
            self.accepted += 1;
        } else {
            self.rejected += 1;
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait SignalStorage {
    type Batch;

    async fn store(&self, batch: Self::Batch) -> Result<StoreOutcome, IngestError>;
}
