//! Result types returned by a batch run.

use crate::error::RecordError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// What happened to one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RecordOutcome {
    /// The document was rendered and written.
    Written { path: PathBuf },
    /// The record failed validation; nothing was rendered.
    Skipped { reason: String },
    /// Filling, rendering or writing failed.
    Failed { error: RecordError },
    /// The batch was cancelled before this record started.
    Cancelled,
}

impl RecordOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, RecordOutcome::Written { .. })
    }

    /// Whether the record was attempted and therefore counts as processed.
    pub fn was_attempted(&self) -> bool {
        !matches!(self, RecordOutcome::Cancelled)
    }
}

/// Per-record entry in a [`BatchSummary`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordReport {
    /// 0-based position in the record set.
    pub index: usize,
    pub passenger_name: String,
    pub outcome: RecordOutcome,
    /// Wall-clock time spent on this record.
    pub duration_ms: u64,
    /// Worker slot that rendered the record, if it reached rendering.
    pub worker: Option<usize>,
}

/// Aggregate result of one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Records handed to the orchestrator.
    pub total: usize,
    /// Lines dropped by the parser (only set by the `convert*` entry points).
    pub malformed: usize,
    /// Records attempted (written + skipped + failed).
    pub processed: usize,
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Records never started because the batch was cancelled.
    pub cancelled: usize,
    pub was_cancelled: bool,
    /// Rendering handles constructed during the run.
    pub renderers_created: usize,
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
    /// `elapsed / total`; `None` for an empty batch.
    #[serde(with = "opt_duration_ms")]
    pub average_per_record: Option<Duration>,
    /// Reports sorted by `index`.
    pub records: Vec<RecordReport>,
}

impl BatchSummary {
    /// Paths of every artifact written, in record order.
    pub fn written_paths(&self) -> Vec<&PathBuf> {
        self.records
            .iter()
            .filter_map(|r| match &r.outcome {
                RecordOutcome::Written { path } => Some(path),
                _ => None,
            })
            .collect()
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

mod opt_duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}
