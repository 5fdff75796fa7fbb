//! Record validation: every field must carry non-whitespace content.

use crate::record::{Record, FIELD_NAMES};

/// `true` iff all nine fields are non-empty after trimming.
pub fn is_valid(record: &Record) -> bool {
    record.fields().iter().all(|f| !f.trim().is_empty())
}

/// Names of the fields that are empty after trimming, in column order.
pub fn missing_fields(record: &Record) -> Vec<&'static str> {
    record
        .fields()
        .iter()
        .zip(FIELD_NAMES)
        .filter(|(value, _)| value.trim().is_empty())
        .map(|(_, name)| name)
        .collect()
}
