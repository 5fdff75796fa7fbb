//! Passenger records: the unit of work for a batch.
//!
//! A [`Record`] is built once by the parser from one input line and is
//! read-only afterwards. Whether a record is *valid* is never stored on it;
//! see [`crate::pipeline::validate`].

use crate::error::RecordError;
use serde::{Deserialize, Serialize};

/// Number of positional fields every data line must carry.
pub const FIELD_COUNT: usize = 9;

/// Field names in positional (column) order.
///
/// These double as the placeholder keys understood by
/// [`crate::pipeline::template::fill`].
pub const FIELD_NAMES: [&str; FIELD_COUNT] = [
    "passenger_name",
    "flight_number",
    "origin",
    "destination",
    "date",
    "time",
    "cabin_class",
    "seat",
    "barcode",
];

/// One passenger / ticket entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Record {
    pub passenger_name: String,
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub date: String,
    pub time: String,
    pub cabin_class: String,
    pub seat: String,
    /// Payload encoded into the barcode area (opaque to this crate).
    pub barcode: String,
}

impl Record {
    /// Build a record from split fields, mapping positions 0–8 in
    /// [`FIELD_NAMES`] order. Fields beyond the ninth are ignored.
    pub fn from_fields(fields: Vec<String>) -> Result<Self, String> {
        if fields.len() < FIELD_COUNT {
            return Err(format!(
                "expected {} fields, found {}",
                FIELD_COUNT,
                fields.len()
            ));
        }
        let mut it = fields.into_iter();
        let mut next = || it.next().unwrap_or_default();
        Ok(Self {
            passenger_name: next(),
            flight_number: next(),
            origin: next(),
            destination: next(),
            date: next(),
            time: next(),
            cabin_class: next(),
            seat: next(),
            barcode: next(),
        })
    }

    /// Look up a field by its [`FIELD_NAMES`] key.
    pub fn field(&self, key: &str) -> Option<&str> {
        let value = match key {
            "passenger_name" => &self.passenger_name,
            "flight_number" => &self.flight_number,
            "origin" => &self.origin,
            "destination" => &self.destination,
            "date" => &self.date,
            "time" => &self.time,
            "cabin_class" => &self.cabin_class,
            "seat" => &self.seat,
            "barcode" => &self.barcode,
            _ => return None,
        };
        Some(value.as_str())
    }

    /// All fields in positional order.
    pub fn fields(&self) -> [&str; FIELD_COUNT] {
        [
            &self.passenger_name,
            &self.flight_number,
            &self.origin,
            &self.destination,
            &self.date,
            &self.time,
            &self.cabin_class,
            &self.seat,
            &self.barcode,
        ]
    }

    /// Name used to identify the record in logs.
    pub fn display_name(&self) -> &str {
        let name = self.passenger_name.trim();
        if name.is_empty() {
            "(unknown)"
        } else {
            name
        }
    }
}

/// A line that was dropped during parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MalformedLine {
    /// 1-indexed line number in the input (the header is line 1).
    pub line: usize,
    pub content: String,
    pub error: RecordError,
}

/// Parsed records in input order, plus the lines that were dropped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordSet {
    pub records: Vec<Record>,
    pub malformed: Vec<MalformedLine>,
}

impl RecordSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
