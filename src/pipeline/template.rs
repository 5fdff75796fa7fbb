//! Placeholder substitution and artifact naming.
//!
//! Templates use `{{key}}` tokens (inner whitespace allowed). Every value is
//! markup-escaped before it is spliced in, and substitution is a single
//! left-to-right pass: text that came from a record is never re-scanned, so
//! a passenger named `{{seat}}` stays literally `{{seat}}`.

use crate::record::Record;
use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Placeholder key for the generation timestamp.
pub const GENERATED_AT_KEY: &str = "generated_at";

/// Format used for the generation timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static RE_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap());

/// Escape a value for embedding in HTML text or attribute content.
///
/// `&` is replaced first so entities introduced by the later rules are not
/// escaped twice.
pub fn escape_markup(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Format a timestamp the way it appears on the document.
pub fn format_timestamp(at: &DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Substitute every known placeholder in `template` with the escaped value
/// from `record`, or with `generated_at` for `{{generated_at}}`.
///
/// Unknown keys are left as-is.
pub fn fill(template: &str, record: &Record, generated_at: &str) -> String {
    RE_PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            let key = &caps[1];
            let value = if key == GENERATED_AT_KEY {
                Some(generated_at)
            } else {
                record.field(key)
            };
            match value {
                Some(v) => escape_markup(v),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Placeholder keys used in `template` that no record field provides.
pub fn unknown_placeholders(template: &str) -> Vec<String> {
    let probe = Record::default();
    let mut unknown: Vec<String> = RE_PLACEHOLDER
        .captures_iter(template)
        .map(|c| c[1].to_string())
        .filter(|k| k != GENERATED_AT_KEY && probe.field(k).is_none())
        .collect();
    unknown.sort();
    unknown.dedup();
    unknown
}

/// Characters that may not appear in a file name on any mainstream OS.
fn is_illegal_in_file_name(c: char) -> bool {
    matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') || c.is_control()
}

/// Map a human-readable value to something usable as a path component.
///
/// Illegal characters become `_`, then spaces become `_`. Idempotent.
pub fn safe_file_base(name: &str) -> String {
    name.chars()
        .map(|c| if is_illegal_in_file_name(c) { '_' } else { c })
        .map(|c| if c == ' ' { '_' } else { c })
        .collect()
}

/// File name of the artifact for `record`: `{name}_{flight}_{seat}.pdf`.
///
/// Flight and seat are normally file-system plain already; they go through
/// [`safe_file_base`] anyway so no field can introduce a path separator.
pub fn artifact_file_name(record: &Record) -> String {
    format!(
        "{}_{}_{}.pdf",
        safe_file_base(&record.passenger_name),
        safe_file_base(&record.flight_number),
        safe_file_base(&record.seat)
    )
}
