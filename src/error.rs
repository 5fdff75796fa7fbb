//! Error types for the pass2pdf library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`BatchError`]: **Fatal**: the batch cannot start at all (input file
//!   missing, output directory not creatable, bad configuration). Returned
//!   as `Err(BatchError)` from the top-level `convert*` / `run_batch`
//!   functions, exactly once.
//!
//! * [`RecordError`]: **Non-fatal**: a single line or record failed
//!   (malformed line, render glitch, write failure) while every other record
//!   is fine. Stored inside [`crate::output::RecordOutcome`] so callers can
//!   inspect partial success instead of losing the whole batch to one row.
//!
//! * [`RenderError`]: raised by a [`crate::pipeline::render::DocumentRenderer`]
//!   implementation. The orchestrator folds it into a [`RecordError::Render`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pass2pdf library.
///
/// Per-record failures use [`RecordError`] and never propagate here.
#[derive(Debug, Error)]
pub enum BatchError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    InputNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but could not be read as UTF-8 text.
    #[error("Failed to read input '{path}': {detail}")]
    InputUnreadable { path: PathBuf, detail: String },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The output directory could not be created.
    #[error("Failed to create output directory '{path}': {source}")]
    OutputDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Template errors ───────────────────────────────────────────────────
    /// A user-supplied template file could not be read.
    #[error("Failed to read template '{path}': {source}")]
    TemplateUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single input line or record.
///
/// Stored alongside [`crate::output::RecordReport`] when a record fails.
/// The batch always continues.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum RecordError {
    /// The line could not be split into nine fields.
    #[error("Line {line}: malformed record: {reason}")]
    Malformed { line: usize, reason: String },

    /// The rendering engine rejected the filled template.
    #[error("{name}: render failed: {detail}")]
    Render { name: String, detail: String },

    /// The rendered document could not be written.
    #[error("{name}: failed to write '{path}': {detail}")]
    Write {
        name: String,
        path: PathBuf,
        detail: String,
    },

    /// The worker task died (panic or runtime shutdown).
    #[error("{name}: internal error: {detail}")]
    Internal { name: String, detail: String },
}

/// Errors raised by a rendering engine or one of its handles.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The engine cannot honour the requested [`crate::pipeline::render::RenderOptions`].
    #[error("Unsupported render option: {0}")]
    Unsupported(String),

    /// The engine failed while producing the document.
    #[error("Rendering engine error: {0}")]
    Engine(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_display_names_line() {
        let e = RecordError::Malformed {
            line: 7,
            reason: "expected 9 fields, found 5".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("Line 7"), "got: {msg}");
        assert!(msg.contains("found 5"));
    }

    #[test]
    fn write_error_display() {
        let e = RecordError::Write {
            name: "Ada Lovelace".into(),
            path: PathBuf::from("/out/Ada_Lovelace_BA1_1A.pdf"),
            detail: "disk full".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("Ada Lovelace"));
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn output_dir_failed_display() {
        let e = BatchError::OutputDirFailed {
            path: PathBuf::from("/root/nope"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(e.to_string().contains("/root/nope"));
    }

    #[test]
    fn render_error_display() {
        let e = RenderError::Unsupported("scripting".into());
        assert!(e.to_string().contains("scripting"));
    }
}
