//! # pass2pdf
//!
//! Turn a delimited file of passenger records into one PDF boarding pass
//! per record, in bulk.
//!
//! ## Pipeline Overview
//!
//! ```text
//! records.csv
//!  │
//!  ├─ 1. Input     resolve local file or download from URL
//!  ├─ 2. Parse     quote-aware split into nine-field records
//!  ├─ 3. Validate  skip records with a blank field
//!  ├─ 4. Fill      escaped {{placeholder}} substitution into the template
//!  ├─ 5. Render    pooled per-worker rendering handles (spawn_blocking)
//!  └─ 6. Write     {name}_{flight}_{seat}.pdf, atomically
//! ```
//!
//! A bad line or record never stops the batch: it is logged and reported
//! in the [`BatchSummary`]. Only a missing input file or an output directory
//! that cannot be created aborts the run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pass2pdf::{convert_file, BatchConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BatchConfig::builder()
//!         .output_dir("boarding_passes")
//!         .build()?;
//!     let summary = convert_file("passengers.csv", &config).await?;
//!     eprintln!("{} written, {} skipped, {} failed",
//!         summary.written, summary.skipped, summary.failed);
//!     Ok(())
//! }
//! ```
//!
//! ## Bringing your own renderer
//!
//! The built-in [`TextPdfEngine`] writes the template's text onto plain PDF
//! pages. Implement [`RenderEngine`] and [`DocumentRenderer`] to plug in a
//! real layout engine; the pool builds at most one handle per worker.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pass2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pass2pdf = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod record;
pub mod templates;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{BatchConfig, BatchConfigBuilder};
pub use convert::{convert_bytes, convert_file, convert_file_sync, run_batch};
pub use error::{BatchError, RecordError, RenderError};
pub use output::{BatchSummary, RecordOutcome, RecordReport};
pub use pipeline::parse::parse_records;
pub use pipeline::render::{
    DocumentRenderer, MediaProfile, PageSize, RenderEngine, RenderOptions, TextPdfEngine,
};
pub use pipeline::write::CollisionPolicy;
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use record::{Record, RecordSet};
pub use tokio_util::sync::CancellationToken;
