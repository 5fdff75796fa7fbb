//! Batch conversion entry points.
//!
//! [`run_batch`] is the orchestrator: it takes parsed records and drives
//! them through validate → fill → render → write with bounded parallelism.
//! [`convert_file`] and [`convert_bytes`] put input resolution and parsing
//! in front of it.
//!
//! Only setup failures (input, output directory) are returned as `Err`.
//! Anything that goes wrong with an individual record ends up in that
//! record's [`RecordOutcome`] and the batch carries on.

use crate::config::BatchConfig;
use crate::error::{BatchError, RecordError, RenderError};
use crate::output::{BatchSummary, RecordOutcome, RecordReport};
use crate::pipeline::pool::RenderingPool;
use crate::pipeline::template::{fill, format_timestamp, unknown_placeholders};
use crate::pipeline::write::ArtifactWriter;
use crate::pipeline::{input, parse, validate};
use crate::progress::{ProgressCallback, ProgressState};
use crate::record::Record;
use chrono::Local;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Convert every record in a local file or HTTP/HTTPS URL to a PDF.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(BatchSummary)` once every record has been attempted, even if some
/// of them failed (check `summary.failed`).
///
/// # Errors
/// Returns `Err(BatchError)` only for fatal errors:
/// - Input not found, unreadable or not downloadable
/// - Output directory cannot be created
pub async fn convert_file(
    input_str: impl AsRef<str>,
    config: &BatchConfig,
) -> Result<BatchSummary, BatchError> {
    let input_str = input_str.as_ref();
    info!("Reading records from: {}", input_str);

    let start = Instant::now();
    let bytes = match input::load_input(input_str, config.download_timeout_secs).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Batch aborted after {:.2}s: {}", start.elapsed().as_secs_f64(), e);
            return Err(e);
        }
    };
    convert_bytes(&bytes, config).await
}

/// Convert records held in memory (header line included).
pub async fn convert_bytes(bytes: &[u8], config: &BatchConfig) -> Result<BatchSummary, BatchError> {
    let set = parse::parse_records(bytes, config.delimiter);
    info!("Loaded {} records", set.len());
    if !set.malformed.is_empty() {
        warn!("Dropped {} malformed lines", set.malformed.len());
    }
    run_records(set.records, set.malformed.len(), config).await
}

/// Synchronous wrapper around [`convert_file`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_file_sync(
    input_str: impl AsRef<str>,
    config: &BatchConfig,
) -> Result<BatchSummary, BatchError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| BatchError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert_file(input_str, config))
}

/// Render and write one document per record.
///
/// Records are processed `config.concurrency` at a time in no particular
/// order; the reports in the returned summary are sorted by input index.
pub async fn run_batch(
    records: Vec<Record>,
    config: &BatchConfig,
) -> Result<BatchSummary, BatchError> {
    run_records(records, 0, config).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// State shared by every record task of one run.
struct BatchContext {
    template: String,
    pool: RenderingPool,
    writer: ArtifactWriter,
    progress: ProgressState,
    callback: Option<ProgressCallback>,
    cancel: CancellationToken,
}

/// A failure inside the blocking render-and-write step.
enum StageError {
    Render(RenderError),
    Write(PathBuf, std::io::Error),
}

async fn run_records(
    records: Vec<Record>,
    malformed: usize,
    config: &BatchConfig,
) -> Result<BatchSummary, BatchError> {
    let start = Instant::now();
    let total = records.len();
    info!(
        "Batch started at {}: {} records, {} workers",
        format_timestamp(&Local::now()),
        total,
        config.concurrency
    );

    // ── Step 1: Output directory ─────────────────────────────────────────
    if let Err(e) = tokio::fs::create_dir_all(&config.output_dir).await {
        let err = BatchError::OutputDirFailed {
            path: config.output_dir.clone(),
            source: e,
        };
        error!("Batch aborted after {:.2}s: {}", start.elapsed().as_secs_f64(), err);
        return Err(err);
    }

    let unknown = unknown_placeholders(&config.template);
    if !unknown.is_empty() {
        warn!("Template has unknown placeholders left as-is: {}", unknown.join(", "));
    }

    // ── Step 2: Shared state ─────────────────────────────────────────────
    let ctx = Arc::new(BatchContext {
        template: config.template.clone(),
        pool: RenderingPool::new(
            Arc::clone(&config.engine),
            config.render_options.clone(),
            config.concurrency,
        ),
        writer: ArtifactWriter::new(&config.output_dir, config.collision_policy),
        progress: ProgressState::starting_at(total, config.progress_interval, start),
        callback: config.progress_callback.clone(),
        cancel: config.cancel.clone(),
    });

    if let Some(ref cb) = ctx.callback {
        cb.on_batch_start(total);
    }

    // ── Step 3: Bounded-parallel processing ──────────────────────────────
    let mut reports: Vec<RecordReport> = stream::iter(records.into_iter().enumerate().map(
        |(index, record)| {
            let ctx = Arc::clone(&ctx);
            async move { process_record(ctx, index, record).await }
        },
    ))
    .buffer_unordered(config.concurrency.max(1))
    .collect()
    .await;

    reports.sort_by_key(|r| r.index);

    // ── Step 4: Summary ──────────────────────────────────────────────────
    let elapsed = start.elapsed();
    let count = |f: fn(&RecordOutcome) -> bool| reports.iter().filter(|r| f(&r.outcome)).count();
    let written = count(RecordOutcome::is_written);
    let skipped = count(|o| matches!(o, RecordOutcome::Skipped { .. }));
    let failed = count(|o| matches!(o, RecordOutcome::Failed { .. }));
    let cancelled = count(|o| matches!(o, RecordOutcome::Cancelled));

    let average_per_record = if total == 0 {
        None
    } else {
        Some(Duration::from_secs_f64(elapsed.as_secs_f64() / total as f64))
    };

    let summary = BatchSummary {
        total,
        malformed,
        processed: ctx.progress.processed(),
        written,
        skipped,
        failed,
        cancelled,
        was_cancelled: ctx.cancel.is_cancelled(),
        renderers_created: ctx.pool.handles_created(),
        elapsed,
        average_per_record,
        records: reports,
    };

    info!(
        "Batch complete: {} written, {} skipped, {} failed, {} cancelled of {} records in {:.2}s",
        written,
        skipped,
        failed,
        cancelled,
        total,
        elapsed.as_secs_f64()
    );
    match average_per_record {
        Some(avg) => info!("Average time per record: {:.3}s", avg.as_secs_f64()),
        None => info!("No records to process"),
    }
    if summary.was_cancelled {
        warn!("Batch was cancelled: {} records not started", cancelled);
    }

    if let Some(ref cb) = ctx.callback {
        cb.on_batch_complete(&summary);
    }

    Ok(summary)
}

/// Drive one record through the pipeline. Never fails: every error is
/// folded into the returned report.
async fn process_record(ctx: Arc<BatchContext>, index: usize, record: Record) -> RecordReport {
    let started = Instant::now();
    let passenger_name = record.passenger_name.clone();

    if ctx.cancel.is_cancelled() {
        debug!("Record {} not started: batch cancelled", index);
        return RecordReport {
            index,
            passenger_name,
            outcome: RecordOutcome::Cancelled,
            duration_ms: 0,
            worker: None,
        };
    }

    let (outcome, worker) = attempt_record(&ctx, &record).await;

    let total = ctx.progress.total();
    match &outcome {
        RecordOutcome::Written { path } => {
            debug!("Wrote {}", path.display());
            if let Some(ref cb) = ctx.callback {
                cb.on_record_complete(index, total, path);
            }
        }
        RecordOutcome::Skipped { reason } => {
            debug!("Skipping record {} ({}): {}", index + 1, record.display_name(), reason);
            if let Some(ref cb) = ctx.callback {
                cb.on_record_skipped(index, total, reason);
            }
        }
        RecordOutcome::Failed { error: e } => {
            error!("Error processing record for {}: {}", record.display_name(), e);
            if let Some(ref cb) = ctx.callback {
                cb.on_record_error(index, total, &e.to_string());
            }
        }
        RecordOutcome::Cancelled => {}
    }

    if outcome.was_attempted() {
        if let Some(snap) = ctx.progress.record_attempt() {
            info!(
                "Processed {}/{} records. Elapsed: {:.1}s, ETA: {:.1}s",
                snap.processed,
                snap.total,
                snap.elapsed.as_secs_f64(),
                snap.eta.as_secs_f64()
            );
        }
    }

    RecordReport {
        index,
        passenger_name,
        outcome,
        duration_ms: started.elapsed().as_millis() as u64,
        worker,
    }
}

async fn attempt_record(
    ctx: &Arc<BatchContext>,
    record: &Record,
) -> (RecordOutcome, Option<usize>) {
    let name = record.display_name().to_string();

    if !validate::is_valid(record) {
        let reason = format!("missing {}", validate::missing_fields(record).join(", "));
        return (RecordOutcome::Skipped { reason }, None);
    }

    let markup = fill(&ctx.template, record, &format_timestamp(&Local::now()));

    let mut renderer = tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => return (RecordOutcome::Cancelled, None),
        checkout = ctx.pool.checkout() => match checkout {
            Ok(r) => r,
            Err(e) => {
                let error = RecordError::Internal { name, detail: e.to_string() };
                return (RecordOutcome::Failed { error }, None);
            }
        },
    };
    let worker = renderer.worker_id();

    // Claim the file name only after a successful render.
    let task_ctx = Arc::clone(ctx);
    let task_record = record.clone();
    let joined = tokio::task::spawn_blocking(move || {
        let bytes = renderer.render(&markup).map_err(StageError::Render)?;
        let path = task_ctx.writer.target_path(&task_record);
        match task_ctx.writer.write(&path, &bytes) {
            Ok(()) => Ok(path),
            Err(e) => {
                task_ctx.writer.release(&path);
                Err(StageError::Write(path, e))
            }
        }
    })
    .await;

    let outcome = match joined {
        Ok(Ok(path)) => RecordOutcome::Written { path },
        Ok(Err(StageError::Render(e))) => RecordOutcome::Failed {
            error: RecordError::Render {
                name,
                detail: e.to_string(),
            },
        },
        Ok(Err(StageError::Write(path, e))) => RecordOutcome::Failed {
            error: RecordError::Write {
                name,
                path,
                detail: e.to_string(),
            },
        },
        Err(e) => RecordOutcome::Failed {
            error: RecordError::Internal {
                name,
                detail: format!("worker task failed: {e}"),
            },
        },
    };
    (outcome, Some(worker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::render::{DocumentRenderer, RenderEngine, RenderOptions};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct EchoEngine {
        created: AtomicUsize,
    }

    struct EchoRenderer;

    impl RenderEngine for EchoEngine {
        fn name(&self) -> &str {
            "echo"
        }

        fn create_renderer(
            &self,
            _options: &RenderOptions,
        ) -> Result<Box<dyn DocumentRenderer>, RenderError> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(EchoRenderer))
        }
    }

    impl DocumentRenderer for EchoRenderer {
        fn render(&mut self, markup: &str) -> Result<Vec<u8>, RenderError> {
            if markup.contains("EXPLODE") {
                return Err(RenderError::Engine("boom".into()));
            }
            Ok(markup.as_bytes().to_vec())
        }
    }

    fn record(name: &str, seat: &str) -> Record {
        Record {
            passenger_name: name.into(),
            flight_number: "BA117".into(),
            origin: "LHR".into(),
            destination: "JFK".into(),
            date: "2025-10-12".into(),
            time: "08:30".into(),
            cabin_class: "First".into(),
            seat: seat.into(),
            barcode: "M1".into(),
        }
    }

    fn config(dir: &TempDir, engine: Arc<EchoEngine>) -> BatchConfig {
        BatchConfig::builder()
            .output_dir(dir.path().join("out"))
            .concurrency(2)
            .template("<p>{{passenger_name}} {{seat}}</p>")
            .engine(engine)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn writes_skips_and_fails_independently() {
        let dir = TempDir::new().unwrap();
        let engine = Arc::new(EchoEngine {
            created: AtomicUsize::new(0),
        });
        let cfg = config(&dir, engine.clone());

        let records = vec![
            record("Ada Lovelace", "1A"),
            record("Bob", ""),
            record("EXPLODE", "3C"),
        ];
        let summary = run_batch(records, &cfg).await.unwrap();

        assert_eq!(summary.total, 3);
        assert_eq!(summary.processed, 3);
        assert_eq!(summary.written, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
        assert!(!summary.was_cancelled);

        let written = dir.path().join("out").join("Ada_Lovelace_BA117_1A.pdf");
        assert_eq!(
            std::fs::read_to_string(&written).unwrap(),
            "<p>Ada Lovelace 1A</p>"
        );
        assert!(matches!(
            summary.records[2].outcome,
            RecordOutcome::Failed {
                error: RecordError::Render { .. }
            }
        ));
        assert!(engine.created.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn empty_batch_has_no_average() {
        let dir = TempDir::new().unwrap();
        let engine = Arc::new(EchoEngine {
            created: AtomicUsize::new(0),
        });
        let summary = run_batch(vec![], &config(&dir, engine)).await.unwrap();
        assert_eq!(summary.total, 0);
        assert_eq!(summary.processed, 0);
        assert!(summary.average_per_record.is_none());
        assert!(dir.path().join("out").is_dir());
    }

    #[tokio::test]
    async fn pre_cancelled_batch_starts_nothing() {
        let dir = TempDir::new().unwrap();
        let engine = Arc::new(EchoEngine {
            created: AtomicUsize::new(0),
        });
        let cfg = config(&dir, engine.clone());
        cfg.cancel.cancel();

        let summary = run_batch(vec![record("A", "1A"), record("B", "1B")], &cfg)
            .await
            .unwrap();
        assert!(summary.was_cancelled);
        assert_eq!(summary.cancelled, 2);
        assert_eq!(summary.processed, 0);
        assert_eq!(engine.created.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn convert_bytes_counts_malformed_lines() {
        let dir = TempDir::new().unwrap();
        let engine = Arc::new(EchoEngine {
            created: AtomicUsize::new(0),
        });
        let input = "header\n\
                     Ada,BA117,LHR,JFK,2025-10-12,08:30,First,1A,M1\n\
                     too,few,fields\n";
        let summary = convert_bytes(input.as_bytes(), &config(&dir, engine))
            .await
            .unwrap();
        assert_eq!(summary.total, 1);
        assert_eq!(summary.malformed, 1);
        assert_eq!(summary.written, 1);
    }
}
