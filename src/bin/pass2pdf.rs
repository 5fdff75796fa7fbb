//! CLI binary for pass2pdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `BatchConfig` and prints the batch summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pass2pdf::{
    convert_file, BatchConfig, BatchProgressCallback, BatchSummary, CollisionPolicy,
    MediaProfile, PageSize, ProgressCallback, RecordOutcome, RenderOptions,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live progress bar plus one log line per
/// skipped or failed record. Records complete out of order, so lines carry
/// the 1-based input position.
struct CliProgressCallback {
    bar: ProgressBar,
    problems: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_batch_start` tells us the record count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading records…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            problems: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>5}/{len} records  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Rendering");
        self.bar.reset_eta();
    }
}

fn truncate(msg: &str, max: usize) -> String {
    if msg.chars().count() > max {
        let head: String = msg.chars().take(max - 1).collect();
        format!("{head}\u{2026}")
    } else {
        msg.to_string()
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.activate_bar(total);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Rendering {total} records…"))
        ));
    }

    fn on_record_complete(&self, _index: usize, _total: usize, path: &Path) {
        if let Some(name) = path.file_name() {
            self.bar.set_message(name.to_string_lossy().into_owned());
        }
        self.bar.inc(1);
    }

    fn on_record_skipped(&self, index: usize, _total: usize, reason: &str) {
        self.problems.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} Record {:>5}  {}",
            yellow("–"),
            index + 1,
            dim(&format!("skipped: {}", truncate(reason, 80))),
        ));
        self.bar.inc(1);
    }

    fn on_record_error(&self, index: usize, _total: usize, error: &str) {
        self.problems.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} Record {:>5}  {}",
            red("✗"),
            index + 1,
            red(&truncate(error, 80)),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, summary: &BatchSummary) {
        self.bar.finish_and_clear();
        let mark = if summary.was_cancelled || summary.failed > 0 {
            yellow("⚠")
        } else if summary.written == 0 && summary.total > 0 {
            red("✘")
        } else {
            green("✔")
        };
        eprintln!(
            "{} {}/{} records written  ({} problems)",
            mark,
            bold(&summary.written.to_string()),
            summary.total,
            self.problems.load(Ordering::SeqCst),
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Render every row of passengers.csv into ./output
  pass2pdf passengers.csv

  # Pipe-delimited input, custom template, 4 workers
  pass2pdf -d '|' --template pass.html -c 4 passengers.txt -o passes/

  # Keep every document when two passengers share a name, flight and seat
  pass2pdf --collision suffix passengers.csv

  # Fetch the record file over HTTPS and print a JSON summary
  pass2pdf --json https://example.com/manifest.csv > summary.json

INPUT FORMAT:
  The first line is a header and is always skipped. Every following line
  has nine fields in this order:

    passenger_name, flight_number, origin, destination, date, time,
    cabin_class, seat, barcode

  Fields containing the delimiter are wrapped in double quotes; a literal
  quote inside a quoted field is written as "".

TEMPLATE PLACEHOLDERS:
  {{passenger_name}} {{flight_number}} {{origin}} {{destination}} {{date}}
  {{time}} {{cabin_class}} {{seat}} {{barcode}} {{generated_at}}

ENVIRONMENT VARIABLES:
  Every flag can also be set through PASS2PDF_<FLAG>, e.g.
  PASS2PDF_CONCURRENCY=8. RUST_LOG overrides the log filter.

Press Ctrl-C to stop: records already rendering finish, the rest are
reported as cancelled.
"#;

/// Render one PDF boarding pass per passenger record.
#[derive(Parser, Debug)]
#[command(
    name = "pass2pdf",
    version,
    about = "Render one PDF boarding pass per row of a passenger CSV",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local record file path or HTTP/HTTPS URL.
    input: String,

    /// Directory to write the PDFs to (created if missing).
    #[arg(short, long = "output-dir", env = "PASS2PDF_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Number of records rendered at once [default: number of CPUs].
    #[arg(short, long, env = "PASS2PDF_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Field delimiter.
    #[arg(short, long, env = "PASS2PDF_DELIMITER", default_value_t = ',')]
    delimiter: char,

    /// Markup template with {{placeholder}} tokens [default: built-in boarding pass].
    #[arg(short, long, env = "PASS2PDF_TEMPLATE")]
    template: Option<PathBuf>,

    /// What to do when two records map to the same file name.
    #[arg(long, env = "PASS2PDF_COLLISION", value_enum, default_value = "overwrite")]
    collision: CollisionArg,

    /// Page size of the produced documents.
    #[arg(long, env = "PASS2PDF_PAGE_SIZE", value_enum, default_value = "a4")]
    page_size: PageSizeArg,

    /// CSS media profile the renderer applies.
    #[arg(long, env = "PASS2PDF_MEDIA", value_enum, default_value = "print")]
    media: MediaArg,

    /// Log progress every N records.
    #[arg(long, env = "PASS2PDF_PROGRESS_INTERVAL", default_value_t = 20)]
    progress_interval: usize,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PASS2PDF_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print the batch summary as JSON on stdout.
    #[arg(long, env = "PASS2PDF_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PASS2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PASS2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PASS2PDF_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum CollisionArg {
    Overwrite,
    Suffix,
}

impl From<CollisionArg> for CollisionPolicy {
    fn from(v: CollisionArg) -> Self {
        match v {
            CollisionArg::Overwrite => CollisionPolicy::Overwrite,
            CollisionArg::Suffix => CollisionPolicy::Suffix,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PageSizeArg {
    A4,
    Letter,
}

impl From<PageSizeArg> for PageSize {
    fn from(v: PageSizeArg) -> Self {
        match v {
            PageSizeArg::A4 => PageSize::A4,
            PageSizeArg::Letter => PageSize::Letter,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum MediaArg {
    Print,
    Screen,
}

impl From<MediaArg> for MediaProfile {
    fn from(v: MediaArg) -> Self {
        match v {
            MediaArg::Print => MediaProfile::Print,
            MediaArg::Screen => MediaProfile::Screen,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar shows the same progress.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Ctrl-C → cancel ──────────────────────────────────────────────────
    let cancel = config.cancel.clone();
    let quiet = cli.quiet;
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            if !quiet {
                eprintln!("{} Interrupted: finishing records in flight…", yellow("⚠"));
            }
            cancel.cancel();
        }
    });

    // ── Run batch ────────────────────────────────────────────────────────
    let summary = convert_file(&cli.input, &config)
        .await
        .context("Batch failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&summary, &config, show_progress);
    }

    Ok(())
}

/// Map CLI args to `BatchConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<BatchConfig> {
    let render_options = RenderOptions {
        media: cli.media.into(),
        page_size: cli.page_size.into(),
        ..RenderOptions::default()
    };

    let mut builder = BatchConfig::builder()
        .output_dir(&cli.output_dir)
        .delimiter(cli.delimiter)
        .collision_policy(cli.collision.into())
        .render_options(render_options)
        .progress_interval(cli.progress_interval)
        .download_timeout_secs(cli.download_timeout);

    if let Some(n) = cli.concurrency {
        builder = builder.concurrency(n);
    }
    if let Some(ref path) = cli.template {
        builder = builder.template_file(path);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(summary: &BatchSummary, config: &BatchConfig, progress_shown: bool) {
    if !progress_shown {
        for report in &summary.records {
            if let RecordOutcome::Failed { error } = &report.outcome {
                eprintln!("  {} {}", red("✗"), error);
            }
        }
    }

    eprintln!(
        "{}  {} written  {} skipped  {} failed  {}  →  {}",
        if summary.failed == 0 && !summary.was_cancelled {
            green("✔")
        } else {
            yellow("⚠")
        },
        summary.written,
        summary.skipped,
        summary.failed,
        dim(&format!("{:.2}s", summary.elapsed.as_secs_f64())),
        bold(&config.output_dir.display().to_string()),
    );
    if summary.malformed > 0 {
        eprintln!("   {} malformed lines dropped", summary.malformed);
    }
    if let Some(avg) = summary.average_per_record {
        eprintln!(
            "   {} per record  /  {} renderers",
            dim(&format!("{:.3}s", avg.as_secs_f64())),
            summary.renderers_created,
        );
    }
    if summary.was_cancelled {
        eprintln!(
            "   {} records not started (cancelled)",
            yellow(&summary.cancelled.to_string())
        );
    }
}
