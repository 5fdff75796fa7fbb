//! Configuration types for batch record-to-PDF conversion.
//!
//! All batch behaviour is controlled through [`BatchConfig`], built via its
//! [`BatchConfigBuilder`]. One struct holds every knob, so a config can be
//! cloned into worker tasks and logged as a whole.

use crate::error::BatchError;
use crate::pipeline::parse::DEFAULT_DELIMITER;
use crate::pipeline::render::{RenderEngine, RenderOptions, TextPdfEngine};
use crate::pipeline::write::CollisionPolicy;
use crate::progress::{ProgressCallback, DEFAULT_PROGRESS_INTERVAL};
use crate::templates::DEFAULT_TEMPLATE;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Configuration for one batch run.
///
/// Built via [`BatchConfig::builder()`] or using [`BatchConfig::default()`].
///
/// # Example
/// ```rust
/// use pass2pdf::BatchConfig;
///
/// let config = BatchConfig::builder()
///     .output_dir("boarding_passes")
///     .concurrency(4)
///     .delimiter('|')
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct BatchConfig {
    /// Directory the PDFs are written to. Created if missing. Default: `./output`.
    pub output_dir: PathBuf,

    /// Number of records processed at once, and the number of rendering
    /// handles the pool may build. Default: number of logical CPUs.
    pub concurrency: usize,

    /// Field delimiter of the record file. Default: `,`.
    pub delimiter: char,

    /// Markup template with `{{key}}` placeholders.
    /// Default: [`crate::templates::DEFAULT_TEMPLATE`].
    pub template: String,

    /// Options every rendering handle is created with.
    pub render_options: RenderOptions,

    /// Engine that creates the rendering handles. Default: [`TextPdfEngine`].
    pub engine: Arc<dyn RenderEngine>,

    /// Emit a progress line every N attempted records (and on the last).
    /// Default: 20.
    pub progress_interval: usize,

    /// What to do when two records map to the same file name.
    /// Default: [`CollisionPolicy::Overwrite`].
    pub collision_policy: CollisionPolicy,

    /// Optional observer for per-record events.
    pub progress_callback: Option<ProgressCallback>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Cancel the run from another task. Records not started when this
    /// fires are reported as cancelled.
    pub cancel: CancellationToken,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            concurrency: num_cpus::get().max(1),
            delimiter: DEFAULT_DELIMITER,
            template: DEFAULT_TEMPLATE.to_string(),
            render_options: RenderOptions::default(),
            engine: Arc::new(TextPdfEngine),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            collision_policy: CollisionPolicy::default(),
            progress_callback: None,
            download_timeout_secs: 120,
            cancel: CancellationToken::new(),
        }
    }
}

impl fmt::Debug for BatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfig")
            .field("output_dir", &self.output_dir)
            .field("concurrency", &self.concurrency)
            .field("delimiter", &self.delimiter)
            .field("template_len", &self.template.len())
            .field("render_options", &self.render_options)
            .field("engine", &self.engine.name())
            .field("progress_interval", &self.progress_interval)
            .field("collision_policy", &self.collision_policy)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn BatchProgressCallback>"),
            )
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl BatchConfig {
    /// Create a new builder for `BatchConfig`.
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder {
            config: Self::default(),
            template_path: None,
        }
    }
}

/// Builder for [`BatchConfig`].
#[derive(Debug)]
pub struct BatchConfigBuilder {
    config: BatchConfig,
    template_path: Option<PathBuf>,
}

impl BatchConfigBuilder {
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn delimiter(mut self, d: char) -> Self {
        self.config.delimiter = d;
        self
    }

    /// Use `template` instead of the built-in one.
    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.config.template = template.into();
        self.template_path = None;
        self
    }

    /// Load the template from a file when [`build`](Self::build) runs.
    pub fn template_file(mut self, path: impl AsRef<Path>) -> Self {
        self.template_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn render_options(mut self, options: RenderOptions) -> Self {
        self.config.render_options = options;
        self
    }

    pub fn engine(mut self, engine: Arc<dyn RenderEngine>) -> Self {
        self.config.engine = engine;
        self
    }

    pub fn progress_interval(mut self, n: usize) -> Self {
        self.config.progress_interval = n.max(1);
        self
    }

    pub fn collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.config.collision_policy = policy;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.max(1);
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.config.cancel = token;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<BatchConfig, BatchError> {
        if let Some(path) = self.template_path.take() {
            self.config.template = std::fs::read_to_string(&path)
                .map_err(|source| BatchError::TemplateUnreadable { path, source })?;
        }

        let c = &self.config;
        if c.concurrency == 0 {
            return Err(BatchError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        if c.delimiter == '"' || c.delimiter == '\n' || c.delimiter == '\r' {
            return Err(BatchError::InvalidConfig(format!(
                "Delimiter {:?} cannot be used: it is reserved for quoting or line breaks",
                c.delimiter
            )));
        }
        if c.template.trim().is_empty() {
            return Err(BatchError::InvalidConfig("Template is empty".into()));
        }
        if c.output_dir.as_os_str().is_empty() {
            return Err(BatchError::InvalidConfig(
                "Output directory must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let c = BatchConfig::default();
        assert_eq!(c.delimiter, ',');
        assert_eq!(c.progress_interval, 20);
        assert_eq!(c.collision_policy, CollisionPolicy::Overwrite);
        assert!(c.concurrency >= 1);
        assert!(!c.render_options.scripting_enabled);
        assert!(c.template.contains("{{passenger_name}}"));
        assert_eq!(c.engine.name(), "text-pdf");
    }

    #[test]
    fn setters_clamp() {
        let c = BatchConfig::builder()
            .concurrency(0)
            .progress_interval(0)
            .build()
            .unwrap();
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.progress_interval, 1);
    }

    #[test]
    fn quote_delimiter_is_rejected() {
        let err = BatchConfig::builder().delimiter('"').build().unwrap_err();
        assert!(matches!(err, BatchError::InvalidConfig(_)));
    }

    #[test]
    fn blank_template_is_rejected() {
        let err = BatchConfig::builder().template("  \n").build().unwrap_err();
        assert!(matches!(err, BatchError::InvalidConfig(_)));
    }

    #[test]
    fn template_file_is_loaded_on_build() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.html");
        std::fs::write(&path, "<p>{{seat}}</p>").unwrap();
        let c = BatchConfig::builder().template_file(&path).build().unwrap();
        assert_eq!(c.template, "<p>{{seat}}</p>");
    }

    #[test]
    fn missing_template_file_is_fatal() {
        let err = BatchConfig::builder()
            .template_file("/definitely/not/here.html")
            .build()
            .unwrap_err();
        assert!(matches!(err, BatchError::TemplateUnreadable { .. }));
    }

    #[test]
    fn debug_hides_template_body() {
        let dbg = format!("{:?}", BatchConfig::default());
        assert!(dbg.contains("template_len"));
        assert!(!dbg.contains("BOARDING PASS"));
    }
}
