//! Conversion orchestrator: runs every pipeline stage for one file.
//!
//! A [`Converter`] owns everything one job needs (HTTP client, config,
//! credentials, its own token cache and cancellation token), so the batch
//! controller can run one per file without any locking.
//!
//! Two entry points differ only in how they report failure:
//!
//! - [`Converter::convert`] propagates the first error (single-file mode).
//! - [`Converter::convert_one`] never fails; errors land in the report's
//!   [`JobOutcome`] so sibling jobs keep running.

use crate::config::{ConversionConfig, TargetFormat};
use crate::credentials::Credentials;
use crate::error::Pdf2DocxError;
use crate::output::{ConversionJob, ConversionReport, JobOutcome, JobStatus};
use crate::pipeline::token::TokenManager;
use crate::pipeline::{poll, submit, upload, ApiContext};
use crate::progress::ProgressCallback;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Output path for `source`: same directory and stem, the target format's
/// extension.
pub fn output_path_for(source: &Path, format: TargetFormat) -> PathBuf {
    source.with_extension(format.extension())
}

/// Build the HTTP client shared by every stage.
pub fn build_http_client() -> Result<reqwest::Client, Pdf2DocxError> {
    reqwest::Client::builder()
        .user_agent(concat!("pdf2docx/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Pdf2DocxError::Internal(format!("Failed to build HTTP client: {e}")))
}

/// One orchestration context. Not shared between concurrent jobs.
pub struct Converter {
    http: reqwest::Client,
    config: ConversionConfig,
    credentials: Arc<Credentials>,
    tokens: TokenManager,
    progress: Option<ProgressCallback>,
    cancel: CancellationToken,
}

impl Converter {
    pub fn new(config: ConversionConfig, credentials: Arc<Credentials>) -> Result<Self, Pdf2DocxError> {
        Ok(Self::with_http_client(config, credentials, build_http_client()?))
    }

    /// Reuse an existing client (and its connection pool).
    pub fn with_http_client(
        config: ConversionConfig,
        credentials: Arc<Credentials>,
        http: reqwest::Client,
    ) -> Self {
        let tokens = TokenManager::new(http.clone(), &config, Arc::clone(&credentials));
        let progress = config.progress_callback.clone();
        Self {
            http,
            config,
            credentials,
            tokens,
            progress,
            cancel: CancellationToken::new(),
        }
    }

    /// Override the progress callback taken from the config.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Replace the token manager, e.g. one seeded with a cached token.
    pub fn with_token_manager(mut self, tokens: TokenManager) -> Self {
        self.tokens = tokens;
        self
    }

    /// Token that stops this converter's job when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Convert one file, propagating the first failing stage's error.
    pub async fn convert(
        &mut self,
        source: impl AsRef<Path>,
    ) -> Result<ConversionReport, Pdf2DocxError> {
        let (job, result, duration_ms) = self.execute(source.as_ref()).await;
        let bytes_written = result?;
        Ok(ConversionReport {
            job,
            outcome: JobOutcome::Completed { bytes_written },
            duration_ms,
        })
    }

    /// Convert one file; failures and cancellation become the report's outcome.
    pub async fn convert_one(&mut self, source: impl AsRef<Path>) -> ConversionReport {
        let (job, result, duration_ms) = self.execute(source.as_ref()).await;
        let outcome = match result {
            Ok(bytes_written) => JobOutcome::Completed { bytes_written },
            Err(Pdf2DocxError::Cancelled) => JobOutcome::Cancelled,
            Err(e) => JobOutcome::Failed {
                message: e.to_string(),
            },
        };
        ConversionReport {
            job,
            outcome,
            duration_ms,
        }
    }

    async fn execute(&mut self, source: &Path) -> (ConversionJob, Result<u64, Pdf2DocxError>, u64) {
        let started = Instant::now();
        let mut job = ConversionJob::new(source, output_path_for(source, self.config.target_format));
        info!("Starting conversion: {}", source.display());

        if let Some(ref cb) = self.progress {
            cb.on_job_start(source);
        }

        let result = self.run(&mut job).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(bytes) => {
                info!(
                    "Converted {} -> {} ({} bytes, {}ms)",
                    source.display(),
                    job.output_path.display(),
                    bytes,
                    duration_ms
                );
                if let Some(ref cb) = self.progress {
                    cb.on_job_complete(source, &job.output_path, *bytes);
                }
            }
            Err(e) => {
                job.status = JobStatus::Failed;
                if e.is_cancelled() {
                    info!("Conversion of {} cancelled", source.display());
                } else {
                    warn!("Conversion of {} failed: {}", source.display(), e);
                }
                if let Some(ref cb) = self.progress {
                    cb.on_job_error(source, &e.to_string());
                }
            }
        }

        (job, result, duration_ms)
    }

    async fn run(&mut self, job: &mut ConversionJob) -> Result<u64, Pdf2DocxError> {
        self.check_cancelled()?;

        // ── Step 1: Token ────────────────────────────────────────────────
        let token = self.tokens.access_token().await?;
        self.milestone(job, JobStatus::Uploading, 10);

        let ctx = ApiContext::new(&self.http, &self.config, &self.credentials.client_id, &token);

        // ── Step 2: Upload ───────────────────────────────────────────────
        self.check_cancelled()?;
        let asset_id = upload::upload_asset(ctx, &job.source_path).await?;
        job.asset_id = Some(asset_id.clone());
        self.milestone(job, JobStatus::Uploading, 30);

        // ── Step 3: Submit ───────────────────────────────────────────────
        self.check_cancelled()?;
        let job_id = submit::submit_export(ctx, &asset_id).await?;
        job.job_id = Some(job_id.clone());
        self.milestone(job, JobStatus::Submitted, 50);

        // ── Step 4: Poll and download ────────────────────────────────────
        self.milestone(job, JobStatus::Polling, 70);
        let bytes = poll::poll_and_download(ctx, &job_id, &job.output_path, &self.cancel).await?;
        self.milestone(job, JobStatus::Done, 100);

        Ok(bytes)
    }

    fn check_cancelled(&self) -> Result<(), Pdf2DocxError> {
        if self.cancel.is_cancelled() {
            Err(Pdf2DocxError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn milestone(&self, job: &mut ConversionJob, status: JobStatus, percent: u8) {
        job.advance(status, percent);
        if let Some(ref cb) = self.progress {
            cb.on_progress(&job.source_path, job.progress_percent, status);
        }
    }
}

/// Convert a single file with a fresh [`Converter`].
pub async fn convert_file(
    source: impl AsRef<Path>,
    config: ConversionConfig,
    credentials: Arc<Credentials>,
) -> Result<ConversionReport, Pdf2DocxError> {
    Converter::new(config, credentials)?.convert(source).await
}

/// Synchronous wrapper around [`convert_file`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    source: impl AsRef<Path>,
    config: ConversionConfig,
    credentials: Arc<Credentials>,
) -> Result<ConversionReport, Pdf2DocxError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2DocxError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(convert_file(source, config, credentials))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ConversionProgressCallback;
    use std::sync::Mutex;

    #[test]
    fn output_path_replaces_extension() {
        assert_eq!(
            output_path_for(Path::new("/docs/report.pdf"), TargetFormat::Docx),
            PathBuf::from("/docs/report.docx")
        );
        assert_eq!(
            output_path_for(Path::new("scan.final.PDF"), TargetFormat::Rtf),
            PathBuf::from("scan.final.rtf")
        );
        assert_eq!(
            output_path_for(Path::new("noext"), TargetFormat::Docx),
            PathBuf::from("noext.docx")
        );
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl ConversionProgressCallback for Recorder {
        fn on_job_start(&self, _source: &Path) {
            self.events.lock().unwrap().push("start".into());
        }
        fn on_job_error(&self, _source: &Path, error: &str) {
            self.events.lock().unwrap().push(format!("error: {error}"));
        }
    }

    fn offline_converter() -> Converter {
        let config = ConversionConfig::builder()
            .token_url("http://127.0.0.1:9/token")
            .api_base_url("http://127.0.0.1:9")
            .build()
            .unwrap();
        Converter::new(config, Arc::new(Credentials::new("id", "secret"))).unwrap()
    }

    #[tokio::test]
    async fn cancelled_before_start_reports_cancelled() {
        let recorder = Arc::new(Recorder::default());
        let mut converter = offline_converter().with_progress(recorder.clone());
        converter.cancellation_token().cancel();

        let report = converter.convert_one("/tmp/whatever.pdf").await;
        assert_eq!(report.outcome, JobOutcome::Cancelled);
        assert_eq!(report.job.status, JobStatus::Failed);
        assert_eq!(report.job.output_path, PathBuf::from("/tmp/whatever.docx"));

        let events = recorder.events.lock().unwrap();
        assert_eq!(events[0], "start");
        assert!(events[1].starts_with("error: "));
    }

    #[tokio::test]
    async fn convert_propagates_cancellation() {
        let mut converter = offline_converter();
        converter.cancellation_token().cancel();
        let err = converter.convert("/tmp/whatever.pdf").await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
