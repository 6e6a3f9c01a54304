//! CLI binary for pdf2docx.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionConfig`, resolves credentials and renders progress.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use pdf2docx::{
    resolve_credentials_path, BatchController, BatchEvent, ConversionConfig,
    ConversionProgressCallback, Converter, Credentials, JobOutcome, JobStatus, ProgressRow,
    ProgressTable, RowId, Settings, TargetFormat,
};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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

// ── Single-file progress callback ────────────────────────────────────────────

/// One bar that walks through the pipeline milestones of a single file.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}%  {msg}  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Requesting token…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_job_start(&self, source: &Path) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {}…", source.display()))
        ));
    }

    fn on_progress(&self, _source: &Path, percent: u8, status: JobStatus) {
        self.bar.set_prefix(status.label());
        self.bar.set_message("");
        self.bar.set_position(percent as u64);
    }

    fn on_job_complete(&self, _source: &Path, output: &Path, bytes_written: u64) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {}  {}",
            green("✔"),
            bold(&output.display().to_string()),
            dim(&format!("{bytes_written} bytes")),
        );
    }

    fn on_job_error(&self, _source: &Path, _error: &str) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert one file (writes report.docx next to it)
  pdf2docx -k pdfservices-api-credentials.json report.pdf

  # Later runs reuse the remembered credentials file
  pdf2docx report.pdf

  # Several files at once, one progress row each
  pdf2docx scans/*.pdf

  # Other Office formats and OCR languages
  pdf2docx --format xlsx --ocr-lang de-DE tables.pdf

ENVIRONMENT VARIABLES:
  PDF2DOCX_CREDENTIALS    Credentials JSON file
  PDF2DOCX_CONFIG_DIR     Directory holding settings.json
  PDF2DOCX_FORMAT         Target format (docx, doc, pptx, xlsx, rtf)
  PDF2DOCX_POLL_INTERVAL  Seconds between status checks
  RUST_LOG                Overrides the log filter (e.g. pdf2docx=debug)

CREDENTIALS FILE:
  {"client_credentials": {"client_id": "...", "client_secret": "..."}}

  The path given with --credentials is remembered in
  <config dir>/pdf2docx/settings.json and used when the flag is omitted.
"#;

/// Convert PDF files to DOCX through the cloud export API.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2docx",
    version,
    about = "Convert PDF files to DOCX through a cloud document-export API",
    long_about = "Upload PDF documents to a cloud export service, wait for the conversion job \
and download the resulting Office document next to each source file. Several files are \
converted concurrently, each with its own progress row.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF files to convert.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Credentials JSON file. Defaults to the last one used.
    #[arg(short = 'k', long, env = "PDF2DOCX_CREDENTIALS")]
    credentials: Option<PathBuf>,

    /// Output format.
    #[arg(long, env = "PDF2DOCX_FORMAT", value_enum, default_value = "docx")]
    format: FormatArg,

    /// OCR language sent with the export job.
    #[arg(long, env = "PDF2DOCX_OCR_LANG", default_value = "en-US")]
    ocr_lang: String,

    /// Seconds between job status checks.
    #[arg(long, env = "PDF2DOCX_POLL_INTERVAL", default_value_t = 10)]
    poll_interval: u64,

    /// Status checks before giving up on a job.
    #[arg(long, env = "PDF2DOCX_MAX_RETRIES", default_value_t = 5,
          value_parser = clap::value_parser!(u32).range(1..))]
    max_retries: u32,

    /// Timeout in seconds for token, asset, submit and status requests.
    #[arg(long, env = "PDF2DOCX_REQUEST_TIMEOUT", default_value_t = 30)]
    request_timeout: u64,

    /// Timeout in seconds for the upload and download transfers.
    #[arg(long, env = "PDF2DOCX_UPLOAD_TIMEOUT", default_value_t = 300)]
    upload_timeout: u64,

    /// OAuth token endpoint.
    #[arg(long, env = "PDF2DOCX_TOKEN_URL", default_value = pdf2docx::config::DEFAULT_TOKEN_URL)]
    token_url: String,

    /// Base URL of the export API.
    #[arg(long, env = "PDF2DOCX_API_URL", default_value = pdf2docx::config::DEFAULT_API_BASE_URL)]
    api_url: String,

    /// Show the batch table even for a single file.
    #[arg(long, env = "PDF2DOCX_BATCH")]
    batch: bool,

    /// Disable progress bars.
    #[arg(long, env = "PDF2DOCX_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2DOCX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2DOCX_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Docx,
    Doc,
    Pptx,
    Xlsx,
    Rtf,
}

impl From<FormatArg> for TargetFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Docx => TargetFormat::Docx,
            FormatArg::Doc => TargetFormat::Doc,
            FormatArg::Pptx => TargetFormat::Pptx,
            FormatArg::Xlsx => TargetFormat::Xlsx,
            FormatArg::Rtf => TargetFormat::Rtf,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs would tear through the progress bars, so they are
    // suppressed while bars are drawn.
    let show_progress = !cli.quiet && !cli.no_progress;
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

    // ── Credentials ──────────────────────────────────────────────────────
    let credentials = Arc::new(load_credentials(&cli)?);
    let config = build_config(&cli)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let all_ok = if cli.files.len() == 1 && !cli.batch {
        run_single(&cli, config, credentials, show_progress).await?
    } else {
        run_batch(&cli, config, credentials, show_progress).await?
    };

    Ok(if all_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Flag/env path first, then the remembered one. A path that loads is
/// remembered for next time.
fn load_credentials(cli: &Cli) -> Result<Credentials> {
    let mut settings = Settings::load().unwrap_or_else(|e| {
        warn!("Ignoring unreadable settings: {e}");
        Settings::default()
    });

    let path = resolve_credentials_path(
        cli.credentials.as_deref(),
        settings.credentials_path.as_deref(),
    )
    .context(
        "No credentials file configured.\n\
         Pass --credentials <PATH> or set PDF2DOCX_CREDENTIALS.",
    )?;

    let credentials = Credentials::load(&path)?;

    if settings.remember_credentials(&path) {
        if let Err(e) = settings.save() {
            warn!("Could not remember credentials path: {e}");
        }
    }
    Ok(credentials)
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli) -> Result<ConversionConfig> {
    ConversionConfig::builder()
        .target_format(cli.format.into())
        .ocr_lang(cli.ocr_lang.clone())
        .poll_interval_ms(cli.poll_interval.saturating_mul(1000))
        .max_retries(cli.max_retries)
        .request_timeout_secs(cli.request_timeout)
        .upload_timeout_secs(cli.upload_timeout)
        .token_url(cli.token_url.clone())
        .api_base_url(cli.api_url.clone())
        .build()
        .context("Invalid configuration")
}

// ── Single-file mode ─────────────────────────────────────────────────────────

async fn run_single(
    cli: &Cli,
    config: ConversionConfig,
    credentials: Arc<Credentials>,
    show_progress: bool,
) -> Result<bool> {
    let mut converter = Converter::new(config, credentials).context("Failed to start")?;
    if show_progress {
        converter = converter.with_progress(CliProgressCallback::new());
    }

    let cancel = converter.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    match converter.convert(&cli.files[0]).await {
        Ok(report) => {
            if !cli.quiet && !show_progress {
                eprintln!(
                    "Converted {} -> {} in {}ms",
                    report.job.source_path.display(),
                    report.job.output_path.display(),
                    report.duration_ms
                );
            }
            Ok(true)
        }
        Err(e) => {
            println!("Conversion failed: {e}");
            Ok(false)
        }
    }
}

// ── Batch mode ───────────────────────────────────────────────────────────────

fn row_style(percent: u8) -> ProgressStyle {
    let bar = if percent < 33 {
        "{bar:30.red/238}"
    } else if percent < 66 {
        "{bar:30}"
    } else {
        "{bar:30.green/238}"
    };
    ProgressStyle::with_template(&format!("{{prefix:<32}} [{bar}] {{pos:>3}}%  {{msg}}"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
}

fn render_row(multi: &MultiProgress, bars: &mut HashMap<RowId, ProgressBar>, row: &ProgressRow) {
    let bar = bars.entry(row.row).or_insert_with(|| {
        let bar = multi.add(ProgressBar::new(100));
        bar.set_prefix(row.file_name.clone());
        bar
    });
    bar.set_style(row_style(row.percent));
    bar.set_position(row.percent as u64);
    bar.set_message(row.status_text.clone());
    if row.finished {
        bar.finish();
    }
}

async fn run_batch(
    cli: &Cli,
    config: ConversionConfig,
    credentials: Arc<Credentials>,
    show_progress: bool,
) -> Result<bool> {
    let (mut batch, mut events) =
        BatchController::new(config, credentials).context("Failed to start")?;
    for file in &cli.files {
        batch.enqueue(file);
    }
    let total = batch.len();
    batch.start();

    let multi = MultiProgress::new();
    if !show_progress {
        multi.set_draw_target(ProgressDrawTarget::hidden());
    }
    let mut table = ProgressTable::new();
    let mut bars: HashMap<RowId, ProgressBar> = HashMap::new();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut stopping = false;

    while table.finished() < total {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let Some(row) = table.apply(&event).cloned() else { continue };
                if show_progress {
                    render_row(&multi, &mut bars, &row);
                } else if !cli.quiet {
                    if let BatchEvent::Completed { outcome, .. } = &event {
                        let mark = if outcome.is_success() { green("✔") } else { red("✘") };
                        eprintln!("{mark} {}  {}", row.file_name, row.status_text);
                    }
                }
            }
            _ = &mut ctrl_c, if !stopping => {
                stopping = true;
                batch.stop_all();
                let _ = multi.println(format!("{} Stopping all jobs…", cyan("■")));
            }
        }
    }

    let reports = batch.join().await;
    let converted = reports.iter().filter(|r| r.is_success()).count();
    let stopped = reports
        .iter()
        .filter(|r| r.outcome == JobOutcome::Cancelled)
        .count();
    let failed = reports.len() - converted - stopped;

    if !cli.quiet {
        eprintln!(
            "{}  {}/{} converted  {}  {}",
            if converted == reports.len() { green("✔") } else { cyan("⚠") },
            bold(&converted.to_string()),
            reports.len(),
            dim(&format!("{failed} failed")),
            dim(&format!("{stopped} stopped")),
        );
    }

    Ok(converted == total)
}
