//! # pdf2docx
//!
//! Convert PDF documents to DOCX (or other Office formats) through a cloud
//! document-export API.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Token    client-credentials exchange, cached per converter
//!  ├─ 2. Upload   reserve an asset, stream the bytes to its upload URI
//!  ├─ 3. Submit   request the export job, read the job id from Location
//!  ├─ 4. Poll     status checks until done, failed or the retry ceiling
//!  └─ 5. Download stream the result to <name>.docx
//! ```
//!
//! Batch mode runs one tokio task per file through [`BatchController`];
//! each task owns its token cache and cancellation token, and reports
//! progress as [`BatchEvent`]s on a channel.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2docx::{convert_file, ConversionConfig, Credentials};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let credentials = Arc::new(Credentials::load("pdfservices-api-credentials.json")?);
//!     let report = convert_file("report.pdf", ConversionConfig::default(), credentials).await?;
//!     println!("wrote {}", report.job.output_path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2docx` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2docx = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod convert;
pub mod credentials;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod settings;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{BatchController, BatchEvent, ProgressRow, ProgressTable, RowId};
pub use config::{ConversionConfig, ConversionConfigBuilder, TargetFormat};
pub use convert::{convert_file, convert_sync, output_path_for, Converter};
pub use credentials::{resolve_credentials_path, Credentials};
pub use error::Pdf2DocxError;
pub use output::{ConversionJob, ConversionReport, JobOutcome, JobStatus};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use settings::Settings;
pub use tokio_util::sync::CancellationToken;
