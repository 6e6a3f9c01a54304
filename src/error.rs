//! Error types for the pdf2docx library.
//!
//! A single fatal error type, [`Pdf2DocxError`], covers every stage of the
//! pipeline. Errors propagate with `?` from the stage functions up to the
//! orchestrator, which is the containment boundary for one file:
//!
//! * [`crate::convert::Converter::convert`] returns `Err(Pdf2DocxError)`
//!   on the first failing stage (single-file mode).
//! * [`crate::convert::Converter::convert_one`] catches the error and stores
//!   its message in a [`crate::output::JobOutcome`], so one bad file never
//!   aborts its siblings in a batch.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2docx library.
#[derive(Debug, Error)]
pub enum Pdf2DocxError {
    // ── Credential errors ─────────────────────────────────────────────────
    /// The credentials file does not exist or cannot be opened.
    #[error("Credentials file not found: '{path}'\nPass --credentials <PATH> or set PDF2DOCX_CREDENTIALS.")]
    CredentialsNotFound { path: PathBuf },

    /// The credentials file was read but does not have the expected shape.
    #[error("Invalid credentials file '{path}': {detail}")]
    InvalidCredentials { path: PathBuf, detail: String },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Source PDF was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the source file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Remote service errors ─────────────────────────────────────────────
    /// Token exchange failed (bad credentials, non-success status, or a
    /// response body without `access_token` / `expires_in`).
    #[error("Authentication failed: {detail}")]
    AuthError { detail: String },

    /// Asset creation or byte transfer failed.
    #[error("Upload of '{path}' failed: {detail}")]
    UploadError { path: PathBuf, detail: String },

    /// The export request was rejected or its response carried no usable job id.
    #[error("Job submission failed: {detail}")]
    SubmissionError { detail: String },

    /// The job never reached `done` within the poll ceiling.
    #[error("Job {job_id} did not finish after {attempts} status checks{}", last_error_suffix(.last_error))]
    PollTimeout {
        job_id: String,
        attempts: u32,
        last_error: Option<String>,
    },

    /// The service reported the job as failed.
    #[error("Job {job_id} failed on the server: {detail}")]
    JobFailed { job_id: String, detail: String },

    /// The service reported success but offered no artifact to download.
    #[error("Job {job_id} completed but the status response has no download URI")]
    MissingDownloadUri { job_id: String },

    /// Fetching the converted document failed after all retries.
    #[error("Failed to download result from '{url}': {detail}")]
    DownloadFailed { url: String, detail: String },

    /// The job was stopped through its cancellation token.
    #[error("Conversion cancelled")]
    Cancelled,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output document.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Persisted settings could not be read or written.
    #[error("Settings error for '{path}': {detail}")]
    SettingsError { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn last_error_suffix(last_error: &Option<String>) -> String {
    match last_error {
        Some(e) => format!(" (last error: {e})"),
        None => String::new(),
    }
}

impl Pdf2DocxError {
    /// `true` when the error came from the job's cancellation token.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Pdf2DocxError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_timeout_display_with_last_error() {
        let e = Pdf2DocxError::PollTimeout {
            job_id: "job-1".into(),
            attempts: 5,
            last_error: Some("HTTP 502".into()),
        };
        let msg = e.to_string();
        assert!(msg.contains("job-1"), "got: {msg}");
        assert!(msg.contains("5 status checks"), "got: {msg}");
        assert!(msg.contains("HTTP 502"), "got: {msg}");
    }

    #[test]
    fn poll_timeout_display_without_last_error() {
        let e = Pdf2DocxError::PollTimeout {
            job_id: "job-2".into(),
            attempts: 3,
            last_error: None,
        };
        assert!(!e.to_string().contains("last error"));
    }

    #[test]
    fn missing_download_uri_display() {
        let e = Pdf2DocxError::MissingDownloadUri {
            job_id: "abc".into(),
        };
        assert!(e.to_string().contains("abc"));
        assert!(e.to_string().contains("download URI"));
    }

    #[test]
    fn upload_error_display() {
        let e = Pdf2DocxError::UploadError {
            path: PathBuf::from("/tmp/a.pdf"),
            detail: "HTTP 500".into(),
        };
        assert!(e.to_string().contains("/tmp/a.pdf"));
        assert!(e.to_string().contains("HTTP 500"));
    }

    #[test]
    fn cancelled_is_detected() {
        assert!(Pdf2DocxError::Cancelled.is_cancelled());
        assert!(!Pdf2DocxError::Internal("x".into()).is_cancelled());
    }
}
