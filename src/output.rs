//! Job state and per-file results.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Lifecycle of one [`ConversionJob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Enqueued, not started.
    #[default]
    Pending,
    /// Acquiring a token and transferring the source bytes.
    Uploading,
    /// Export job accepted by the service.
    Submitted,
    /// Waiting for the job to finish, then downloading.
    Polling,
    /// Output written.
    Done,
    /// Terminal failure (including cancellation).
    Failed,
}

impl JobStatus {
    /// `true` for [`JobStatus::Done`] and [`JobStatus::Failed`].
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }

    /// Human-readable label used by the progress table.
    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Pending => "Pending",
            JobStatus::Uploading => "Uploading",
            JobStatus::Submitted => "Submitted",
            JobStatus::Polling => "Converting",
            JobStatus::Done => "Completed",
            JobStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One file's trip through the pipeline.
///
/// Mutated only by the orchestrator that owns it; the remote asset and job
/// ids are never shared with another job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionJob {
    pub source_path: PathBuf,
    pub output_path: PathBuf,
    pub asset_id: Option<String>,
    pub job_id: Option<String>,
    pub status: JobStatus,
    /// 0–100.
    pub progress_percent: u8,
}

impl ConversionJob {
    pub fn new(source_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            output_path: output_path.into(),
            asset_id: None,
            job_id: None,
            status: JobStatus::Pending,
            progress_percent: 0,
        }
    }

    /// Advance to `status` at `percent`. Progress never moves backwards.
    pub fn advance(&mut self, status: JobStatus, percent: u8) {
        self.status = status;
        self.progress_percent = self.progress_percent.max(percent.min(100));
    }

    /// File name shown in progress rows.
    pub fn file_name(&self) -> String {
        display_name(&self.source_path)
    }
}

/// Final result of one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    /// The converted document was written.
    Completed { bytes_written: u64 },
    /// A stage failed; the message is the error's display text.
    Failed { message: String },
    /// The job observed its cancellation token.
    Cancelled,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Completed { .. })
    }
}

/// What [`crate::convert::Converter::convert_one`] returns for every file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionReport {
    pub job: ConversionJob,
    pub outcome: JobOutcome,
    pub duration_ms: u64,
}

impl ConversionReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Last path component, falling back to the full path.
pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
