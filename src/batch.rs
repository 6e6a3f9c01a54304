//! Batch fan-out: one tokio task per file, typed events for the UI.
//!
//! ```text
//!  enqueue ─▶ Queued ───────────────────────────┐
//!  start   ─▶ task per row ─▶ Converter ─▶ ProgressChanged ─┼─▶ mpsc ─▶ ProgressTable
//!                                     └──────▶ Completed ───┘
//! ```
//!
//! Tasks share only the HTTP client, an `Arc<Credentials>` and a cloned
//! config. Each owns its token cache and cancellation token. The event
//! channel is the single synchronisation point; exactly one presentation
//! loop should consume it.

use crate::config::ConversionConfig;
use crate::convert::{build_http_client, output_path_for, Converter};
use crate::credentials::Credentials;
use crate::error::Pdf2DocxError;
use crate::output::{display_name, ConversionJob, ConversionReport, JobOutcome, JobStatus};
use crate::progress::ConversionProgressCallback;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Identifies one row of a batch. Assigned by [`BatchController::enqueue`].
pub type RowId = usize;

/// Messages from batch workers to the presentation loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    Queued { row: RowId, file_name: String },
    ProgressChanged { row: RowId, percent: u8, status: JobStatus },
    Completed { row: RowId, outcome: JobOutcome },
}

impl BatchEvent {
    pub fn row(&self) -> RowId {
        match self {
            BatchEvent::Queued { row, .. }
            | BatchEvent::ProgressChanged { row, .. }
            | BatchEvent::Completed { row, .. } => *row,
        }
    }
}

/// Forwards milestone callbacks for one row onto the event channel.
struct ChannelProgress {
    row: RowId,
    tx: UnboundedSender<BatchEvent>,
    forgotten: Arc<AtomicBool>,
}

impl ConversionProgressCallback for ChannelProgress {
    fn on_progress(&self, _source: &Path, percent: u8, status: JobStatus) {
        if !self.forgotten.load(Ordering::SeqCst) {
            let _ = self.tx.send(BatchEvent::ProgressChanged {
                row: self.row,
                percent,
                status,
            });
        }
    }
}

struct Worker {
    cancel: CancellationToken,
    forgotten: Arc<AtomicBool>,
    handle: JoinHandle<ConversionReport>,
}

enum RowState {
    Queued,
    Running(Worker),
    Joined,
}

struct QueuedFile {
    row: RowId,
    path: PathBuf,
    state: RowState,
}

/// Owns the queued files and their workers.
pub struct BatchController {
    config: ConversionConfig,
    credentials: Arc<Credentials>,
    http: reqwest::Client,
    rows: Vec<QueuedFile>,
    next_row: RowId,
    tx: UnboundedSender<BatchEvent>,
}

impl BatchController {
    /// Create a controller and the receiver its events arrive on.
    pub fn new(
        config: ConversionConfig,
        credentials: Arc<Credentials>,
    ) -> Result<(Self, UnboundedReceiver<BatchEvent>), Pdf2DocxError> {
        Ok(Self::with_http_client(config, credentials, build_http_client()?))
    }

    pub fn with_http_client(
        config: ConversionConfig,
        credentials: Arc<Credentials>,
        http: reqwest::Client,
    ) -> (Self, UnboundedReceiver<BatchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let controller = Self {
            config,
            credentials,
            http,
            rows: Vec::new(),
            next_row: 0,
            tx,
        };
        (controller, rx)
    }

    /// Add a pending row for `path` and emit [`BatchEvent::Queued`].
    pub fn enqueue(&mut self, path: impl Into<PathBuf>) -> RowId {
        let path = path.into();
        let row = self.next_row;
        self.next_row += 1;

        let file_name = display_name(&path);
        debug!("Queued row {row}: {}", path.display());
        self.rows.push(QueuedFile {
            row,
            path,
            state: RowState::Queued,
        });
        let _ = self.tx.send(BatchEvent::Queued { row, file_name });
        row
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Spawn a worker for every row not started yet. Returns how many.
    pub fn start(&mut self) -> usize {
        let mut spawned = 0;
        for entry in self.rows.iter_mut() {
            if !matches!(entry.state, RowState::Queued) {
                continue;
            }
            let worker = spawn_worker(
                entry.row,
                entry.path.clone(),
                self.config.clone(),
                Arc::clone(&self.credentials),
                self.http.clone(),
                self.tx.clone(),
            );
            entry.state = RowState::Running(worker);
            spawned += 1;
        }
        if spawned > 0 {
            info!("Started {spawned} conversion job(s)");
        }
        spawned
    }

    /// Cancel every running job. Requests already on the wire finish on
    /// their own; each job stops at its next check point.
    pub fn stop_all(&self) {
        let mut stopped = 0;
        for entry in &self.rows {
            if let RowState::Running(worker) = &entry.state {
                worker.cancel.cancel();
                stopped += 1;
            }
        }
        if stopped > 0 {
            info!("Stop requested for {stopped} job(s)");
        }
    }

    /// Stop everything and forget all rows. Forgotten rows emit no further
    /// events.
    pub fn clear(&mut self) {
        for entry in self.rows.drain(..) {
            if let RowState::Running(worker) = entry.state {
                worker.forgotten.store(true, Ordering::SeqCst);
                worker.cancel.cancel();
            }
        }
    }

    /// Wait for every started job and return the reports in row order.
    pub async fn join(&mut self) -> Vec<ConversionReport> {
        let mut reports = Vec::new();
        for entry in self.rows.iter_mut() {
            let state = std::mem::replace(&mut entry.state, RowState::Joined);
            let worker = match state {
                RowState::Running(worker) => worker,
                other => {
                    entry.state = other;
                    continue;
                }
            };
            let report = match worker.handle.await {
                Ok(report) => report,
                Err(e) => {
                    warn!("Worker for row {} did not finish: {}", entry.row, e);
                    let output = output_path_for(&entry.path, self.config.target_format);
                    let mut job = ConversionJob::new(&entry.path, output);
                    job.status = JobStatus::Failed;
                    ConversionReport {
                        job,
                        outcome: JobOutcome::Failed {
                            message: format!("worker task failed: {e}"),
                        },
                        duration_ms: 0,
                    }
                }
            };
            reports.push(report);
        }
        reports
    }
}

fn spawn_worker(
    row: RowId,
    path: PathBuf,
    config: ConversionConfig,
    credentials: Arc<Credentials>,
    http: reqwest::Client,
    tx: UnboundedSender<BatchEvent>,
) -> Worker {
    let cancel = CancellationToken::new();
    let forgotten = Arc::new(AtomicBool::new(false));

    let progress = Arc::new(ChannelProgress {
        row,
        tx: tx.clone(),
        forgotten: Arc::clone(&forgotten),
    });
    let mut converter = Converter::with_http_client(config, credentials, http)
        .with_progress(progress)
        .with_cancellation(cancel.clone());

    let task_forgotten = Arc::clone(&forgotten);
    let handle = tokio::spawn(async move {
        let report = converter.convert_one(&path).await;
        if !task_forgotten.load(Ordering::SeqCst) {
            let _ = tx.send(BatchEvent::Completed {
                row,
                outcome: report.outcome.clone(),
            });
        }
        report
    });

    Worker {
        cancel,
        forgotten,
        handle,
    }
}

// ── Presentation-side row model ──────────────────────────────────────────

/// One line of the progress table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRow {
    pub row: RowId,
    pub file_name: String,
    pub percent: u8,
    pub status_text: String,
    pub finished: bool,
}

/// Rows built from [`BatchEvent`]s, in enqueue order.
#[derive(Debug, Default)]
pub struct ProgressTable {
    rows: Vec<ProgressRow>,
}

impl ProgressTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event and return the row it touched. Events for unknown
    /// rows, and progress after a row finished, are ignored.
    pub fn apply(&mut self, event: &BatchEvent) -> Option<&ProgressRow> {
        match event {
            BatchEvent::Queued { row, file_name } => {
                if self.index_of(*row).is_some() {
                    return None;
                }
                self.rows.push(ProgressRow {
                    row: *row,
                    file_name: file_name.clone(),
                    percent: 0,
                    status_text: JobStatus::Pending.label().to_string(),
                    finished: false,
                });
                self.rows.last()
            }
            BatchEvent::ProgressChanged {
                row,
                percent,
                status,
            } => {
                let idx = self.index_of(*row)?;
                let entry = &mut self.rows[idx];
                if entry.finished {
                    return None;
                }
                entry.percent = entry.percent.max((*percent).min(100));
                entry.status_text = status.label().to_string();
                Some(&self.rows[idx])
            }
            BatchEvent::Completed { row, outcome } => {
                let idx = self.index_of(*row)?;
                let entry = &mut self.rows[idx];
                entry.finished = true;
                let text = match outcome {
                    JobOutcome::Completed { .. } => JobStatus::Done.label().to_string(),
                    JobOutcome::Failed { message } => format!("Failed: {message}"),
                    JobOutcome::Cancelled => "Stopped".to_string(),
                };
                if outcome.is_success() {
                    entry.percent = 100;
                }
                entry.status_text = text;
                Some(&self.rows[idx])
            }
        }
    }

    pub fn rows(&self) -> &[ProgressRow] {
        &self.rows
    }

    pub fn row(&self, row: RowId) -> Option<&ProgressRow> {
        self.index_of(row).map(|i| &self.rows[i])
    }

    /// Number of rows that reached a terminal state.
    pub fn finished(&self) -> usize {
        self.rows.iter().filter(|r| r.finished).count()
    }

    pub fn all_finished(&self) -> bool {
        self.rows.iter().all(|r| r.finished)
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    fn index_of(&self, row: RowId) -> Option<usize> {
        self.rows.iter().position(|r| r.row == row)
    }
}
