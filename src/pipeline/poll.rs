//! Job status polling and result download.
//!
//! This is the only stage that retries. Status queries and download
//! attempts share one counter bounded by `max_retries`; the inter-poll sleep
//! and every chunk write observe the job's cancellation token.
//!
//! The result is streamed into `<output>.part` and renamed over the target
//! once complete, so a cancelled or failed download never leaves a truncated
//! document where a previous one used to be.

use crate::error::Pdf2DocxError;
use crate::pipeline::{describe_failure, ApiContext};
use futures::StreamExt;
use reqwest::Method;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Body of the job status endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: String,
    #[serde(rename = "downloadUri", default)]
    pub download_uri: Option<String>,
    #[serde(default)]
    pub asset: Option<AssetInfo>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetInfo {
    #[serde(rename = "downloadUri", default)]
    pub download_uri: Option<String>,
}

/// What one status query says about the job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    /// Finished; carries the download URI if the payload offered one.
    Done(Option<String>),
    /// The service gave up on the job.
    Failed(String),
    /// Anything else, e.g. `in progress`.
    Running(String),
}

impl StatusResponse {
    /// Top-level `downloadUri` first, then `asset.downloadUri`. Empty
    /// strings count as absent.
    pub fn download_uri(&self) -> Option<&str> {
        nonempty(&self.download_uri)
            .or_else(|| self.asset.as_ref().and_then(|a| nonempty(&a.download_uri)))
    }

    pub fn state(&self) -> JobState {
        match self.status.trim().to_ascii_lowercase().as_str() {
            "done" => JobState::Done(self.download_uri().map(str::to_string)),
            "failed" => JobState::Failed(self.error_detail()),
            other => JobState::Running(other.to_string()),
        }
    }

    fn error_detail(&self) -> String {
        match &self.error {
            Some(serde_json::Value::Object(map)) => {
                let code = map.get("code").and_then(|v| v.as_str());
                let message = map.get("message").and_then(|v| v.as_str());
                match (code, message) {
                    (Some(c), Some(m)) => format!("{c}: {m}"),
                    (None, Some(m)) => m.to_string(),
                    (Some(c), None) => c.to_string(),
                    (None, None) => serde_json::Value::Object(map.clone()).to_string(),
                }
            }
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "no error detail reported".to_string(),
        }
    }
}

fn nonempty(uri: &Option<String>) -> Option<&str> {
    uri.as_deref().filter(|u| !u.trim().is_empty())
}

/// Poll `job_id` until it is done, then download the result to `output`.
///
/// Returns the number of bytes written.
///
/// # Errors
/// - [`Pdf2DocxError::Cancelled`] once `cancel` fires
/// - [`Pdf2DocxError::JobFailed`] / [`Pdf2DocxError::MissingDownloadUri`]
///   immediately, without retrying
/// - [`Pdf2DocxError::PollTimeout`] when the job never finished
/// - [`Pdf2DocxError::DownloadFailed`] when the job finished but every
///   remaining attempt to fetch the result failed
pub async fn poll_and_download(
    ctx: ApiContext<'_>,
    job_id: &str,
    output: &Path,
    cancel: &CancellationToken,
) -> Result<u64, Pdf2DocxError> {
    let max_attempts = ctx.config.max_retries;
    let interval = Duration::from_millis(ctx.config.poll_interval_ms);
    let status_url = ctx.config.status_url(job_id);

    let mut attempts = 0u32;
    let mut last_error: Option<String> = None;
    let mut ready: Option<String> = None;

    while attempts < max_attempts {
        if cancel.is_cancelled() {
            return Err(Pdf2DocxError::Cancelled);
        }
        attempts += 1;

        if ready.is_none() {
            match check_status(ctx, &status_url).await {
                Ok(JobState::Done(Some(uri))) => {
                    info!("Job {job_id} done after {attempts} status check(s)");
                    ready = Some(uri);
                }
                Ok(JobState::Done(None)) => {
                    return Err(Pdf2DocxError::MissingDownloadUri {
                        job_id: job_id.to_string(),
                    });
                }
                Ok(JobState::Failed(detail)) => {
                    return Err(Pdf2DocxError::JobFailed {
                        job_id: job_id.to_string(),
                        detail,
                    });
                }
                Ok(JobState::Running(status)) => {
                    debug!("Job {job_id}: status '{status}' ({attempts}/{max_attempts})");
                }
                Err(e) => {
                    warn!("Job {job_id}: status check {attempts}/{max_attempts} failed: {e}");
                    last_error = Some(e);
                }
            }
        }

        if let Some(uri) = ready.as_deref() {
            match download(ctx, uri, output, cancel).await {
                Ok(bytes) => return Ok(bytes),
                Err(Pdf2DocxError::DownloadFailed { detail, .. }) => {
                    warn!("Job {job_id}: download attempt {attempts}/{max_attempts} failed: {detail}");
                    last_error = Some(detail);
                }
                Err(e) => return Err(e),
            }
        }

        if attempts < max_attempts {
            pause(interval, cancel).await?;
        }
    }

    match ready {
        Some(url) => Err(Pdf2DocxError::DownloadFailed {
            url,
            detail: last_error.unwrap_or_else(|| "retries exhausted".into()),
        }),
        None => Err(Pdf2DocxError::PollTimeout {
            job_id: job_id.to_string(),
            attempts,
            last_error,
        }),
    }
}

async fn check_status(ctx: ApiContext<'_>, url: &str) -> Result<JobState, String> {
    let response = ctx
        .request(Method::GET, url)
        .send()
        .await
        .map_err(|e| format!("request failed: {e}"))?;

    if !response.status().is_success() {
        return Err(describe_failure(response).await);
    }

    let body: StatusResponse = response
        .json()
        .await
        .map_err(|e| format!("malformed status response: {e}"))?;
    Ok(body.state())
}

/// Sleep for `interval` unless `cancel` fires first.
async fn pause(interval: Duration, cancel: &CancellationToken) -> Result<(), Pdf2DocxError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(Pdf2DocxError::Cancelled),
        _ = sleep(interval) => Ok(()),
    }
}

/// `<output>.part`, next to the final file.
pub fn part_path(output: &Path) -> PathBuf {
    let mut name = output.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    output.with_file_name(name)
}

async fn download(
    ctx: ApiContext<'_>,
    url: &str,
    output: &Path,
    cancel: &CancellationToken,
) -> Result<u64, Pdf2DocxError> {
    let part = part_path(output);
    let result = download_to(ctx, url, output, &part, cancel).await;
    if result.is_err() {
        let _ = tokio::fs::remove_file(&part).await;
    }
    result
}

async fn download_to(
    ctx: ApiContext<'_>,
    url: &str,
    output: &Path,
    part: &Path,
    cancel: &CancellationToken,
) -> Result<u64, Pdf2DocxError> {
    let failed = |detail: String| Pdf2DocxError::DownloadFailed {
        url: url.to_string(),
        detail,
    };
    let write_failed = |source: std::io::Error| Pdf2DocxError::OutputWriteFailed {
        path: output.to_path_buf(),
        source,
    };

    // Pre-signed URI: no API key or bearer token.
    let response = ctx
        .http
        .get(url)
        .timeout(ctx.transfer_timeout())
        .send()
        .await
        .map_err(|e| failed(e.to_string()))?;

    if !response.status().is_success() {
        return Err(failed(describe_failure(response).await));
    }

    let mut file = tokio::fs::File::create(part).await.map_err(write_failed)?;
    let chunk_size = ctx.config.chunk_size.max(1);
    let mut written = 0u64;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| failed(e.to_string()))?;
        for slice in chunk.chunks(chunk_size) {
            if cancel.is_cancelled() {
                return Err(Pdf2DocxError::Cancelled);
            }
            file.write_all(slice).await.map_err(write_failed)?;
            written += slice.len() as u64;
        }
    }

    file.flush().await.map_err(write_failed)?;
    drop(file);
    tokio::fs::rename(part, output).await.map_err(write_failed)?;

    info!("Saved {} ({} bytes)", output.display(), written);
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(json: &str) -> StatusResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn top_level_download_uri_wins() {
        let s = status(
            r#"{"status":"done","downloadUri":"https://a/top","asset":{"downloadUri":"https://a/nested"}}"#,
        );
        assert_eq!(s.state(), JobState::Done(Some("https://a/top".into())));
    }

    #[test]
    fn nested_download_uri_is_the_fallback() {
        let s = status(r#"{"status":"done","asset":{"downloadUri":"https://a/nested","assetID":"x"}}"#);
        assert_eq!(s.download_uri(), Some("https://a/nested"));
    }

    #[test]
    fn done_without_uri() {
        let s = status(r#"{"status":"done","downloadUri":""}"#);
        assert_eq!(s.state(), JobState::Done(None));
    }

    #[test]
    fn failed_carries_error_detail() {
        let s = status(
            r#"{"status":"failed","error":{"code":"BAD_PDF","message":"Unable to parse","status":400}}"#,
        );
        assert_eq!(s.state(), JobState::Failed("BAD_PDF: Unable to parse".into()));
    }

    #[test]
    fn other_statuses_keep_running() {
        assert_eq!(
            status(r#"{"status":"in progress"}"#).state(),
            JobState::Running("in progress".into())
        );
        assert_eq!(status("{}").state(), JobState::Running(String::new()));
    }

    #[test]
    fn part_file_sits_next_to_output() {
        assert_eq!(
            part_path(Path::new("/tmp/out/report.docx")),
            PathBuf::from("/tmp/out/report.docx.part")
        );
    }

    #[tokio::test]
    async fn pause_is_interrupted_by_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let started = std::time::Instant::now();
        let err = pause(Duration::from_secs(60), &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn cancelled_before_first_attempt() {
        let config = crate::config::ConversionConfig::builder()
            .api_base_url("http://127.0.0.1:9")
            .build()
            .unwrap();
        let http = reqwest::Client::new();
        let ctx = ApiContext::new(&http, &config, "key", "token");
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.docx");

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = poll_and_download(ctx, "job", &out, &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(!out.exists());
    }
}
