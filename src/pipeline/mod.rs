//! Pipeline stages for PDF-to-DOCX conversion.
//!
//! Each submodule implements exactly one step of the remote workflow. The
//! orchestrator in [`crate::convert`] runs them in order for one file.
//!
//! ## Data Flow
//!
//! ```text
//! token ──▶ input ──▶ upload ──▶ submit ──▶ poll
//! (OAuth)   (%PDF)    (asset)    (job id)   (status → download)
//! ```
//!
//! 1. [`token`]  client-credentials exchange with an owned cache
//! 2. [`input`]  validate the local source before spending an upload slot
//! 3. [`upload`] request an upload URI, stream the bytes, yield an asset id
//! 4. [`submit`] request the export job, read the job id from `Location`
//! 5. [`poll`]   the only stage that retries: status checks until terminal,
//!    then a streamed download honouring the cancellation token

pub mod input;
pub mod poll;
pub mod submit;
pub mod token;
pub mod upload;

use crate::config::ConversionConfig;
use reqwest::{Method, RequestBuilder, Response};
use std::time::Duration;

/// Everything an authenticated stage needs to talk to the export API.
///
/// Borrowed from the owning [`crate::convert::Converter`] for the duration
/// of one job; the token is the one the job's own token manager returned.
#[derive(Clone, Copy)]
pub struct ApiContext<'a> {
    pub http: &'a reqwest::Client,
    pub config: &'a ConversionConfig,
    /// Sent as `x-api-key`; the client id from the credentials file.
    pub api_key: &'a str,
    pub token: &'a str,
}

impl<'a> ApiContext<'a> {
    pub fn new(
        http: &'a reqwest::Client,
        config: &'a ConversionConfig,
        api_key: &'a str,
        token: &'a str,
    ) -> Self {
        Self {
            http,
            config,
            api_key,
            token,
        }
    }

    /// Request carrying the API key, bearer token and the short request timeout.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("x-api-key", self.api_key)
            .bearer_auth(self.token)
            .timeout(self.request_timeout())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs)
    }

    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.config.upload_timeout_secs)
    }
}

/// `"HTTP <status>: <body>"` for a non-success response, body truncated.
pub(crate) async fn describe_failure(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let body = body.trim();
    if body.is_empty() {
        format!("HTTP {status}")
    } else if body.chars().count() > 200 {
        let cut: String = body.chars().take(200).collect();
        format!("HTTP {status}: {cut}\u{2026}")
    } else {
        format!("HTTP {status}: {body}")
    }
}
