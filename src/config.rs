//! Configuration types for PDF-to-DOCX conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The defaults match the public cloud
//! export service; tests and self-hosted gateways override the two endpoint
//! URLs.

use crate::error::Pdf2DocxError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// OAuth client-credentials token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://ims-na1.adobelogin.com/ims/token/v3";

/// Base URL of the asset and export operations.
pub const DEFAULT_API_BASE_URL: &str = "https://pdf-services.adobe.io";

/// Scopes requested during the token exchange.
pub const DEFAULT_SCOPE: &str = "openid,AdobeID,read_organizations,exportpdf";

/// Configuration for a PDF-to-DOCX conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2docx::{ConversionConfig, TargetFormat};
///
/// let config = ConversionConfig::builder()
///     .target_format(TargetFormat::Docx)
///     .ocr_lang("de-DE")
///     .poll_interval_ms(2_000)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Token endpoint for the client-credentials exchange.
    pub token_url: String,

    /// Base URL for `/assets` and `/operation/exportpdf`.
    pub api_base_url: String,

    /// Comma-separated scope list sent with the token exchange.
    pub scope: String,

    /// Output format requested from the export operation. Default: [`TargetFormat::Docx`].
    pub target_format: TargetFormat,

    /// OCR language hint sent with the export request. Default: `en-US`.
    pub ocr_lang: String,

    /// Timeout for token, asset, submit, and status requests in seconds. Default: 30.
    pub request_timeout_secs: u64,

    /// Timeout for the byte upload and the result download in seconds. Default: 300.
    ///
    /// Source PDFs and exported documents can be tens of megabytes, so the
    /// transfer requests get a minutes-scale budget of their own.
    pub upload_timeout_secs: u64,

    /// Delay between status checks in milliseconds. Default: 10 000.
    pub poll_interval_ms: u64,

    /// Poll ceiling: status checks (and download attempts) before giving up. Default: 5.
    pub max_retries: u32,

    /// Slice size used when writing the downloaded document. Default: 8192.
    ///
    /// Cancellation is checked before every slice, so this also bounds how
    /// much is written after a stop request.
    pub chunk_size: usize,

    /// Optional progress callback receiving per-stage events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            target_format: TargetFormat::default(),
            ocr_lang: "en-US".to_string(),
            request_timeout_secs: 30,
            upload_timeout_secs: 300,
            poll_interval_ms: 10_000,
            max_retries: 5,
            chunk_size: 8192,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("token_url", &self.token_url)
            .field("api_base_url", &self.api_base_url)
            .field("scope", &self.scope)
            .field("target_format", &self.target_format)
            .field("ocr_lang", &self.ocr_lang)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("upload_timeout_secs", &self.upload_timeout_secs)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("max_retries", &self.max_retries)
            .field("chunk_size", &self.chunk_size)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// `{api_base_url}/assets`
    pub fn assets_url(&self) -> String {
        format!("{}/assets", self.api_base_url.trim_end_matches('/'))
    }

    /// `{api_base_url}/operation/exportpdf`
    pub fn export_url(&self) -> String {
        format!("{}/operation/exportpdf", self.api_base_url.trim_end_matches('/'))
    }

    /// `{api_base_url}/operation/exportpdf/{job_id}/status`
    pub fn status_url(&self, job_id: &str) -> String {
        format!("{}/{}/status", self.export_url(), job_id)
    }
}

/// Builder for [`ConversionConfig`].
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl fmt::Debug for ConversionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ConversionConfigBuilder {
    pub fn token_url(mut self, url: impl Into<String>) -> Self {
        self.config.token_url = url.into();
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.config.scope = scope.into();
        self
    }

    pub fn target_format(mut self, format: TargetFormat) -> Self {
        self.config.target_format = format;
        self
    }

    pub fn ocr_lang(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_lang = lang.into();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn upload_timeout_secs(mut self, secs: u64) -> Self {
        self.config.upload_timeout_secs = secs;
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.config.chunk_size = bytes;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Pdf2DocxError> {
        let c = &self.config;
        for (name, url) in [("token URL", &c.token_url), ("API base URL", &c.api_base_url)] {
            reqwest::Url::parse(url).map_err(|e| {
                Pdf2DocxError::InvalidConfig(format!("{name} '{url}' is not a valid URL: {e}"))
            })?;
        }
        if c.max_retries == 0 {
            return Err(Pdf2DocxError::InvalidConfig(
                "max_retries must be ≥ 1".into(),
            ));
        }
        if c.chunk_size == 0 {
            return Err(Pdf2DocxError::InvalidConfig(
                "chunk_size must be ≥ 1".into(),
            ));
        }
        if c.request_timeout_secs == 0 || c.upload_timeout_secs == 0 {
            return Err(Pdf2DocxError::InvalidConfig(
                "timeouts must be ≥ 1 second".into(),
            ));
        }
        if c.ocr_lang.trim().is_empty() {
            return Err(Pdf2DocxError::InvalidConfig("ocr_lang must not be empty".into()));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Office formats offered by the export operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    /// Word 2007+ (default).
    #[default]
    Docx,
    /// Legacy Word 97–2003.
    Doc,
    /// PowerPoint.
    Pptx,
    /// Excel.
    Xlsx,
    /// Rich Text Format.
    Rtf,
}

impl TargetFormat {
    /// Value sent as `targetFormat` in the export request.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetFormat::Docx => "docx",
            TargetFormat::Doc => "doc",
            TargetFormat::Pptx => "pptx",
            TargetFormat::Xlsx => "xlsx",
            TargetFormat::Rtf => "rtf",
        }
    }

    /// File extension of the converted document (without the dot).
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetFormat {
    type Err = Pdf2DocxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "docx" => Ok(TargetFormat::Docx),
            "doc" => Ok(TargetFormat::Doc),
            "pptx" => Ok(TargetFormat::Pptx),
            "xlsx" => Ok(TargetFormat::Xlsx),
            "rtf" => Ok(TargetFormat::Rtf),
            other => Err(Pdf2DocxError::InvalidConfig(format!(
                "unsupported target format '{other}' (expected docx, doc, pptx, xlsx or rtf)"
            ))),
        }
    }
}
