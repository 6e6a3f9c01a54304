//! Export job submission.
//!
//! The service answers `201 Created` with an empty body; the job id lives in
//! the `Location` header as the path segment before the trailing `status`:
//!
//! ```text
//! https://host/operation/exportpdf/<job-id>/status
//! ```

use crate::config::TargetFormat;
use crate::error::Pdf2DocxError;
use crate::pipeline::{describe_failure, ApiContext};
use reqwest::header::LOCATION;
use reqwest::Method;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
struct ExportRequest<'a> {
    #[serde(rename = "assetID")]
    asset_id: &'a str,
    #[serde(rename = "targetFormat")]
    target_format: TargetFormat,
    #[serde(rename = "ocrLang")]
    ocr_lang: &'a str,
}

/// Submit an export job for `asset_id` and return its job id.
pub async fn submit_export(ctx: ApiContext<'_>, asset_id: &str) -> Result<String, Pdf2DocxError> {
    let fail = |detail: String| Pdf2DocxError::SubmissionError { detail };

    let request = ExportRequest {
        asset_id,
        target_format: ctx.config.target_format,
        ocr_lang: &ctx.config.ocr_lang,
    };

    let response = ctx
        .request(Method::POST, &ctx.config.export_url())
        .json(&request)
        .send()
        .await
        .map_err(|e| fail(format!("export request failed: {e}")))?;

    if !response.status().is_success() {
        return Err(fail(describe_failure(response).await));
    }

    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| fail("response has no Location header".into()))?;

    let job_id =
        parse_job_id(location).ok_or_else(|| fail(format!("no job id in Location '{location}'")))?;

    info!("Export job {job_id} submitted for asset {asset_id}");
    Ok(job_id)
}

/// Second-to-last path segment of a `Location` value, ignoring any query
/// string or fragment. `None` when that segment is missing or empty.
pub fn parse_job_id(location: &str) -> Option<String> {
    let path = location.trim().split(['?', '#']).next()?;
    let segment = path.rsplit('/').nth(1)?;
    if segment.is_empty() {
        return None;
    }
    Some(segment.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_from_absolute_location() {
        assert_eq!(
            parse_job_id("https://pdf-services.adobe.io/operation/exportpdf/AbC123/status"),
            Some("AbC123".into())
        );
    }

    #[test]
    fn job_id_ignores_query_and_fragment() {
        assert_eq!(
            parse_job_id("/operation/exportpdf/job-9/status?x=1#frag"),
            Some("job-9".into())
        );
    }

    #[test]
    fn job_id_rejects_short_or_empty_paths() {
        assert_eq!(parse_job_id("status"), None);
        assert_eq!(parse_job_id(""), None);
        assert_eq!(parse_job_id("/operation//status"), None);
    }

    #[test]
    fn export_request_wire_shape() {
        let json = serde_json::to_value(ExportRequest {
            asset_id: "urn:aaid:1",
            target_format: TargetFormat::Docx,
            ocr_lang: "en-US",
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "assetID": "urn:aaid:1", "targetFormat": "docx", "ocrLang": "en-US" })
        );
    }
}
