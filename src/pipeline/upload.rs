//! Asset upload: reserve an upload slot, then stream the PDF into it.
//!
//! The upload URI returned by the service is pre-signed, so the byte
//! transfer carries neither the API key nor the bearer token. The file is
//! streamed from disk; it is never buffered whole in memory.

use crate::error::Pdf2DocxError;
use crate::pipeline::input::validate_source;
use crate::pipeline::{describe_failure, ApiContext};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Method};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

const PDF_MEDIA_TYPE: &str = "application/pdf";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AssetRequest<'a> {
    media_type: &'a str,
}

/// Response to the asset-creation request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssetSlot {
    #[serde(rename = "uploadUri")]
    pub upload_uri: String,
    #[serde(rename = "assetID")]
    pub asset_id: String,
}

/// Validate `path`, reserve an asset and stream the file to it.
///
/// Returns the service-side asset id. Every failure after validation is an
/// [`Pdf2DocxError::UploadError`] naming the file.
pub async fn upload_asset(ctx: ApiContext<'_>, path: &Path) -> Result<String, Pdf2DocxError> {
    let source = validate_source(path).await?;
    let fail = |detail: String| Pdf2DocxError::UploadError {
        path: path.to_path_buf(),
        detail,
    };

    let slot = request_slot(ctx).await.map_err(fail)?;
    debug!("Asset slot {} reserved for {}", slot.asset_id, path.display());

    let file = tokio::fs::File::open(&source.path)
        .await
        .map_err(|e| fail(format!("cannot open source: {e}")))?;
    let body = Body::wrap_stream(ReaderStream::new(file));

    let response = ctx
        .http
        .put(&slot.upload_uri)
        .header(CONTENT_TYPE, PDF_MEDIA_TYPE)
        .header(CONTENT_LENGTH, source.len)
        .timeout(ctx.transfer_timeout())
        .body(body)
        .send()
        .await
        .map_err(|e| fail(format!("transfer failed: {e}")))?;

    if !response.status().is_success() {
        return Err(fail(describe_failure(response).await));
    }

    info!(
        "Uploaded {} ({} bytes) as asset {}",
        path.display(),
        source.len,
        slot.asset_id
    );
    Ok(slot.asset_id)
}

async fn request_slot(ctx: ApiContext<'_>) -> Result<AssetSlot, String> {
    let response = ctx
        .request(Method::POST, &ctx.config.assets_url())
        .json(&AssetRequest {
            media_type: PDF_MEDIA_TYPE,
        })
        .send()
        .await
        .map_err(|e| format!("asset request failed: {e}"))?;

    if !response.status().is_success() {
        return Err(describe_failure(response).await);
    }

    let slot: AssetSlot = response
        .json()
        .await
        .map_err(|e| format!("malformed asset response: {e}"))?;
    if slot.upload_uri.is_empty() || slot.asset_id.is_empty() {
        return Err("asset response has an empty uploadUri or assetID".into());
    }
    Ok(slot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_request_wire_shape() {
        let json = serde_json::to_value(AssetRequest {
            media_type: PDF_MEDIA_TYPE,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({ "mediaType": "application/pdf" }));
    }

    #[test]
    fn asset_slot_from_service_json() {
        let slot: AssetSlot = serde_json::from_str(
            r#"{"uploadUri":"https://store.example/put?sig=1","assetID":"urn:aaid:AS:123"}"#,
        )
        .unwrap();
        assert_eq!(slot.asset_id, "urn:aaid:AS:123");
        assert_eq!(slot.upload_uri, "https://store.example/put?sig=1");
    }

    #[tokio::test]
    async fn invalid_source_fails_before_any_request() {
        let config = crate::config::ConversionConfig::builder()
            .api_base_url("http://127.0.0.1:9")
            .build()
            .unwrap();
        let http = reqwest::Client::new();
        let ctx = ApiContext::new(&http, &config, "key", "token");

        let err = upload_asset(ctx, Path::new("/no/such.pdf")).await.unwrap_err();
        assert!(matches!(err, Pdf2DocxError::FileNotFound { .. }));
    }
}
