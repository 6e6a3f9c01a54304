//! Service credentials loaded from the vendor's JSON key file.
//!
//! The file is the one downloaded from the developer console:
//!
//! ```json
//! { "client_credentials": { "client_id": "…", "client_secret": "…" } }
//! ```
//!
//! Only the token manager reads the secret; every other stage only needs the
//! client id for the `x-api-key` header.

use crate::error::Pdf2DocxError;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

/// Client id / secret pair for the client-credentials exchange.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Deserialize)]
struct CredentialsFile {
    client_credentials: Credentials,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Read and validate a credentials file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Pdf2DocxError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|_| Pdf2DocxError::CredentialsNotFound {
            path: path.to_path_buf(),
        })?;
        let creds = Self::from_json(&text).map_err(|detail| Pdf2DocxError::InvalidCredentials {
            path: path.to_path_buf(),
            detail,
        })?;
        info!("Credentials loaded from {}", path.display());
        Ok(creds)
    }

    /// Parse the key-file JSON. Empty fields are rejected.
    pub fn from_json(text: &str) -> Result<Self, String> {
        let file: CredentialsFile = serde_json::from_str(text).map_err(|e| e.to_string())?;
        let creds = file.client_credentials;
        if creds.client_id.trim().is_empty() {
            return Err("client_id is empty".into());
        }
        if creds.client_secret.trim().is_empty() {
            return Err("client_secret is empty".into());
        }
        Ok(creds)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Pick the credentials path: an explicit choice wins over the remembered one.
pub fn resolve_credentials_path(
    explicit: Option<&Path>,
    remembered: Option<&Path>,
) -> Option<PathBuf> {
    explicit.or(remembered).map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const KEY_FILE: &str = r#"{
        "client_credentials": { "client_id": "abc123", "client_secret": "s3cret" },
        "service_principal_credentials": { "organization_id": "org@AdobeOrg" }
    }"#;

    #[test]
    fn parses_key_file_ignoring_extra_sections() {
        let c = Credentials::from_json(KEY_FILE).unwrap();
        assert_eq!(c.client_id, "abc123");
        assert_eq!(c.client_secret, "s3cret");
    }

    #[test]
    fn rejects_missing_section() {
        let err = Credentials::from_json(r#"{"client_id": "x"}"#).unwrap_err();
        assert!(err.contains("client_credentials"), "got: {err}");
    }

    #[test]
    fn rejects_empty_secret() {
        let err = Credentials::from_json(
            r#"{"client_credentials": {"client_id": "x", "client_secret": " "}}"#,
        )
        .unwrap_err();
        assert!(err.contains("client_secret"));
    }

    #[test]
    fn debug_redacts_secret() {
        let c = Credentials::new("id", "topsecret");
        let dbg = format!("{c:?}");
        assert!(dbg.contains("id"));
        assert!(!dbg.contains("topsecret"));
    }

    #[test]
    fn load_from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(KEY_FILE.as_bytes()).unwrap();
        let c = Credentials::load(f.path()).unwrap();
        assert_eq!(c.client_id, "abc123");
    }

    #[test]
    fn load_missing_file() {
        let err = Credentials::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, Pdf2DocxError::CredentialsNotFound { .. }));
    }

    #[test]
    fn load_invalid_json() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"{ nope").unwrap();
        let err = Credentials::load(f.path()).unwrap_err();
        assert!(matches!(err, Pdf2DocxError::InvalidCredentials { .. }));
    }

    #[test]
    fn explicit_path_wins() {
        let chosen = resolve_credentials_path(Some(Path::new("a.json")), Some(Path::new("b.json")));
        assert_eq!(chosen, Some(PathBuf::from("a.json")));
        let remembered = resolve_credentials_path(None, Some(Path::new("b.json")));
        assert_eq!(remembered, Some(PathBuf::from("b.json")));
        assert_eq!(resolve_credentials_path(None, None), None);
    }
}
