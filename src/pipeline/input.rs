//! Source validation: make sure the local file is a readable PDF.
//!
//! Runs before the asset slot is requested. A file shorter than four bytes
//! skips the magic check and is left for the service to reject.

use crate::error::Pdf2DocxError;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::debug;

/// A validated source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Size in bytes, sent as `Content-Length` on upload.
    pub len: u64,
}

/// Validate existence, read permission and PDF magic bytes.
pub async fn validate_source(path: &Path) -> Result<SourceFile, Pdf2DocxError> {
    let len = match tokio::fs::metadata(path).await {
        Ok(m) if m.is_file() => m.len(),
        _ => {
            return Err(Pdf2DocxError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    };

    let mut file = match tokio::fs::File::open(path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Pdf2DocxError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(Pdf2DocxError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    };

    let mut magic = [0u8; 4];
    if file.read_exact(&mut magic).await.is_ok() && &magic != b"%PDF" {
        return Err(Pdf2DocxError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }

    debug!("Validated source PDF: {} ({} bytes)", path.display(), len);
    Ok(SourceFile {
        path: path.to_path_buf(),
        len,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accepts_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("a.pdf");
        std::fs::write(&p, b"%PDF-1.7\n...").unwrap();
        let src = validate_source(&p).await.unwrap();
        assert_eq!(src.len, 12);
        assert_eq!(src.path, p);
    }

    #[tokio::test]
    async fn missing_file() {
        let err = validate_source(Path::new("/no/such/file.pdf")).await.unwrap_err();
        assert!(matches!(err, Pdf2DocxError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn rejects_non_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("image.pdf");
        std::fs::write(&p, b"\x89PNG....").unwrap();
        match validate_source(&p).await.unwrap_err() {
            Pdf2DocxError::NotAPdf { magic, .. } => assert_eq!(&magic, b"\x89PNG"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn directory_is_not_a_source() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate_source(dir.path()).await.is_err());
    }
}
