use std::io;
use std::path::Path;

use bytes::Bytes;
use portal_core::{FileCandidate, PDF_MIME_TYPE};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("http status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed payload: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("invalid relay url: {0}")]
    InvalidUrl(String),
    #[error("relay unreachable: {0}")]
    Unreachable(String),
    #[error("relay rejected the session: {0}")]
    Rejected(String),
    #[error("relay protocol error: {0}")]
    Protocol(String),
    #[error("relay teardown failed: {0}")]
    Teardown(String),
}

/// Bytes handed to the transport so far, out of `total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub sent: u64,
    pub total: u64,
}

/// A file picked for upload, with its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeUpload {
    pub name: String,
    pub mime_type: Option<String>,
    pub bytes: Bytes,
}

impl ResumeUpload {
    pub fn new(name: impl Into<String>, mime_type: Option<&str>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.map(ToOwned::to_owned),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk. The MIME type is inferred from the extension.
    pub async fn from_path(path: &Path) -> io::Result<Self> {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
        let mime_type = path
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| ext.eq_ignore_ascii_case("pdf"))
            .map(|_| PDF_MIME_TYPE);
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::new(name, mime_type, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn candidate(&self) -> FileCandidate {
        FileCandidate::new(self.name.clone(), self.mime_type.as_deref(), self.size())
    }
}
