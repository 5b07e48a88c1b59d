use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Local;
use futures_util::{stream, StreamExt};
use portal_core::{sort_recent_first, Application, ResumeFailure, ResumeFile, PDF_MIME_TYPE};
use portal_logging::{portal_debug, portal_info, portal_warn};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::{ApiError, ResumeUpload, TransferProgress};

const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check if the server is running.";
const UPLOAD_FIELD: &str = "resume";

#[derive(Debug, Clone)]
pub struct PortalSettings {
    /// Root of the collaborator, e.g. `http://localhost:3000/`.
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Whole-request limit. `None` lets long uploads run to completion.
    pub request_timeout: Option<Duration>,
    pub upload_chunk_size: usize,
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
            upload_chunk_size: 64 * 1024,
        }
    }
}

/// Receives upload progress as the body is streamed out.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, progress: TransferProgress);
}

#[async_trait::async_trait]
pub trait ApplicationSource: Send + Sync {
    /// The application log, most recent first.
    async fn fetch_applications(&self) -> Result<Vec<Application>, ApiError>;
}

#[async_trait::async_trait]
pub trait ResumeApi: Send + Sync {
    async fn list_resumes(&self) -> Result<Vec<ResumeFile>, ApiError>;

    async fn upload_resume(
        &self,
        upload: &ResumeUpload,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<(), ResumeFailure>;

    async fn delete_resume(&self, file_name: &str) -> Result<(), ApiError>;
}

/// HTTP client for the dashboard collaborator endpoints.
#[derive(Debug, Clone)]
pub struct ReqwestPortalClient {
    settings: PortalSettings,
    base_url: Url,
    client: reqwest::Client,
}

impl ReqwestPortalClient {
    pub fn new(settings: PortalSettings) -> Result<Self, ApiError> {
        let base_url = Url::parse(&settings.base_url)
            .map_err(|err| ApiError::InvalidEndpoint(err.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidEndpoint(settings.base_url.clone()));
        }

        let mut builder = reqwest::Client::builder().connect_timeout(settings.connect_timeout);
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| ApiError::Network(err.to_string()))?;

        Ok(Self {
            settings,
            base_url,
            client,
        })
    }

    /// Base URL with `segments` appended; each segment is percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidEndpoint(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_bytes(&self, url: Url) -> Result<Bytes, ApiError> {
        portal_debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| ApiError::Network(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: status.to_string(),
            });
        }
        response
            .bytes()
            .await
            .map_err(|err| ApiError::Network(err.to_string()))
    }

    fn chunked_body(&self, upload: &ResumeUpload, sink: Arc<dyn ProgressSink>) -> reqwest::Body {
        let total = upload.size();
        let chunk_size = self.settings.upload_chunk_size.max(1);
        let len = upload.bytes.len();
        let chunks: Vec<Bytes> = (0..len)
            .step_by(chunk_size)
            .map(|start| upload.bytes.slice(start..(start + chunk_size).min(len)))
            .collect();

        let mut sent = 0u64;
        let chunks = stream::iter(chunks).map(move |chunk| {
            sent += chunk.len() as u64;
            sink.emit(TransferProgress { sent, total });
            Ok::<Bytes, io::Error>(chunk)
        });
        reqwest::Body::wrap_stream(chunks)
    }
}

#[async_trait::async_trait]
impl ApplicationSource for ReqwestPortalClient {
    async fn fetch_applications(&self) -> Result<Vec<Application>, ApiError> {
        let body = self.get_bytes(self.endpoint(&["applied.json"])?).await?;
        let mut applications: Vec<Application> = decode_list(&body, "application")?;
        sort_recent_first(&mut applications, &Local);
        portal_info!("loaded {} applications", applications.len());
        Ok(applications)
    }
}

#[async_trait::async_trait]
impl ResumeApi for ReqwestPortalClient {
    async fn list_resumes(&self) -> Result<Vec<ResumeFile>, ApiError> {
        let body = self.get_bytes(self.endpoint(&["api", "resumes"])?).await?;
        decode_list(&body, "resume")
    }

    async fn upload_resume(
        &self,
        upload: &ResumeUpload,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<(), ResumeFailure> {
        let url = self
            .endpoint(&["api", "resumes", "upload"])
            .map_err(|err| ResumeFailure::Transport(err.to_string()))?;
        let mime = upload.mime_type.as_deref().unwrap_or(PDF_MIME_TYPE);
        let part = Part::stream_with_length(self.chunked_body(upload, sink), upload.size())
            .file_name(upload.name.clone())
            .mime_str(mime)
            .map_err(|err| {
                ResumeFailure::Validation(format!("invalid content type {mime}: {err}"))
            })?;

        portal_info!("POST {} name={} size={}", url, upload.name, upload.size());
        let response = self
            .client
            .post(url)
            .multipart(Form::new().part(UPLOAD_FIELD, part))
            .send()
            .await
            .map_err(|err| {
                portal_warn!("upload transport error: {}", err);
                ResumeFailure::Transport(NETWORK_ERROR_MESSAGE.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.bytes().await.unwrap_or_default();
        let message = server_error_message(status, &body);
        portal_warn!("upload rejected status={} message={}", status.as_u16(), message);
        Err(ResumeFailure::Server {
            status: status.as_u16(),
            message,
        })
    }

    async fn delete_resume(&self, file_name: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "resumes", file_name])?;
        portal_info!("DELETE {}", url);
        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(|err| ApiError::Network(err.to_string()))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ApiError::Status {
                status: status.as_u16(),
                message: status.to_string(),
            })
        }
    }
}

/// Decode a JSON array entry by entry, skipping entries that do not fit `T`.
///
/// An empty body or `null` is an empty list.
fn decode_list<T: DeserializeOwned>(body: &[u8], kind: &str) -> Result<Vec<T>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    let entries: Option<Vec<Value>> =
        serde_json::from_slice(body).map_err(|err| ApiError::Decode(err.to_string()))?;

    Ok(entries
        .unwrap_or_default()
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(record) => Some(record),
            Err(err) => {
                portal_warn!("skipping malformed {} entry: {}", kind, err);
                None
            }
        })
        .collect())
}

/// User-facing text for a failed upload response.
///
/// Preference order: the `error` field of a JSON object, a JSON string body,
/// any other non-empty JSON text, then `Server error: <code> <reason>` for
/// empty or non-JSON bodies.
fn server_error_message(status: StatusCode, body: &[u8]) -> String {
    let status_line = || {
        format!(
            "Server error: {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        )
    };
    let raw_text = || {
        std::str::from_utf8(body)
            .ok()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(ToOwned::to_owned)
    };

    let Ok(payload) = serde_json::from_slice::<Value>(body) else {
        return status_line();
    };
    match payload {
        Value::Object(fields) => match fields.get("error") {
            Some(Value::String(message)) if !message.trim().is_empty() => message.clone(),
            _ => raw_text().unwrap_or_else(status_line),
        },
        Value::String(message) if !message.trim().is_empty() => message,
        Value::Null => status_line(),
        _ => raw_text().unwrap_or_else(status_line),
    }
}
