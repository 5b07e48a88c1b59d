use std::cmp::Reverse;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Timestamp layouts without an offset; interpreted in the caller's zone.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// One logged job application, as served by `/applied.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub posted_time: String,
    /// Left empty when missing; such entries still count toward totals.
    #[serde(default)]
    pub application_time: String,
}

impl Application {
    /// When the application was sent, or `None` if the timestamp is unreadable.
    pub fn applied_at<Tz: TimeZone>(&self, tz: &Tz) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.application_time, tz)
    }
}

/// A stored resume, as listed by `/api/resumes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeFile {
    pub name: String,
    #[serde(rename = "type", default)]
    pub mime_type: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub uploaded_at: String,
}

/// Opaque identifier of the browser tab bound to a relay session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TabId(String);

impl TabId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata of a file the user picked for upload. The bytes stay with the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub name: String,
    pub mime_type: Option<String>,
    pub size: u64,
}

impl FileCandidate {
    pub fn new(name: impl Into<String>, mime_type: Option<&str>, size: u64) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.map(ToOwned::to_owned),
            size,
        }
    }

    /// True when either the declared type or the file name says PDF.
    pub fn is_pdf(&self) -> bool {
        let declared = self
            .mime_type
            .as_deref()
            .map(|mime| mime.split(';').next().unwrap_or(mime).trim())
            .is_some_and(|mime| mime.eq_ignore_ascii_case(PDF_MIME_TYPE));
        declared || self.name.to_ascii_lowercase().ends_with(".pdf")
    }
}

/// Everything that can go wrong with a resume operation, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeFailure {
    /// Rejected before any request was made.
    Validation(String),
    /// The collaborator could not be reached.
    Transport(String),
    /// The collaborator answered with a non-success status.
    Server { status: u16, message: String },
    /// A delete request did not succeed.
    Delete { file_name: String, message: String },
}

impl ResumeFailure {
    pub fn message(&self) -> &str {
        match self {
            ResumeFailure::Validation(message) | ResumeFailure::Transport(message) => message,
            ResumeFailure::Server { message, .. } | ResumeFailure::Delete { message, .. } => {
                message
            }
        }
    }
}

impl fmt::Display for ResumeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Parse a collaborator timestamp.
///
/// RFC 3339 values carry their own offset. Values without an offset are read
/// as wall-clock time in `tz`, and a bare date is taken as UTC midnight.
pub fn parse_timestamp<Tz: TimeZone>(raw: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return tz
                .from_local_datetime(&naive)
                .earliest()
                .map(|local| local.with_timezone(&Utc));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Most recent first. Unreadable timestamps sink to the end; ties keep input order.
pub fn sort_recent_first<Tz: TimeZone>(applications: &mut [Application], tz: &Tz) {
    applications.sort_by_cached_key(|application| Reverse(application.applied_at(tz)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_detected_by_type_or_name() {
        assert!(FileCandidate::new("cv.bin", Some("application/pdf"), 1).is_pdf());
        assert!(FileCandidate::new("CV.PDF", None, 1).is_pdf());
        assert!(FileCandidate::new("cv.pdf", Some("application/octet-stream"), 1).is_pdf());
        assert!(!FileCandidate::new("cv.docx", Some("application/msword"), 1).is_pdf());
        assert!(!FileCandidate::new("pdf", None, 1).is_pdf());
    }

    #[test]
    fn naive_timestamp_uses_given_zone() {
        let tz = chrono::FixedOffset::east_opt(2 * 3600).unwrap();
        let parsed = parse_timestamp("2025-03-01T10:00:00", &tz).unwrap();
        assert_eq!(parsed.to_rfc3339(), "2025-03-01T08:00:00+00:00");
    }

    #[test]
    fn garbage_timestamp_is_none() {
        assert_eq!(parse_timestamp("yesterday-ish", &Utc), None);
        assert_eq!(parse_timestamp("   ", &Utc), None);
    }
}
