//! Portal core: pure connection/upload state machines, records and view-model helpers.
mod aggregate;
mod effect;
mod format;
mod msg;
mod records;
mod state;
mod update;
mod view_model;

pub use aggregate::{daily_applications, DailyPoint, DAILY_WINDOW_DAYS};
pub use effect::{ConnectionEffect, UploadEffect};
pub use format::{format_file_size, format_timestamp};
pub use msg::{ConnectionMsg, UploadMsg};
pub use records::{
    parse_timestamp, sort_recent_first, Application, FileCandidate, ResumeFailure, ResumeFile,
    TabId, PDF_MIME_TYPE,
};
pub use state::{
    AttemptId, ConnectionPhase, ConnectionState, TransferId, UploadStage, UploadState,
};
pub use update::{update_connection, update_upload};
pub use view_model::{ConnectionStatus, DashboardView, UploadStatus, RECENT_APPLICATIONS};
