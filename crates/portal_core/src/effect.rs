use crate::{AttemptId, FileCandidate, TransferId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEffect {
    OpenSession { attempt: AttemptId, relay_url: String },
    CloseSession,
    /// A session opened for a cancelled attempt must be closed without being kept.
    DiscardSession { attempt: AttemptId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEffect {
    Transfer { transfer: TransferId, file: FileCandidate },
    RefreshResumes,
    ScheduleSettle,
    DeleteResume { file_name: String },
}
