use crate::{AttemptId, FileCandidate, ResumeFailure, ResumeFile, TabId, TransferId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionMsg {
    /// User asked to connect the current tab through the relay.
    ConnectRequested { relay_url: String },
    /// User asked to disconnect, or to cancel an attempt in flight.
    DisconnectRequested,
    /// Bridge extension presence, polled or pushed by the collaborator.
    ExtensionDetected(bool),
    /// The relay accepted the session for `attempt`.
    SessionOpened { attempt: AttemptId, tab_id: TabId },
    /// The relay could not be reached or refused the handshake.
    SessionFailed { attempt: AttemptId, message: String },
    /// Closing the session reported an error.
    TeardownFailed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadMsg {
    /// View mounted; load the resume list.
    RefreshRequested,
    /// User picked files in the upload dialog.
    FilesChosen(Vec<FileCandidate>),
    /// Engine progress for `transfer`. Ignored unless it is the running one.
    TransferProgress {
        transfer: TransferId,
        sent: u64,
        total: u64,
    },
    TransferSucceeded,
    TransferFailed(ResumeFailure),
    /// Fresh copy of the remote resume list.
    ResumesLoaded(Vec<ResumeFile>),
    /// The list could not be fetched; carries the transport or status detail.
    ResumesLoadFailed(String),
    /// The completed-progress display time is over.
    SettleElapsed,
    /// User confirmed deletion of a stored resume.
    DeleteRequested { file_name: String },
    DeleteSucceeded { file_name: String },
    DeleteFailed { file_name: String, message: String },
    /// User closed the error banner.
    DismissError,
}
