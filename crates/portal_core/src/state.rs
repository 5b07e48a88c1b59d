use crate::view_model::{ConnectionStatus, UploadStatus};
use crate::{ResumeFailure, ResumeFile, TabId};

/// Sequence number of a connect attempt. A result carrying an older number is stale.
pub type AttemptId = u64;

/// Sequence number of an accepted upload. Progress from any other transfer is dropped.
pub type TransferId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    #[default]
    Disconnected,
    Connecting {
        attempt: AttemptId,
    },
    Connected {
        tab_id: TabId,
    },
}

/// State owned by the connection controller.
///
/// The tab id lives inside [`ConnectionPhase::Connected`], so a tab id without a
/// live connection cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionState {
    phase: ConnectionPhase,
    extension_installed: bool,
    error: Option<String>,
    last_attempt: AttemptId,
    dirty: bool,
}

impl ConnectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &ConnectionPhase {
        &self.phase
    }

    pub fn extension_installed(&self) -> bool {
        self.extension_installed
    }

    pub fn status(&self) -> ConnectionStatus {
        let (connected, connecting, connected_tab_id) = match &self.phase {
            ConnectionPhase::Disconnected => (false, false, None),
            ConnectionPhase::Connecting { .. } => (false, true, None),
            ConnectionPhase::Connected { tab_id } => (true, false, Some(tab_id.clone())),
        };
        ConnectionStatus {
            connected,
            connecting,
            extension_installed: self.extension_installed,
            connected_tab_id,
            error: self.error.clone(),
        }
    }

    /// Returns whether anything observable changed since the last call, and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn begin_attempt(&mut self) -> AttemptId {
        self.last_attempt += 1;
        self.phase = ConnectionPhase::Connecting {
            attempt: self.last_attempt,
        };
        self.error = None;
        self.dirty = true;
        self.last_attempt
    }

    pub(crate) fn is_current_attempt(&self, attempt: AttemptId) -> bool {
        self.phase == ConnectionPhase::Connecting { attempt }
    }

    pub(crate) fn mark_connected(&mut self, tab_id: TabId) {
        self.phase = ConnectionPhase::Connected { tab_id };
        self.error = None;
        self.dirty = true;
    }

    pub(crate) fn mark_disconnected(&mut self) {
        self.phase = ConnectionPhase::Disconnected;
        self.dirty = true;
    }

    pub(crate) fn set_error(&mut self, message: String) {
        self.error = Some(message);
        self.dirty = true;
    }

    pub(crate) fn set_extension_installed(&mut self, installed: bool) {
        if self.extension_installed != installed {
            self.extension_installed = installed;
            self.dirty = true;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadStage {
    #[default]
    Idle,
    /// Bytes are being sent to the collaborator.
    Transferring,
    /// The transfer succeeded; the resume list is being reloaded.
    Refreshing,
    /// Showing 100% before returning to idle.
    Settling,
}

/// State owned by the upload controller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UploadState {
    stage: UploadStage,
    progress: u8,
    resumes: Vec<ResumeFile>,
    error: Option<ResumeFailure>,
    last_transfer: TransferId,
    dirty: bool,
}

impl UploadState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> UploadStage {
        self.stage
    }

    pub fn status(&self) -> UploadStatus {
        UploadStatus {
            is_uploading: self.stage != UploadStage::Idle,
            progress: self.progress,
            resumes: self.resumes.clone(),
            error: self.error.clone(),
        }
    }

    /// Returns whether anything observable changed since the last call, and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn begin_transfer(&mut self) -> TransferId {
        self.last_transfer += 1;
        self.set_stage(UploadStage::Transferring, 0);
        self.last_transfer
    }

    pub(crate) fn is_current_transfer(&self, transfer: TransferId) -> bool {
        self.stage == UploadStage::Transferring && self.last_transfer == transfer
    }

    pub(crate) fn set_stage(&mut self, stage: UploadStage, progress: u8) {
        if self.stage != stage || self.progress != progress {
            self.stage = stage;
            self.progress = progress;
            self.dirty = true;
        }
    }

    /// Progress never moves backwards within a transfer.
    pub(crate) fn advance_progress(&mut self, progress: u8) {
        if progress > self.progress {
            self.progress = progress;
            self.dirty = true;
        }
    }

    pub(crate) fn replace_resumes(&mut self, resumes: Vec<ResumeFile>) {
        if self.resumes != resumes {
            self.resumes = resumes;
            self.dirty = true;
        }
    }

    pub(crate) fn set_error(&mut self, error: Option<ResumeFailure>) {
        if self.error != error {
            self.error = error;
            self.dirty = true;
        }
    }
}
