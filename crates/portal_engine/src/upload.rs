use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use portal_core::{
    update_upload, ResumeFailure, TransferId, UploadEffect, UploadMsg, UploadState, UploadStatus,
};
use portal_logging::portal_warn;
use tokio::sync::watch;

use crate::{ProgressSink, ResumeApi, ResumeUpload, TransferProgress};

const DELETE_FAILED_MESSAGE: &str = "Failed to delete resume. Please try again.";

#[derive(Debug, Clone)]
pub struct UploadSettings {
    /// How long a finished upload keeps showing 100% before going idle.
    pub settle_delay: Duration,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(1),
        }
    }
}

struct Shared {
    state: Mutex<UploadState>,
    status_tx: watch::Sender<UploadStatus>,
}

impl Shared {
    fn apply(&self, msg: UploadMsg) -> Vec<UploadEffect> {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let state = std::mem::take(&mut *guard);
        let (mut state, effects) = update_upload(state, msg);
        if state.consume_dirty() {
            self.status_tx.send_replace(state.status());
        }
        *guard = state;
        effects
    }
}

/// Feeds transfer progress into the controller state.
///
/// The HTTP stack may keep the request body, and with it this sink, alive
/// after the response is in, so the sink must not keep the controller alive.
struct StateProgressSink {
    shared: Weak<Shared>,
    transfer: TransferId,
}

impl ProgressSink for StateProgressSink {
    fn emit(&self, progress: TransferProgress) {
        if let Some(shared) = self.shared.upgrade() {
            shared.apply(UploadMsg::TransferProgress {
                transfer: self.transfer,
                sent: progress.sent,
                total: progress.total,
            });
        }
    }
}

/// Owns resume submission, deletion and the resume list.
///
/// Operations always resolve to an [`UploadStatus`]; errors are carried in
/// `status.error`. After every mutation the list is reloaded in full.
pub struct UploadController {
    api: Arc<dyn ResumeApi>,
    settings: UploadSettings,
    shared: Arc<Shared>,
}

impl UploadController {
    pub fn new(api: Arc<dyn ResumeApi>, settings: UploadSettings) -> Self {
        let state = UploadState::new();
        let (status_tx, _) = watch::channel(state.status());
        Self {
            api,
            settings,
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                status_tx,
            }),
        }
    }

    pub fn status(&self) -> UploadStatus {
        self.shared.status_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UploadStatus> {
        self.shared.status_tx.subscribe()
    }

    /// Reload the resume list from the collaborator.
    pub async fn refresh(&self) -> UploadStatus {
        let effects = self.shared.apply(UploadMsg::RefreshRequested);
        self.run(effects, None).await;
        self.status()
    }

    /// Validate and upload the picked files. Only a single PDF is accepted.
    pub async fn submit(&self, files: Vec<ResumeUpload>) -> UploadStatus {
        let candidates = files.iter().map(ResumeUpload::candidate).collect();
        let effects = self.shared.apply(UploadMsg::FilesChosen(candidates));
        self.run(effects, files.first()).await;
        self.status()
    }

    /// Delete a stored resume. The caller is responsible for confirming intent.
    pub async fn remove(&self, file_name: &str) -> UploadStatus {
        let effects = self.shared.apply(UploadMsg::DeleteRequested {
            file_name: file_name.to_string(),
        });
        self.run(effects, None).await;
        self.status()
    }

    pub fn dismiss_error(&self) -> UploadStatus {
        self.shared.apply(UploadMsg::DismissError);
        self.status()
    }

    async fn run(&self, effects: Vec<UploadEffect>, upload: Option<&ResumeUpload>) {
        let mut queue: VecDeque<UploadEffect> = effects.into();
        while let Some(effect) = queue.pop_front() {
            let msg = match effect {
                UploadEffect::Transfer { transfer, file } => {
                    match upload.filter(|upload| upload.name == file.name) {
                        Some(upload) => self.transfer(upload, transfer).await,
                        None => UploadMsg::TransferFailed(ResumeFailure::Validation(format!(
                            "contents of {} are not available",
                            file.name
                        ))),
                    }
                }
                UploadEffect::RefreshResumes => match self.api.list_resumes().await {
                    Ok(resumes) => UploadMsg::ResumesLoaded(resumes),
                    Err(err) => UploadMsg::ResumesLoadFailed(err.to_string()),
                },
                UploadEffect::ScheduleSettle => {
                    tokio::time::sleep(self.settings.settle_delay).await;
                    UploadMsg::SettleElapsed
                }
                UploadEffect::DeleteResume { file_name } => {
                    match self.api.delete_resume(&file_name).await {
                        Ok(()) => UploadMsg::DeleteSucceeded { file_name },
                        Err(err) => {
                            portal_warn!("delete {} failed: {}", file_name, err);
                            UploadMsg::DeleteFailed {
                                file_name,
                                message: DELETE_FAILED_MESSAGE.to_string(),
                            }
                        }
                    }
                }
            };
            queue.extend(self.shared.apply(msg));
        }
    }

    async fn transfer(&self, upload: &ResumeUpload, transfer: TransferId) -> UploadMsg {
        let sink: Arc<dyn ProgressSink> = Arc::new(StateProgressSink {
            shared: Arc::downgrade(&self.shared),
            transfer,
        });
        match self.api.upload_resume(upload, sink).await {
            Ok(()) => UploadMsg::TransferSucceeded,
            Err(failure) => UploadMsg::TransferFailed(failure),
        }
    }
}
