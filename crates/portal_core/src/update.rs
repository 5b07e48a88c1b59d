use portal_logging::{portal_debug, portal_info, portal_warn};

use crate::{
    ConnectionEffect, ConnectionMsg, ConnectionPhase, ConnectionState, FileCandidate,
    ResumeFailure, UploadEffect, UploadMsg, UploadStage, UploadState,
};

/// Highest progress shown while the upload is still in flight.
const IN_FLIGHT_PROGRESS_CAP: u8 = 99;

const LOAD_FAILED_MESSAGE: &str = "Failed to load resumes";

/// Pure update function for the relay connection: applies a message and returns any effects.
pub fn update_connection(
    mut state: ConnectionState,
    msg: ConnectionMsg,
) -> (ConnectionState, Vec<ConnectionEffect>) {
    let effects = match msg {
        ConnectionMsg::ConnectRequested { relay_url } => {
            if state.phase() != &ConnectionPhase::Disconnected {
                portal_debug!("connect ignored: attempt already active");
                return (state, Vec::new());
            }
            if !state.extension_installed() {
                portal_debug!("connect ignored: bridge extension not detected");
                return (state, Vec::new());
            }
            let attempt = state.begin_attempt();
            portal_info!("connect attempt={} relay_url={}", attempt, relay_url);
            vec![ConnectionEffect::OpenSession { attempt, relay_url }]
        }
        ConnectionMsg::SessionOpened { attempt, tab_id } => {
            if state.is_current_attempt(attempt) {
                portal_info!("connected attempt={} tab_id={}", attempt, tab_id);
                state.mark_connected(tab_id);
                Vec::new()
            } else {
                portal_debug!("discarding session from stale attempt={}", attempt);
                vec![ConnectionEffect::DiscardSession { attempt }]
            }
        }
        ConnectionMsg::SessionFailed { attempt, message } => {
            if state.is_current_attempt(attempt) {
                portal_warn!("connect attempt={} failed: {}", attempt, message);
                state.mark_disconnected();
                state.set_error(message);
            }
            Vec::new()
        }
        ConnectionMsg::DisconnectRequested => match state.phase() {
            ConnectionPhase::Connected { .. } => {
                state.mark_disconnected();
                vec![ConnectionEffect::CloseSession]
            }
            ConnectionPhase::Connecting { attempt } => {
                portal_info!("cancelling connect attempt={}", attempt);
                state.mark_disconnected();
                Vec::new()
            }
            ConnectionPhase::Disconnected => Vec::new(),
        },
        ConnectionMsg::TeardownFailed { message } => {
            portal_warn!("relay teardown failed: {}", message);
            state.set_error(message);
            Vec::new()
        }
        ConnectionMsg::ExtensionDetected(installed) => {
            // A missing extension only gates new attempts; a live session is left alone.
            state.set_extension_installed(installed);
            Vec::new()
        }
    };

    (state, effects)
}

/// Pure update function for resume uploads: applies a message and returns any effects.
pub fn update_upload(mut state: UploadState, msg: UploadMsg) -> (UploadState, Vec<UploadEffect>) {
    let effects = match msg {
        UploadMsg::RefreshRequested => vec![UploadEffect::RefreshResumes],
        UploadMsg::FilesChosen(files) => {
            if state.stage() != UploadStage::Idle {
                portal_debug!("upload ignored: another upload is in progress");
                return (state, Vec::new());
            }
            match validate_selection(files) {
                Ok(file) => {
                    portal_info!("uploading name={} size={}", file.name, file.size);
                    state.set_error(None);
                    let transfer = state.begin_transfer();
                    vec![UploadEffect::Transfer { transfer, file }]
                }
                Err(failure) => {
                    portal_warn!("upload rejected: {}", failure);
                    state.set_error(Some(failure));
                    Vec::new()
                }
            }
        }
        UploadMsg::TransferProgress {
            transfer,
            sent,
            total,
        } => {
            if state.is_current_transfer(transfer) {
                state.advance_progress(in_flight_percent(sent, total));
            } else {
                portal_debug!("dropping progress from stale transfer={}", transfer);
            }
            Vec::new()
        }
        UploadMsg::TransferSucceeded => {
            if state.stage() == UploadStage::Transferring {
                state.set_stage(UploadStage::Refreshing, IN_FLIGHT_PROGRESS_CAP);
                vec![UploadEffect::RefreshResumes]
            } else {
                Vec::new()
            }
        }
        UploadMsg::TransferFailed(failure) => {
            portal_warn!("upload failed: {}", failure);
            state.set_stage(UploadStage::Idle, 0);
            state.set_error(Some(failure));
            Vec::new()
        }
        UploadMsg::ResumesLoaded(resumes) => {
            state.replace_resumes(resumes);
            finish_refresh(&mut state)
        }
        UploadMsg::ResumesLoadFailed(message) => {
            portal_warn!("failed to load resumes: {}", message);
            state.replace_resumes(Vec::new());
            // A reload after a successful upload keeps the upload's clean result.
            if state.stage() == UploadStage::Idle {
                state.set_error(Some(ResumeFailure::Transport(format!(
                    "{LOAD_FAILED_MESSAGE} ({message})"
                ))));
            }
            finish_refresh(&mut state)
        }
        UploadMsg::SettleElapsed => {
            if state.stage() == UploadStage::Settling {
                state.set_stage(UploadStage::Idle, 0);
            }
            Vec::new()
        }
        UploadMsg::DeleteRequested { file_name } => {
            state.set_error(None);
            vec![UploadEffect::DeleteResume { file_name }]
        }
        UploadMsg::DeleteSucceeded { file_name } => {
            portal_info!("deleted resume {}", file_name);
            vec![UploadEffect::RefreshResumes]
        }
        UploadMsg::DeleteFailed { file_name, message } => {
            portal_warn!("failed to delete {}: {}", file_name, message);
            state.set_error(Some(ResumeFailure::Delete { file_name, message }));
            Vec::new()
        }
        UploadMsg::DismissError => {
            state.set_error(None);
            Vec::new()
        }
    };

    (state, effects)
}

fn finish_refresh(state: &mut UploadState) -> Vec<UploadEffect> {
    if state.stage() == UploadStage::Refreshing {
        state.set_stage(UploadStage::Settling, 100);
        vec![UploadEffect::ScheduleSettle]
    } else {
        Vec::new()
    }
}

fn validate_selection(mut files: Vec<FileCandidate>) -> Result<FileCandidate, ResumeFailure> {
    if files.len() != 1 {
        let message = if files.is_empty() {
            "No file selected"
        } else {
            "Please upload a single PDF file"
        };
        return Err(ResumeFailure::Validation(message.to_string()));
    }
    let file = files.remove(0);
    if !file.is_pdf() {
        return Err(ResumeFailure::Validation(
            "Please upload a PDF file".to_string(),
        ));
    }
    Ok(file)
}

fn in_flight_percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = sent.min(total).saturating_mul(100) / total;
    u8::try_from(percent)
        .unwrap_or(IN_FLIGHT_PROGRESS_CAP)
        .min(IN_FLIGHT_PROGRESS_CAP)
}
