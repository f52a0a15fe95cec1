use translator_logging::{client_debug, client_warn};

use crate::{Effect, JobState, JobStatus, Msg, Phase, ValidationError};

const GENERIC_FAILURE: &str = "Translation failed";

/// Pure update function: applies a message to state and returns any effects.
///
/// Rejected messages leave the state untouched and yield a single `Effect::Rejected`.
pub fn update(mut state: JobState, msg: Msg) -> (JobState, Vec<Effect>) {
    let before = state.phase();
    let effects = match msg {
        Msg::UploadRequested { file_name } => {
            if state.is_start_pending() {
                return reject(state, ValidationError::StartAlreadyPending);
            }
            if !before.accepts_parameters() {
                return reject(state, ValidationError::UploadNotAllowed { phase: before });
            }
            state.begin_upload();
            vec![Effect::UploadFile { file_name }]
        }
        Msg::UploadSucceeded {
            file_id,
            file_name,
            chapter_count,
        } => {
            if before == Phase::Uploading {
                state.accept_file(file_id, file_name, chapter_count);
            } else {
                client_debug!("Ignoring upload result for {} while {}", file_id, before);
            }
            Vec::new()
        }
        Msg::UploadFailed { message } => {
            if before == Phase::Uploading {
                client_debug!("Upload failed: {}", message);
                state.abandon_upload();
            }
            Vec::new()
        }
        Msg::SourceLanguageSelected(code) => {
            if let Err(err) = check_parameter(&state, "source language", &code) {
                return reject(state, err);
            }
            state.set_source_language(code);
            Vec::new()
        }
        Msg::TargetLanguageSelected(code) => {
            if let Err(err) = check_parameter(&state, "target language", &code) {
                return reject(state, err);
            }
            state.set_target_language(code);
            Vec::new()
        }
        Msg::ModelSelected(model) => {
            if state.is_start_pending() {
                return reject(state, ValidationError::StartAlreadyPending);
            }
            if !before.accepts_parameters() {
                return reject(state, ValidationError::ParametersLocked { phase: before });
            }
            state.set_model(model);
            Vec::new()
        }
        Msg::StartRequested => {
            if let Err(err) = check_startable(&state) {
                return reject(state, err);
            }
            let Some(file_id) = state.file_id().map(ToOwned::to_owned) else {
                return reject(state, ValidationError::NotReady { phase: before });
            };
            state.mark_start_pending();
            vec![Effect::SubmitJob {
                file_id,
                source_language: state.source_language().to_owned(),
                target_language: state.target_language().to_owned(),
                model: state.selected_model().to_owned(),
            }]
        }
        Msg::JobStarted { job_id } => {
            if state.is_start_pending() && before == Phase::Ready {
                state.start_job(job_id.clone());
                vec![Effect::OpenChannel { job_id }]
            } else {
                // Nobody is waiting for this job any more (cancelled or reset mid-request).
                client_warn!("Job {} started after its request was abandoned", job_id);
                state.clear_start_pending();
                vec![Effect::CancelRemoteJob { job_id }]
            }
        }
        Msg::JobStartFailed { message } => {
            if state.is_start_pending() {
                client_debug!("Start request failed: {}", message);
                state.clear_start_pending();
            }
            Vec::new()
        }
        Msg::ProgressReceived { job_id, update } => {
            if !state.owns_live_job(&job_id) {
                client_debug!("Dropping stale frame for job {} while {}", job_id, before);
                return (state, Vec::new());
            }
            state.apply_progress(&update);
            let closing = match update.status {
                JobStatus::Pending
                | JobStatus::Parsing
                | JobStatus::Translating
                | JobStatus::Rebuilding => None,
                JobStatus::Completed => {
                    let url = update
                        .download_url
                        .clone()
                        .unwrap_or_else(|| format!("/api/download/{job_id}"));
                    state.complete(url)
                }
                JobStatus::Failed => {
                    let error = update
                        .error_message
                        .clone()
                        .filter(|message| !message.is_empty())
                        .unwrap_or_else(|| GENERIC_FAILURE.to_string());
                    state.fail(error)
                }
                JobStatus::Cancelled => state.finish(Phase::Cancelled),
            };
            closing
                .map(|job_id| vec![Effect::CloseChannel { job_id }])
                .unwrap_or_default()
        }
        Msg::ChannelFailed { job_id, message } | Msg::ProtocolViolation { job_id, message } => {
            if state.owns_live_job(&job_id) {
                client_warn!("Progress channel for job {}: {}", job_id, message);
                state.warn_channel(message);
            }
            Vec::new()
        }
        Msg::JobLost { job_id, message } => {
            if !state.owns_live_job(&job_id) {
                return (state, Vec::new());
            }
            state
                .fail(message)
                .map(|job_id| vec![Effect::CloseChannel { job_id }])
                .unwrap_or_default()
        }
        Msg::ChannelClosed { job_id } => {
            if state.job_id() == Some(job_id.as_str()) && state.mark_channel_closed() {
                client_warn!("Progress channel for job {} closed while {}", job_id, before);
                state.warn_channel("progress stream closed".to_string());
            }
            Vec::new()
        }
        Msg::CancelRequested => cancel(&mut state),
        Msg::ResetRequested => {
            let mut effects = Vec::new();
            if let Some(job_id) = state.job_id().map(ToOwned::to_owned) {
                if state.is_channel_open() {
                    effects.push(Effect::CloseChannel {
                        job_id: job_id.clone(),
                    });
                }
                if before.is_active() {
                    effects.push(Effect::CancelRemoteJob { job_id });
                }
            }
            state = JobState::new();
            effects
        }
    };

    if state.phase() != before {
        client_debug!("Job phase {} -> {}", before, state.phase());
    }
    (state, effects)
}

fn cancel(state: &mut JobState) -> Vec<Effect> {
    let phase = state.phase();
    if phase.is_active() {
        let Some(job_id) = state.job_id().map(ToOwned::to_owned) else {
            return Vec::new();
        };
        let mut effects = vec![Effect::CancelRemoteJob {
            job_id: job_id.clone(),
        }];
        if let Some(open) = state.finish(Phase::Cancelled) {
            effects.push(Effect::CloseChannel { job_id: open });
        }
        effects
    } else if phase == Phase::Ready && state.is_start_pending() {
        // The job id is not known yet; `JobStarted` will cancel it remotely.
        state.finish(Phase::Cancelled);
        Vec::new()
    } else {
        client_debug!("Cancel ignored while {}", phase);
        Vec::new()
    }
}

fn check_parameter(
    state: &JobState,
    field: &'static str,
    value: &str,
) -> Result<(), ValidationError> {
    let phase = state.phase();
    if state.is_start_pending() {
        return Err(ValidationError::StartAlreadyPending);
    }
    if !phase.accepts_parameters() {
        return Err(ValidationError::ParametersLocked { phase });
    }
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyParameter { field });
    }
    Ok(())
}

fn check_startable(state: &JobState) -> Result<(), ValidationError> {
    let phase = state.phase();
    if state.is_start_pending() {
        return Err(ValidationError::StartAlreadyPending);
    }
    if phase.is_active() {
        return Err(ValidationError::JobAlreadyActive { phase });
    }
    if phase != Phase::Ready {
        return Err(ValidationError::NotReady { phase });
    }
    if state.selected_model().trim().is_empty() {
        return Err(ValidationError::ModelNotSelected);
    }
    Ok(())
}

fn reject(state: JobState, err: ValidationError) -> (JobState, Vec<Effect>) {
    client_warn!("Rejected: {}", err);
    (state, vec![Effect::Rejected(err)])
}
