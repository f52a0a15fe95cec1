//! Runtime around the pure job state machine.
//!
//! The controller is the only owner of the `JobState`. Every user operation and every
//! channel event becomes one `Msg`, goes through `update`, and the effects that come back
//! are executed here. All operations take `&mut self`, so a second operation cannot run
//! while one is awaiting the gateway.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use translator_core::{update, Effect, JobId, JobSnapshot, JobState, Msg, Phase, ValidationError};
use translator_logging::{client_debug, client_error, client_info, client_warn};
use translator_remote::{
    AtomicFileWriter, CancelResponse, ChannelError, ChannelEvent, ChannelEventSink, ChannelHandle,
    ChannelSink, EngineStatus, Gateway, GatewayError, Language, PersistError,
    StartEngineResponse, TranslateRequest,
};

use super::effects::{progress_update, status_update, ChannelConnector};

/// Receives the service's answer to a cancel request.
pub type CancelAck = oneshot::Receiver<Result<CancelResponse, GatewayError>>;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Remote(#[from] GatewayError),
    #[error(transparent)]
    Transport(#[from] ChannelError),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("no translated file to download while {phase}")]
    NothingToDownload { phase: Phase },
}

pub struct Controller<G, C> {
    gateway: Arc<G>,
    connector: C,
    state: JobState,
    channel: Option<ChannelHandle>,
    events_tx: mpsc::UnboundedSender<ChannelEvent>,
    events_rx: mpsc::UnboundedReceiver<ChannelEvent>,
    snapshots: watch::Sender<JobSnapshot>,
    upload_bytes: Option<Vec<u8>>,
    cancel_ack: Option<oneshot::Sender<Result<CancelResponse, GatewayError>>>,
}

impl<G, C> Controller<G, C>
where
    G: Gateway + 'static,
    C: ChannelConnector,
{
    pub fn new(gateway: Arc<G>, connector: C) -> Self {
        let state = JobState::new();
        let (snapshots, _) = watch::channel(state.view());
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            gateway,
            connector,
            state,
            channel: None,
            events_tx,
            events_rx,
            snapshots,
            upload_bytes: None,
            cancel_ack: None,
        }
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.state.view()
    }

    /// Receives a fresh snapshot after every committed change.
    pub fn subscribe(&self) -> watch::Receiver<JobSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// A progress channel task is held for the current job.
    pub fn has_channel(&self) -> bool {
        self.channel.is_some()
    }

    pub async fn upload(
        &mut self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<JobSnapshot, ControllerError> {
        self.upload_bytes = Some(bytes);
        let result = self
            .run(Msg::UploadRequested {
                file_name: file_name.to_string(),
            })
            .await;
        self.upload_bytes = None;
        result.map(|()| self.snapshot())
    }

    pub fn select_source_language(&mut self, code: &str) -> Result<(), ControllerError> {
        self.dispatch(Msg::SourceLanguageSelected(code.to_string()))
            .map(drop)
    }

    pub fn select_target_language(&mut self, code: &str) -> Result<(), ControllerError> {
        self.dispatch(Msg::TargetLanguageSelected(code.to_string()))
            .map(drop)
    }

    pub fn select_model(&mut self, model: &str) -> Result<(), ControllerError> {
        self.dispatch(Msg::ModelSelected(model.to_string())).map(drop)
    }

    /// Submits the job and opens its progress channel.
    pub async fn start(&mut self) -> Result<JobSnapshot, ControllerError> {
        self.run(Msg::StartRequested).await?;
        Ok(self.snapshot())
    }

    /// Cancels locally right away. The remote request runs in the background and its
    /// outcome is only logged.
    pub async fn cancel(&mut self) -> Result<JobSnapshot, ControllerError> {
        self.run(Msg::CancelRequested).await?;
        Ok(self.snapshot())
    }

    /// Like `cancel`, but hands back the remote answer. `None` when no remote job
    /// needed cancelling.
    pub async fn cancel_with_ack(&mut self) -> Result<Option<CancelAck>, ControllerError> {
        let (tx, rx) = oneshot::channel();
        self.cancel_ack = Some(tx);
        let result = self.run(Msg::CancelRequested).await;
        let unused = self.cancel_ack.take().is_some();
        result?;
        Ok((!unused).then_some(rx))
    }

    /// Back to the initial state. A live job is cancelled remotely and its channel closed.
    pub async fn reset(&mut self) -> Result<JobSnapshot, ControllerError> {
        self.run(Msg::ResetRequested).await?;
        let mut dropped = 0usize;
        while self.events_rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            client_debug!("Dropped {} queued channel events on reset", dropped);
        }
        Ok(self.snapshot())
    }

    /// Applies every channel event already queued, without waiting. Returns how many.
    pub async fn pump(&mut self) -> Result<usize, ControllerError> {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply_event(event).await?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Waits for the next channel event and applies it.
    pub async fn next_event(&mut self) -> Result<(), ControllerError> {
        // The controller keeps a sender alive, so `recv` only yields events.
        if let Some(event) = self.events_rx.recv().await {
            self.apply_event(event).await?;
        }
        Ok(())
    }

    /// Applies channel events until the job leaves the processing phases.
    ///
    /// Fails with `ControllerError::Transport` if the channel ends while the job is
    /// still processing; `refresh_status` can take over from there.
    pub async fn run_until_terminal(&mut self) -> Result<JobSnapshot, ControllerError> {
        loop {
            if !self.state.phase().is_active() {
                return Ok(self.snapshot());
            }
            if !self.state.is_channel_open() {
                let job_id = self.state.job_id().unwrap_or_default();
                return Err(ChannelError::Transport(format!(
                    "progress channel for job {job_id} closed before the job finished"
                ))
                .into());
            }
            self.next_event().await?;
        }
    }

    /// Asks the service for the job status and feeds it through the same path as a frame.
    ///
    /// A job the service no longer knows ends in `Failed`.
    pub async fn refresh_status(&mut self) -> Result<JobSnapshot, ControllerError> {
        let Some(job_id) = self.state.job_id().map(ToOwned::to_owned) else {
            return Ok(self.snapshot());
        };
        if !self.state.phase().is_active() {
            return Ok(self.snapshot());
        }
        match self.gateway.job_status(&job_id).await {
            Ok(status) => {
                self.run(Msg::ProgressReceived {
                    job_id,
                    update: status_update(status),
                })
                .await?;
            }
            Err(err) if err.status() == Some(404) => {
                client_error!("Job {} is unknown to the service: {}", job_id, err);
                self.run(Msg::JobLost {
                    job_id,
                    message: err.message,
                })
                .await?;
            }
            Err(err) => return Err(err.into()),
        }
        Ok(self.snapshot())
    }

    pub async fn engine_status(&self) -> Result<EngineStatus, ControllerError> {
        Ok(self.gateway.engine_status().await?)
    }

    pub async fn request_engine_start(&self) -> Result<StartEngineResponse, ControllerError> {
        Ok(self.gateway.request_engine_start().await?)
    }

    pub async fn models(&self) -> Result<Vec<String>, ControllerError> {
        Ok(self.gateway.list_models().await?)
    }

    pub async fn languages(&self) -> Result<Vec<Language>, ControllerError> {
        Ok(self.gateway.list_languages().await?)
    }

    pub fn download_url(&self, job_id: &str) -> String {
        self.gateway.download_url(job_id)
    }

    /// Downloads the artifact of the completed job into `dir/file_name`.
    pub async fn download_to(
        &self,
        dir: &Path,
        file_name: &str,
    ) -> Result<PathBuf, ControllerError> {
        let phase = self.state.phase();
        let reference = match (phase, self.state.download_url()) {
            (Phase::Completed, Some(url)) => url.to_owned(),
            _ => return Err(ControllerError::NothingToDownload { phase }),
        };
        let bytes = self.gateway.download(&reference).await?;
        let path = AtomicFileWriter::new(dir.to_path_buf()).write(file_name, &bytes)?;
        client_info!("Saved {} bytes to {:?}", bytes.len(), path);
        Ok(path)
    }

    /// Runs `update` and publishes the committed state. A rejection becomes the error.
    fn dispatch(&mut self, msg: Msg) -> Result<Vec<Effect>, ControllerError> {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        self.publish();

        let mut accepted = Vec::with_capacity(effects.len());
        for effect in effects {
            match effect {
                Effect::Rejected(err) => return Err(err.into()),
                other => accepted.push(other),
            }
        }
        Ok(accepted)
    }

    fn publish(&self) {
        let view = self.state.view();
        self.snapshots.send_if_modified(move |current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }

    async fn run(&mut self, msg: Msg) -> Result<(), ControllerError> {
        let mut queue: VecDeque<Effect> = self.dispatch(msg)?.into();
        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::UploadFile { file_name } => {
                    let bytes = self.upload_bytes.take().unwrap_or_default();
                    match self.gateway.upload_file(bytes, &file_name).await {
                        Ok(uploaded) => queue.extend(self.dispatch(Msg::UploadSucceeded {
                            file_id: uploaded.file_id,
                            file_name: uploaded.filename,
                            chapter_count: uploaded.chapter_count,
                        })?),
                        Err(err) => {
                            client_error!("Upload of {} failed: {}", file_name, err);
                            self.dispatch(Msg::UploadFailed {
                                message: err.message.clone(),
                            })?;
                            return Err(err.into());
                        }
                    }
                }
                Effect::SubmitJob {
                    file_id,
                    source_language,
                    target_language,
                    model,
                } => {
                    let request = TranslateRequest {
                        file_id,
                        source_language,
                        target_language,
                        model,
                    };
                    match self.gateway.start_job(&request).await {
                        Ok(started) => queue.extend(self.dispatch(Msg::JobStarted {
                            job_id: started.job_id,
                        })?),
                        Err(err) => {
                            client_error!("Starting a job for {} failed: {}", request.file_id, err);
                            self.dispatch(Msg::JobStartFailed {
                                message: err.message.clone(),
                            })?;
                            return Err(err.into());
                        }
                    }
                }
                Effect::OpenChannel { job_id } => self.open_channel(&job_id).await,
                Effect::CloseChannel { job_id } => self.close_channel(&job_id),
                Effect::CancelRemoteJob { job_id } => self.spawn_cancel(job_id),
                Effect::Rejected(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    async fn apply_event(&mut self, event: ChannelEvent) -> Result<(), ControllerError> {
        let msg = match event {
            ChannelEvent::Message { job_id, message } => Msg::ProgressReceived {
                job_id,
                update: progress_update(message),
            },
            ChannelEvent::Error {
                job_id,
                error: ChannelError::Protocol(message),
            } => Msg::ProtocolViolation { job_id, message },
            ChannelEvent::Error { job_id, error } => Msg::ChannelFailed {
                job_id,
                message: error.to_string(),
            },
            ChannelEvent::Closed { job_id } => {
                // The task has already ended; only the handle is left.
                if self
                    .channel
                    .as_ref()
                    .is_some_and(|handle| handle.job_id() == job_id)
                {
                    self.channel = None;
                }
                Msg::ChannelClosed { job_id }
            }
        };
        self.run(msg).await
    }

    async fn open_channel(&mut self, job_id: &str) {
        if let Some(previous) = self.channel.take() {
            client_error!(
                "Channel for job {} still open while opening job {}; closing it first",
                previous.job_id(),
                job_id
            );
            previous.close();
        }
        let sink: Arc<dyn ChannelSink> =
            Arc::new(ChannelEventSink::from_sender(self.events_tx.clone()));
        self.channel = Some(self.connector.connect(job_id, sink).await);
    }

    fn close_channel(&mut self, job_id: &str) {
        match self.channel.take() {
            Some(handle) if handle.job_id() == job_id => handle.close(),
            Some(handle) => {
                client_warn!(
                    "Close requested for job {} but the open channel belongs to {}",
                    job_id,
                    handle.job_id()
                );
                self.channel = Some(handle);
            }
            None => client_debug!("Channel for job {} already gone", job_id),
        }
    }

    fn spawn_cancel(&mut self, job_id: JobId) {
        let gateway = Arc::clone(&self.gateway);
        let ack = self.cancel_ack.take();
        tokio::spawn(async move {
            let result = gateway.cancel_job(&job_id).await;
            match ack {
                Some(ack) => {
                    let _ = ack.send(result);
                }
                None => match result {
                    Ok(reply) => client_debug!("Remote cancel of job {}: {:?}", job_id, reply),
                    Err(err) => client_warn!("Remote cancel of job {} failed: {}", job_id, err),
                },
            }
        });
    }
}
