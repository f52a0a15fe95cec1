use std::fmt;

use crate::view_model::JobSnapshot;

/// Server-issued identifier of one translation run.
pub type JobId = String;
/// Server-issued identifier of an uploaded source document.
pub type FileId = String;

pub const DEFAULT_SOURCE_LANGUAGE: &str = "en";
pub const DEFAULT_TARGET_LANGUAGE: &str = "ko";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Uploading,
    Ready,
    Parsing,
    Translating,
    Rebuilding,
    Completed,
    Failed,
    Cancelled,
}

impl Phase {
    /// A remote job exists and is being processed.
    pub fn is_active(self) -> bool {
        matches!(self, Phase::Parsing | Phase::Translating | Phase::Rebuilding)
    }

    /// No further automatic transition happens without a reset.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed | Phase::Cancelled)
    }

    /// Job parameters (languages, model) may only change in these phases.
    pub fn accepts_parameters(self) -> bool {
        matches!(self, Phase::Idle | Phase::Ready)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Uploading => "uploading",
            Phase::Ready => "ready",
            Phase::Parsing => "parsing",
            Phase::Translating => "translating",
            Phase::Rebuilding => "rebuilding",
            Phase::Completed => "completed",
            Phase::Failed => "failed",
            Phase::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status reported by the remote service for a running job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Parsing,
    Translating,
    Rebuilding,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Phase a non-terminal status maps onto; `Pending` keeps the current phase.
    pub(crate) fn processing_phase(self) -> Option<Phase> {
        match self {
            JobStatus::Parsing => Some(Phase::Parsing),
            JobStatus::Translating => Some(Phase::Translating),
            JobStatus::Rebuilding => Some(Phase::Rebuilding),
            JobStatus::Pending
            | JobStatus::Completed
            | JobStatus::Failed
            | JobStatus::Cancelled => None,
        }
    }
}

/// Display-only progress figures. Never used to decide transitions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Progress {
    pub chapter_current: u32,
    pub chapter_total: u32,
    pub chapter_title: String,
    pub chunk_current: u32,
    pub chunk_total: u32,
    pub percentage: f64,
    pub estimated_time_remaining: f64,
    pub preview_original: String,
    pub preview_translated: String,
}

/// One decoded progress frame, as seen by the state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub status: JobStatus,
    pub chapter_current: u32,
    pub chapter_total: u32,
    pub chapter_title: String,
    pub chunk_current: u32,
    pub chunk_total: u32,
    pub percentage: f64,
    pub estimated_time_remaining: f64,
    pub preview_original: String,
    pub preview_translated: String,
    pub error_message: Option<String>,
    pub download_url: Option<String>,
}

impl ProgressUpdate {
    /// A frame carrying only a status, every figure zeroed.
    pub fn status_only(status: JobStatus) -> Self {
        Self {
            status,
            chapter_current: 0,
            chapter_total: 0,
            chapter_title: String::new(),
            chunk_current: 0,
            chunk_total: 0,
            percentage: 0.0,
            estimated_time_remaining: 0.0,
            preview_original: String::new(),
            preview_translated: String::new(),
            error_message: None,
            download_url: None,
        }
    }
}

impl Progress {
    /// Counters follow the latest frame. Empty titles and previews keep the previous
    /// text, and the percentage never moves backwards within one job.
    pub(crate) fn merge(&mut self, update: &ProgressUpdate) {
        self.chapter_current = update.chapter_current;
        self.chapter_total = update.chapter_total;
        self.chunk_current = update.chunk_current;
        self.chunk_total = update.chunk_total;
        self.estimated_time_remaining = update.estimated_time_remaining.max(0.0);
        let percentage = if update.percentage.is_finite() {
            update.percentage.clamp(0.0, 100.0)
        } else {
            0.0
        };
        self.percentage = self.percentage.max(percentage);
        if !update.chapter_title.is_empty() {
            self.chapter_title = update.chapter_title.clone();
        }
        if !update.preview_original.is_empty() {
            self.preview_original = update.preview_original.clone();
        }
        if !update.preview_translated.is_empty() {
            self.preview_translated = update.preview_translated.clone();
        }
    }
}

/// The single source of truth for one controller's job.
///
/// Only `update` mutates it; everything else reads through `view()` or the accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct JobState {
    file_id: Option<FileId>,
    file_name: Option<String>,
    chapter_count: u32,
    job_id: Option<JobId>,
    phase: Phase,
    source_language: String,
    target_language: String,
    selected_model: String,
    progress: Progress,
    error: Option<String>,
    download_url: Option<String>,
    start_pending: bool,
    channel_open: bool,
    channel_warning: Option<String>,
}

impl Default for JobState {
    fn default() -> Self {
        Self {
            file_id: None,
            file_name: None,
            chapter_count: 0,
            job_id: None,
            phase: Phase::Idle,
            source_language: DEFAULT_SOURCE_LANGUAGE.to_string(),
            target_language: DEFAULT_TARGET_LANGUAGE.to_string(),
            selected_model: String::new(),
            progress: Progress::default(),
            error: None,
            download_url: None,
            start_pending: false,
            channel_open: false,
            channel_warning: None,
        }
    }
}

impl JobState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> JobSnapshot {
        JobSnapshot {
            phase: self.phase,
            file_id: self.file_id.clone(),
            file_name: self.file_name.clone(),
            chapter_count: self.chapter_count,
            job_id: self.job_id.clone(),
            source_language: self.source_language.clone(),
            target_language: self.target_language.clone(),
            selected_model: self.selected_model.clone(),
            progress: self.progress.clone(),
            error: self.error.clone(),
            download_url: self.download_url.clone(),
            start_pending: self.start_pending,
            channel_open: self.channel_open,
            channel_warning: self.channel_warning.clone(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    pub fn file_id(&self) -> Option<&str> {
        self.file_id.as_deref()
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn download_url(&self) -> Option<&str> {
        self.download_url.as_deref()
    }

    pub fn is_start_pending(&self) -> bool {
        self.start_pending
    }

    pub fn is_channel_open(&self) -> bool {
        self.channel_open
    }

    pub(crate) fn source_language(&self) -> &str {
        &self.source_language
    }

    pub(crate) fn target_language(&self) -> &str {
        &self.target_language
    }

    pub(crate) fn selected_model(&self) -> &str {
        &self.selected_model
    }

    /// `job_id` matches the live job and the job is still being processed.
    pub(crate) fn owns_live_job(&self, job_id: &str) -> bool {
        self.phase.is_active() && self.job_id.as_deref() == Some(job_id)
    }

    pub(crate) fn begin_upload(&mut self) {
        self.phase = Phase::Uploading;
    }

    pub(crate) fn accept_file(&mut self, file_id: FileId, file_name: String, chapter_count: u32) {
        self.file_id = Some(file_id);
        self.file_name = Some(file_name);
        self.chapter_count = chapter_count;
        self.phase = Phase::Ready;
    }

    pub(crate) fn abandon_upload(&mut self) {
        self.phase = if self.file_id.is_some() {
            Phase::Ready
        } else {
            Phase::Idle
        };
    }

    pub(crate) fn set_source_language(&mut self, code: String) {
        self.source_language = code;
    }

    pub(crate) fn set_target_language(&mut self, code: String) {
        self.target_language = code;
    }

    pub(crate) fn set_model(&mut self, model: String) {
        self.selected_model = model;
    }

    pub(crate) fn mark_start_pending(&mut self) {
        self.start_pending = true;
    }

    pub(crate) fn clear_start_pending(&mut self) {
        self.start_pending = false;
    }

    pub(crate) fn start_job(&mut self, job_id: JobId) {
        self.start_pending = false;
        self.job_id = Some(job_id);
        self.phase = Phase::Translating;
        self.progress = Progress::default();
        self.error = None;
        self.download_url = None;
        self.channel_warning = None;
        self.channel_open = true;
    }

    pub(crate) fn apply_progress(&mut self, update: &ProgressUpdate) {
        self.channel_warning = None;
        self.progress.merge(update);
        if let Some(phase) = update.status.processing_phase() {
            self.phase = phase;
        }
    }

    /// Moves to a terminal phase. Returns the finished job id if its channel still
    /// needs closing.
    pub(crate) fn finish(&mut self, phase: Phase) -> Option<JobId> {
        debug_assert!(phase.is_terminal());
        self.phase = phase;
        self.start_pending = false;
        self.channel_warning = None;
        let job_id = self.job_id.take();
        if std::mem::replace(&mut self.channel_open, false) {
            job_id
        } else {
            None
        }
    }

    pub(crate) fn complete(&mut self, download_url: String) -> Option<JobId> {
        self.download_url = Some(download_url);
        self.finish(Phase::Completed)
    }

    pub(crate) fn fail(&mut self, error: String) -> Option<JobId> {
        self.error = Some(error);
        self.finish(Phase::Failed)
    }

    pub(crate) fn warn_channel(&mut self, message: String) {
        self.channel_warning = Some(message);
    }

    pub(crate) fn mark_channel_closed(&mut self) -> bool {
        std::mem::replace(&mut self.channel_open, false)
    }
}
