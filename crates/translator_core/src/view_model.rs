use crate::{JobId, Phase, Progress};

/// Plain-data snapshot of the job state handed to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSnapshot {
    pub phase: Phase,
    pub file_id: Option<String>,
    pub file_name: Option<String>,
    pub chapter_count: u32,
    pub job_id: Option<JobId>,
    pub source_language: String,
    pub target_language: String,
    pub selected_model: String,
    pub progress: Progress,
    pub error: Option<String>,
    pub download_url: Option<String>,
    pub start_pending: bool,
    pub channel_open: bool,
    /// Last transport or protocol problem seen on the progress channel.
    pub channel_warning: Option<String>,
}

impl JobSnapshot {
    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }
}
