use std::sync::Arc;

use async_trait::async_trait;
use translator_core::{JobStatus, ProgressUpdate};
use translator_remote::{
    ChannelHandle, ChannelSettings, ChannelSink, JobStatusResponse, ProgressChannel,
    ProgressMessage, RemoteStatus,
};

/// Opens the progress channel of a job. The controller owns the returned handle.
#[async_trait]
pub trait ChannelConnector: Send + Sync {
    async fn connect(&self, job_id: &str, sink: Arc<dyn ChannelSink>) -> ChannelHandle;
}

/// Connects to `{ws_base}/ws/progress/{job_id}` over a real WebSocket.
#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector {
    settings: ChannelSettings,
}

impl WebSocketConnector {
    pub fn new(settings: ChannelSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ChannelSettings {
        &self.settings
    }
}

#[async_trait]
impl ChannelConnector for WebSocketConnector {
    async fn connect(&self, job_id: &str, sink: Arc<dyn ChannelSink>) -> ChannelHandle {
        ProgressChannel::open(&self.settings, job_id, sink)
    }
}

pub(crate) fn progress_update(message: ProgressMessage) -> ProgressUpdate {
    ProgressUpdate {
        status: map_status(message.status),
        chapter_current: message.chapter_current,
        chapter_total: message.chapter_total,
        chapter_title: message.chapter_title,
        chunk_current: message.chunk_current,
        chunk_total: message.chunk_total,
        percentage: message.percentage,
        estimated_time_remaining: message.estimated_time_remaining,
        preview_original: message.preview_original,
        preview_translated: message.preview_translated,
        error_message: message.error_message,
        download_url: message.download_url,
    }
}

/// A polled status carries no title, estimate or preview; those keep their last value.
pub(crate) fn status_update(status: JobStatusResponse) -> ProgressUpdate {
    ProgressUpdate {
        chapter_current: status.current_chapter,
        chapter_total: status.total_chapters,
        chunk_current: status.current_chunk,
        chunk_total: status.total_chunks,
        percentage: status.percentage,
        error_message: status.error_message,
        download_url: status.download_url,
        ..ProgressUpdate::status_only(map_status(status.status))
    }
}

fn map_status(status: RemoteStatus) -> JobStatus {
    match status {
        RemoteStatus::Pending => JobStatus::Pending,
        RemoteStatus::Parsing => JobStatus::Parsing,
        RemoteStatus::Translating => JobStatus::Translating,
        RemoteStatus::Rebuilding => JobStatus::Rebuilding,
        RemoteStatus::Completed => JobStatus::Completed,
        RemoteStatus::Failed => JobStatus::Failed,
        RemoteStatus::Cancelled => JobStatus::Cancelled,
    }
}
