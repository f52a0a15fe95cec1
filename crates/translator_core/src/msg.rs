use crate::{FileId, JobId, ProgressUpdate};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User picked a file; the upload is about to be sent.
    UploadRequested { file_name: String },
    /// Gateway accepted the upload.
    UploadSucceeded {
        file_id: FileId,
        file_name: String,
        chapter_count: u32,
    },
    /// Gateway rejected the upload or the request failed.
    UploadFailed { message: String },
    SourceLanguageSelected(String),
    TargetLanguageSelected(String),
    ModelSelected(String),
    /// User asked to start translating the accepted file.
    StartRequested,
    /// Gateway returned a job id for the pending start request.
    JobStarted { job_id: JobId },
    /// Gateway refused the pending start request.
    JobStartFailed { message: String },
    /// A decoded frame arrived on the progress channel of `job_id`.
    ProgressReceived {
        job_id: JobId,
        update: ProgressUpdate,
    },
    /// Transport-level failure on the progress channel of `job_id`.
    ChannelFailed { job_id: JobId, message: String },
    /// A frame on the progress channel of `job_id` did not match the protocol.
    ProtocolViolation { job_id: JobId, message: String },
    /// The service no longer knows `job_id` (status poll answered "not found").
    JobLost { job_id: JobId, message: String },
    /// The progress channel of `job_id` has shut down.
    ChannelClosed { job_id: JobId },
    /// User cancelled.
    CancelRequested,
    /// User asked to start over.
    ResetRequested,
}
