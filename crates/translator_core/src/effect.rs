use crate::{FileId, JobId, ValidationError};

/// Work the runtime must perform after a transition has been committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    UploadFile { file_name: String },
    SubmitJob {
        file_id: FileId,
        source_language: String,
        target_language: String,
        model: String,
    },
    OpenChannel { job_id: JobId },
    CloseChannel { job_id: JobId },
    /// Best effort; the local state has already moved on.
    CancelRemoteJob { job_id: JobId },
    /// The message was refused and the state is unchanged.
    Rejected(ValidationError),
}
