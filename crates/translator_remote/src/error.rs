use std::fmt;

use thiserror::Error;

/// Which gateway call produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Configure,
    EngineStatus,
    EngineStart,
    ListModels,
    ListLanguages,
    Upload,
    StartJob,
    CancelJob,
    JobStatus,
    Download,
}

impl Operation {
    /// Message used when the service gives no `detail`.
    pub fn fallback_message(self) -> &'static str {
        match self {
            Operation::Configure => "Invalid service configuration",
            Operation::EngineStatus => "Failed to check engine status",
            Operation::EngineStart => "Failed to start Ollama",
            Operation::ListModels => "Failed to list models",
            Operation::ListLanguages => "Failed to list languages",
            Operation::Upload => "Upload failed",
            Operation::StartJob => "Failed to start translation",
            Operation::CancelJob => "Failed to cancel job",
            Operation::JobStatus => "Failed to fetch job status",
            Operation::Download => "Download failed",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Configure => "configure",
            Operation::EngineStatus => "engine status",
            Operation::EngineStart => "engine start",
            Operation::ListModels => "list models",
            Operation::ListLanguages => "list languages",
            Operation::Upload => "upload",
            Operation::StartJob => "start job",
            Operation::CancelJob => "cancel job",
            Operation::JobStatus => "job status",
            Operation::Download => "download",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayErrorKind {
    /// The service answered with a non-success status.
    Remote { status: u16 },
    Timeout,
    Network,
    /// The body could not be decoded or was too large.
    InvalidResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation}: {message}")]
pub struct GatewayError {
    pub operation: Operation,
    pub kind: GatewayErrorKind,
    pub message: String,
}

impl GatewayError {
    pub fn new(operation: Operation, kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
        }
    }

    pub fn remote(operation: Operation, status: u16, detail: Option<String>) -> Self {
        let message = detail.unwrap_or_else(|| operation.fallback_message().to_string());
        Self::new(operation, GatewayErrorKind::Remote { status }, message)
    }

    /// HTTP status of a remote rejection.
    pub fn status(&self) -> Option<u16> {
        match self.kind {
            GatewayErrorKind::Remote { status } => Some(status),
            _ => None,
        }
    }
}

/// Problems on the progress channel. None of them imply the remote job failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("invalid progress url: {0}")]
    InvalidUrl(String),
    #[error("keepalive interval must be greater than zero")]
    ZeroKeepalive,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("protocol error: {0}")]
    Protocol(String),
}
