//! Translator remote: HTTP gateway to the translation service and the progress channel.
mod channel;
mod error;
mod gateway;
mod persist;
mod types;

pub use channel::{
    decode_frame, progress_url, ChannelEvent, ChannelEventSink, ChannelHandle, ChannelSettings,
    ChannelSink, ProgressChannel, KEEPALIVE_PAYLOAD,
};
pub use error::{ChannelError, GatewayError, GatewayErrorKind, Operation};
pub use gateway::{Gateway, GatewaySettings, ReqwestGateway};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use types::{
    CancelResponse, EngineStatus, JobStatusResponse, Language, ProgressMessage, RemoteStatus,
    StartEngineResponse, StartJobResponse, TranslateRequest, UploadResponse,
};
