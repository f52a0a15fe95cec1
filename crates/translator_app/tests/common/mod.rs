#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::SinkExt;
use tokio::io::DuplexStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use translator_app::{ChannelConnector, Controller};
use translator_remote::{
    CancelResponse, ChannelHandle, ChannelSink, EngineStatus, Gateway, GatewayError,
    GatewayErrorKind, JobStatusResponse, Language, Operation, ProgressChannel, ProgressMessage,
    RemoteStatus, StartEngineResponse, StartJobResponse, TranslateRequest, UploadResponse,
};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(translator_logging::initialize_for_tests);
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Upload { file_name: String, size: usize },
    Start(TranslateRequest),
    Cancel(String),
    Status(String),
    Download(String),
}

/// In-memory service. Job ids are `job-1`, `job-2`, ...
#[derive(Default)]
pub struct FakeGateway {
    pub calls: Mutex<Vec<Call>>,
    pub jobs: AtomicUsize,
    pub upload_error: Mutex<Option<GatewayError>>,
    pub start_errors: Mutex<VecDeque<GatewayError>>,
    pub status_replies: Mutex<VecDeque<Result<JobStatusResponse, GatewayError>>>,
    pub cancel_never_answers: bool,
    pub artifact: Vec<u8>,
}

impl FakeGateway {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

pub fn remote_error(operation: Operation, status: u16, message: &str) -> GatewayError {
    GatewayError::new(
        operation,
        GatewayErrorKind::Remote { status },
        message.to_string(),
    )
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn engine_status(&self) -> Result<EngineStatus, GatewayError> {
        Ok(EngineStatus {
            installed: true,
            running: true,
        })
    }

    async fn request_engine_start(&self) -> Result<StartEngineResponse, GatewayError> {
        Ok(StartEngineResponse { success: true })
    }

    async fn list_models(&self) -> Result<Vec<String>, GatewayError> {
        Ok(vec!["m1".to_string()])
    }

    async fn list_languages(&self) -> Result<Vec<Language>, GatewayError> {
        Ok(vec![Language {
            code: "en".to_string(),
            name: "English".to_string(),
        }])
    }

    async fn upload_file(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
    ) -> Result<UploadResponse, GatewayError> {
        self.record(Call::Upload {
            file_name: file_name.to_string(),
            size: bytes.len(),
        });
        if let Some(err) = self.upload_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(UploadResponse {
            file_id: "f1".to_string(),
            filename: file_name.to_string(),
            file_size: bytes.len() as u64,
            chapter_count: 12,
        })
    }

    async fn start_job(
        &self,
        request: &TranslateRequest,
    ) -> Result<StartJobResponse, GatewayError> {
        self.record(Call::Start(request.clone()));
        if let Some(err) = self.start_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        let n = self.jobs.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(StartJobResponse {
            job_id: format!("job-{n}"),
        })
    }

    async fn cancel_job(&self, job_id: &str) -> Result<CancelResponse, GatewayError> {
        self.record(Call::Cancel(job_id.to_string()));
        if self.cancel_never_answers {
            std::future::pending::<()>().await;
        }
        Ok(CancelResponse {
            success: true,
            message: Some("Job cancelled".to_string()),
        })
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatusResponse, GatewayError> {
        self.record(Call::Status(job_id.to_string()));
        self.status_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(remote_error(Operation::JobStatus, 404, "Job not found")))
    }

    async fn download(&self, reference: &str) -> Result<Vec<u8>, GatewayError> {
        self.record(Call::Download(reference.to_string()));
        Ok(self.artifact.clone())
    }

    fn download_url(&self, job_id: &str) -> String {
        format!("http://fake/api/download/{job_id}")
    }
}

/// Server end of a channel the controller opened.
pub struct RemoteEnd {
    pub job_id: String,
    pub socket: WebSocketStream<DuplexStream>,
}

impl RemoteEnd {
    pub async fn send(&mut self, message: &ProgressMessage) {
        let text = serde_json::to_string(message).unwrap();
        self.socket.send(Message::Text(text.into())).await.unwrap();
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.socket
            .send(Message::Text(text.to_string().into()))
            .await
            .unwrap();
    }
}

/// Hands every opened channel's server end to the test.
pub struct DuplexConnector {
    remotes: mpsc::UnboundedSender<RemoteEnd>,
}

impl DuplexConnector {
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<RemoteEnd>) {
        let (remotes, rx) = mpsc::unbounded_channel();
        (Self { remotes }, rx)
    }
}

#[async_trait]
impl ChannelConnector for DuplexConnector {
    async fn connect(&self, job_id: &str, sink: Arc<dyn ChannelSink>) -> ChannelHandle {
        let (client_io, server_io) = tokio::io::duplex(64 * 1024);
        let client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;
        let server = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;
        let _ = self.remotes.send(RemoteEnd {
            job_id: job_id.to_string(),
            socket: server,
        });
        ProgressChannel::attach(client, job_id, Duration::from_secs(30), sink)
    }
}

pub type TestController = Controller<FakeGateway, DuplexConnector>;

pub fn controller(
    gateway: FakeGateway,
) -> (
    TestController,
    Arc<FakeGateway>,
    mpsc::UnboundedReceiver<RemoteEnd>,
) {
    init_logging();
    let gateway = Arc::new(gateway);
    let (connector, remotes) = DuplexConnector::pair();
    (
        Controller::new(Arc::clone(&gateway), connector),
        gateway,
        remotes,
    )
}

/// Uploads, picks model `m1` and starts. Returns the server end of the job's channel.
pub async fn running(
    controller: &mut TestController,
    remotes: &mut mpsc::UnboundedReceiver<RemoteEnd>,
) -> RemoteEnd {
    controller
        .upload("book.epub", b"EPUB".to_vec())
        .await
        .unwrap();
    controller.select_model("m1").unwrap();
    controller.start().await.unwrap();
    remotes.recv().await.unwrap()
}

pub fn frame(job_id: &str, status: RemoteStatus) -> ProgressMessage {
    ProgressMessage::new(job_id, status)
}

/// Lets spawned tasks (the background cancel) run until `gateway` has seen `count` calls.
pub async fn wait_for_calls(gateway: &FakeGateway, count: usize) {
    for _ in 0..100 {
        if gateway.calls().len() >= count {
            return;
        }
        tokio::task::yield_now().await;
    }
}
