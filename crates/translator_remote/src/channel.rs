//! Progress channel: one WebSocket per job carrying `progress` frames from the service.
//!
//! The channel owns its keepalive timer. Both live in a single task, so cancelling the
//! task is the only way the timer stops and no timer can outlive the connection.
//! The channel never reconnects; what to do after an error is the caller's decision.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, WebSocketStream};
use tokio_util::sync::CancellationToken;
use translator_logging::{client_debug, client_info, client_trace, client_warn};
use url::Url;

use crate::{ChannelError, ProgressMessage};

/// Literal text frame sent to keep intermediaries from dropping an idle socket.
pub const KEEPALIVE_PAYLOAD: &str = "ping";

const CLOSE_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ChannelSettings {
    pub ws_base: String,
    pub keepalive_interval: Duration,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            ws_base: "ws://localhost:8000".to_string(),
            keepalive_interval: Duration::from_secs(30),
        }
    }
}

/// Everything a channel reports to its owner. Each event names the job it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Message {
        job_id: String,
        message: ProgressMessage,
    },
    Error {
        job_id: String,
        error: ChannelError,
    },
    /// The remote side or the transport ended the connection. Not sent after `close`.
    Closed { job_id: String },
}

impl ChannelEvent {
    pub fn job_id(&self) -> &str {
        match self {
            ChannelEvent::Message { job_id, .. }
            | ChannelEvent::Error { job_id, .. }
            | ChannelEvent::Closed { job_id } => job_id,
        }
    }
}

pub trait ChannelSink: Send + Sync {
    fn emit(&self, event: ChannelEvent);
}

impl<F> ChannelSink for F
where
    F: Fn(ChannelEvent) + Send + Sync,
{
    fn emit(&self, event: ChannelEvent) {
        self(event)
    }
}

/// Forwards channel events into an unbounded tokio queue, preserving arrival order.
pub struct ChannelEventSink {
    tx: mpsc::UnboundedSender<ChannelEvent>,
}

impl ChannelEventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ChannelEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn from_sender(tx: mpsc::UnboundedSender<ChannelEvent>) -> Self {
        Self { tx }
    }
}

impl ChannelSink for ChannelEventSink {
    fn emit(&self, event: ChannelEvent) {
        let _ = self.tx.send(event);
    }
}

/// `{ws_base}/ws/progress/{job_id}`.
pub fn progress_url(ws_base: &str, job_id: &str) -> Result<Url, ChannelError> {
    let mut url = Url::parse(ws_base).map_err(|err| ChannelError::InvalidUrl(err.to_string()))?;
    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(ChannelError::InvalidUrl(format!(
            "expected ws:// or wss://, got {ws_base}"
        )));
    }
    url.path_segments_mut()
        .map_err(|_| ChannelError::InvalidUrl(format!("{ws_base} cannot carry a path")))?
        .pop_if_empty()
        .extend(["ws", "progress", job_id]);
    Ok(url)
}

/// Decodes one inbound text frame.
///
/// Returns `Ok(None)` for the service's `pong` reply to a keepalive.
pub fn decode_frame(text: &str) -> Result<Option<ProgressMessage>, ChannelError> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|err| ChannelError::Protocol(format!("frame is not JSON: {err}")))?;
    match value.get("type").and_then(serde_json::Value::as_str) {
        Some("pong") => Ok(None),
        Some("progress") => serde_json::from_value(value)
            .map(Some)
            .map_err(|err| ChannelError::Protocol(format!("malformed progress frame: {err}"))),
        Some(other) => Err(ChannelError::Protocol(format!(
            "unexpected frame type {other:?}"
        ))),
        None => Err(ChannelError::Protocol("frame has no type".to_string())),
    }
}

pub struct ProgressChannel;

impl ProgressChannel {
    /// Starts connecting right away. Failures arrive through `sink` as an error then `Closed`.
    pub fn open(settings: &ChannelSettings, job_id: &str, sink: Arc<dyn ChannelSink>) -> ChannelHandle {
        let cancel = CancellationToken::new();
        let job = job_id.to_string();
        let keepalive = settings.keepalive_interval;
        let url = check_keepalive(keepalive)
            .and_then(|()| progress_url(&settings.ws_base, job_id));
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let url = match url {
                Ok(url) => url,
                Err(err) => {
                    fail(sink.as_ref(), &job, err);
                    return;
                }
            };
            client_info!("Opening progress channel {}", url);
            let connected = tokio::select! {
                biased;
                _ = token.cancelled() => return,
                result = connect_async(url.as_str()) => result,
            };
            match connected {
                Ok((socket, _response)) => drive(socket, job, keepalive, sink, token).await,
                Err(err) => fail(
                    sink.as_ref(),
                    &job,
                    ChannelError::Transport(format!("connect failed: {err}")),
                ),
            }
        });

        ChannelHandle::new(job_id.to_string(), cancel, task)
    }

    /// Drives an already established socket, over any transport.
    pub fn attach<S>(
        socket: WebSocketStream<S>,
        job_id: &str,
        keepalive: Duration,
        sink: Arc<dyn ChannelSink>,
    ) -> ChannelHandle
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let job = job_id.to_string();
        let task = tokio::spawn(async move {
            match check_keepalive(keepalive) {
                Ok(()) => drive(socket, job, keepalive, sink, token).await,
                Err(err) => fail(sink.as_ref(), &job, err),
            }
        });
        ChannelHandle::new(job_id.to_string(), cancel, task)
    }
}

/// Owner's grip on a running channel. Dropping it closes the channel too.
pub struct ChannelHandle {
    job_id: String,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ChannelHandle {
    fn new(job_id: String, cancel: CancellationToken, task: JoinHandle<()>) -> Self {
        Self {
            job_id,
            cancel,
            task: Some(task),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// The connection task has ended, for whatever reason.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stops the keepalive and the connection. Returns without waiting for the task.
    pub fn close(self) {
        client_debug!("Closing progress channel for job {}", self.job_id);
        self.cancel.cancel();
    }

    /// Like `close`, then waits until the task has released the socket.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn check_keepalive(keepalive: Duration) -> Result<(), ChannelError> {
    if keepalive.is_zero() {
        return Err(ChannelError::ZeroKeepalive);
    }
    Ok(())
}

fn fail(sink: &dyn ChannelSink, job_id: &str, error: ChannelError) {
    client_warn!("Progress channel for job {} failed: {}", job_id, error);
    sink.emit(ChannelEvent::Error {
        job_id: job_id.to_string(),
        error,
    });
    sink.emit(ChannelEvent::Closed {
        job_id: job_id.to_string(),
    });
}

async fn drive<S>(
    mut socket: WebSocketStream<S>,
    job_id: String,
    keepalive: Duration,
    sink: Arc<dyn ChannelSink>,
    cancel: CancellationToken,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut ticker = time::interval_at(Instant::now() + keepalive, keepalive);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                let _ = time::timeout(CLOSE_GRACE, socket.close(None)).await;
                client_debug!("Progress channel for job {} closed locally", job_id);
                return;
            }
            frame = socket.next() => match frame {
                Some(Ok(Message::Text(text))) => match decode_frame(text.as_str()) {
                    Ok(Some(message)) if message.job_id != job_id => {
                        sink.emit(ChannelEvent::Error {
                            job_id: job_id.clone(),
                            error: ChannelError::Protocol(format!(
                                "frame for job {} on channel of job {}",
                                message.job_id, job_id
                            )),
                        });
                    }
                    Ok(Some(message)) => {
                        sink.emit(ChannelEvent::Message {
                            job_id: job_id.clone(),
                            message,
                        });
                    }
                    Ok(None) => client_trace!("Keepalive acknowledged for job {}", job_id),
                    Err(error) => {
                        client_warn!("Job {}: {}", job_id, error);
                        sink.emit(ChannelEvent::Error {
                            job_id: job_id.clone(),
                            error,
                        });
                    }
                },
                Some(Ok(Message::Binary(bytes))) => {
                    sink.emit(ChannelEvent::Error {
                        job_id: job_id.clone(),
                        error: ChannelError::Protocol(format!(
                            "unexpected binary frame of {} bytes",
                            bytes.len()
                        )),
                    });
                }
                Some(Ok(Message::Close(frame))) => {
                    client_info!("Progress channel for job {} closed by peer: {:?}", job_id, frame);
                    sink.emit(ChannelEvent::Closed { job_id });
                    return;
                }
                // Transport-level ping/pong is answered by tungstenite itself.
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    fail(sink.as_ref(), &job_id, ChannelError::Transport(err.to_string()));
                    return;
                }
                None => {
                    sink.emit(ChannelEvent::Closed { job_id });
                    return;
                }
            },
            _ = ticker.tick() => {
                client_trace!("Keepalive for job {}", job_id);
                if let Err(err) = socket.send(Message::Text(KEEPALIVE_PAYLOAD.into())).await {
                    fail(sink.as_ref(), &job_id, ChannelError::Transport(format!("keepalive failed: {err}")));
                    return;
                }
            }
        }
    }
}
