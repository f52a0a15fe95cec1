use std::time::Duration;

use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use serde::de::DeserializeOwned;
use translator_logging::{client_debug, client_info, client_warn};
use url::Url;

use crate::types::{ErrorBody, LanguagesBody, ModelsBody};
use crate::{
    CancelResponse, EngineStatus, GatewayError, GatewayErrorKind, JobStatusResponse, Language,
    Operation, StartEngineResponse, StartJobResponse, TranslateRequest, UploadResponse,
};

const EPUB_MIME: &str = "application/epub+zip";

#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub api_base: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_download_bytes: u64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
            max_download_bytes: 512 * 1024 * 1024,
        }
    }
}

/// Stateless request/response calls against the translation service.
#[async_trait::async_trait]
pub trait Gateway: Send + Sync {
    async fn engine_status(&self) -> Result<EngineStatus, GatewayError>;

    async fn request_engine_start(&self) -> Result<StartEngineResponse, GatewayError>;

    async fn list_models(&self) -> Result<Vec<String>, GatewayError>;

    async fn list_languages(&self) -> Result<Vec<Language>, GatewayError>;

    async fn upload_file(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
    ) -> Result<UploadResponse, GatewayError>;

    /// The service, not the gateway, checks that `file_id` was uploaded.
    async fn start_job(&self, request: &TranslateRequest)
        -> Result<StartJobResponse, GatewayError>;

    async fn cancel_job(&self, job_id: &str) -> Result<CancelResponse, GatewayError>;

    async fn job_status(&self, job_id: &str) -> Result<JobStatusResponse, GatewayError>;

    /// Fetches a finished artifact. `reference` is a download url as reported by the
    /// service: absolute, or a path under the api base.
    async fn download(&self, reference: &str) -> Result<Vec<u8>, GatewayError>;

    /// Locator of the finished artifact. No network call.
    fn download_url(&self, job_id: &str) -> String;
}

#[derive(Debug, Clone)]
pub struct ReqwestGateway {
    settings: GatewaySettings,
    base: Url,
    client: reqwest::Client,
}

impl ReqwestGateway {
    pub fn new(settings: GatewaySettings) -> Result<Self, GatewayError> {
        let base = Url::parse(&settings.api_base).map_err(|err| {
            GatewayError::new(
                Operation::Configure,
                GatewayErrorKind::InvalidResponse,
                format!("invalid api base {:?}: {err}", settings.api_base),
            )
        })?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(GatewayError::new(
                Operation::Configure,
                GatewayErrorKind::InvalidResponse,
                format!("api base must be an http(s) url, got {:?}", settings.api_base),
            ));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| {
                GatewayError::new(Operation::Configure, GatewayErrorKind::Network, err.to_string())
            })?;

        Ok(Self {
            settings,
            base,
            client,
        })
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // `new` rejected bases that cannot carry a path.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Absolute urls are used as given. Paths are taken relative to the api base,
    /// keeping its path prefix.
    fn download_endpoint(&self, reference: &str) -> Result<Url, url::ParseError> {
        match Url::parse(reference) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let segments: Vec<&str> = reference
                    .split('/')
                    .filter(|segment| !segment.is_empty())
                    .collect();
                Ok(self.endpoint(&segments))
            }
            Err(err) => Err(err),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: Operation,
        segments: &[&str],
    ) -> Result<T, GatewayError> {
        let response = self
            .client
            .get(self.endpoint(segments))
            .send()
            .await
            .map_err(|err| map_reqwest_error(operation, err))?;
        decode_json(operation, check_status(operation, response).await?).await
    }
}

#[async_trait::async_trait]
impl Gateway for ReqwestGateway {
    async fn engine_status(&self) -> Result<EngineStatus, GatewayError> {
        self.get_json(Operation::EngineStatus, &["api", "ollama", "status"])
            .await
    }

    async fn request_engine_start(&self) -> Result<StartEngineResponse, GatewayError> {
        let operation = Operation::EngineStart;
        let response = self
            .client
            .post(self.endpoint(&["api", "ollama", "start"]))
            .send()
            .await
            .map_err(|err| map_reqwest_error(operation, err))?;
        let started: StartEngineResponse =
            decode_json(operation, check_status(operation, response).await?).await?;
        client_info!("Engine start requested: success={}", started.success);
        Ok(started)
    }

    async fn list_models(&self) -> Result<Vec<String>, GatewayError> {
        let body: ModelsBody = self
            .get_json(Operation::ListModels, &["api", "models"])
            .await?;
        Ok(body.models)
    }

    async fn list_languages(&self) -> Result<Vec<Language>, GatewayError> {
        let body: LanguagesBody = self
            .get_json(Operation::ListLanguages, &["api", "languages"])
            .await?;
        Ok(body.languages)
    }

    async fn upload_file(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
    ) -> Result<UploadResponse, GatewayError> {
        let operation = Operation::Upload;
        client_info!("Uploading {} ({} bytes)", file_name, bytes.len());
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(EPUB_MIME)
            .map_err(|err| map_reqwest_error(operation, err))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint(&["api", "upload"]))
            .multipart(form)
            .send()
            .await
            .map_err(|err| map_reqwest_error(operation, err))?;
        decode_json(operation, check_status(operation, response).await?).await
    }

    async fn start_job(
        &self,
        request: &TranslateRequest,
    ) -> Result<StartJobResponse, GatewayError> {
        let operation = Operation::StartJob;
        let response = self
            .client
            .post(self.endpoint(&["api", "translate"]))
            .json(request)
            .send()
            .await
            .map_err(|err| map_reqwest_error(operation, err))?;
        let started: StartJobResponse =
            decode_json(operation, check_status(operation, response).await?).await?;
        client_info!(
            "Started job {} for file {} ({} -> {}, model {})",
            started.job_id,
            request.file_id,
            request.source_language,
            request.target_language,
            request.model
        );
        Ok(started)
    }

    async fn cancel_job(&self, job_id: &str) -> Result<CancelResponse, GatewayError> {
        let operation = Operation::CancelJob;
        let response = self
            .client
            .delete(self.endpoint(&["api", "job", job_id]))
            .send()
            .await
            .map_err(|err| map_reqwest_error(operation, err))?;
        let reply: CancelResponse =
            decode_json(operation, check_status(operation, response).await?).await?;
        if !reply.success {
            client_debug!(
                "Cancel of job {} not applied: {}",
                job_id,
                reply.message.as_deref().unwrap_or("no reason given")
            );
        }
        Ok(reply)
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatusResponse, GatewayError> {
        self.get_json(Operation::JobStatus, &["api", "job", job_id])
            .await
    }

    async fn download(&self, reference: &str) -> Result<Vec<u8>, GatewayError> {
        let operation = Operation::Download;
        let max_bytes = self.settings.max_download_bytes;
        let url = self.download_endpoint(reference).map_err(|err| {
            GatewayError::new(
                operation,
                GatewayErrorKind::InvalidResponse,
                format!("invalid download reference {reference:?}: {err}"),
            )
        })?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| map_reqwest_error(operation, err))?;
        let response = check_status(operation, response).await?;

        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(too_large(max_bytes, content_len));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| map_reqwest_error(operation, err))?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(too_large(max_bytes, next_len));
            }
            bytes.extend_from_slice(&chunk);
        }
        client_info!("Downloaded {} bytes from {}", bytes.len(), reference);
        Ok(bytes)
    }

    fn download_url(&self, job_id: &str) -> String {
        self.endpoint(&["api", "download", job_id]).to_string()
    }
}

async fn check_status(operation: Operation, response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let detail = detail_message(&body);
    client_warn!("{} rejected with {}: {}", operation, status, body);
    Err(GatewayError::remote(operation, status.as_u16(), detail))
}

async fn decode_json<T: DeserializeOwned>(
    operation: Operation,
    response: Response,
) -> Result<T, GatewayError> {
    response
        .json::<T>()
        .await
        .map_err(|err| map_reqwest_error(operation, err))
}

/// `detail` of an error body: a plain string, or the JSON text of anything else.
fn detail_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail? {
        serde_json::Value::String(text) if !text.trim().is_empty() => Some(text),
        serde_json::Value::String(_) | serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn too_large(max_bytes: u64, actual: u64) -> GatewayError {
    GatewayError::new(
        Operation::Download,
        GatewayErrorKind::InvalidResponse,
        format!("response too large (max {max_bytes}, actual {actual})"),
    )
}

fn map_reqwest_error(operation: Operation, err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        return GatewayError::new(operation, GatewayErrorKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return GatewayError::new(operation, GatewayErrorKind::InvalidResponse, err.to_string());
    }
    GatewayError::new(operation, GatewayErrorKind::Network, err.to_string())
}
