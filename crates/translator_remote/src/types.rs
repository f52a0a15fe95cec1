use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub installed: bool,
    pub running: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartEngineResponse {
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub file_id: String,
    pub filename: String,
    pub file_size: u64,
    pub chapter_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslateRequest {
    pub file_id: String,
    pub source_language: String,
    pub target_language: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartJobResponse {
    pub job_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteStatus {
    Pending,
    Parsing,
    Translating,
    Rebuilding,
    Completed,
    Failed,
    Cancelled,
}

/// One `progress` frame from `/ws/progress/{job_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub job_id: String,
    pub status: RemoteStatus,
    #[serde(default)]
    pub chapter_current: u32,
    #[serde(default)]
    pub chapter_total: u32,
    #[serde(default)]
    pub chapter_title: String,
    #[serde(default)]
    pub chunk_current: u32,
    #[serde(default)]
    pub chunk_total: u32,
    #[serde(default)]
    pub percentage: f64,
    #[serde(default)]
    pub estimated_time_remaining: f64,
    #[serde(default)]
    pub preview_original: String,
    #[serde(default)]
    pub preview_translated: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
}

impl ProgressMessage {
    /// A progress frame with every figure zeroed.
    pub fn new(job_id: impl Into<String>, status: RemoteStatus) -> Self {
        Self {
            kind: "progress".to_string(),
            job_id: job_id.into(),
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

/// Reply of `GET /api/job/{job_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: RemoteStatus,
    #[serde(default)]
    pub current_chapter: u32,
    #[serde(default)]
    pub total_chapters: u32,
    #[serde(default)]
    pub current_chunk: u32,
    #[serde(default)]
    pub total_chunks: u32,
    #[serde(default)]
    pub percentage: f64,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModelsBody {
    pub models: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LanguagesBody {
    pub languages: Vec<Language>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}
