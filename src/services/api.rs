//! HTTP client for the face-analysis backend
//!
//! One method per backend operation. Each call is a single attempt: no
//! retries and no caching. Non-2xx responses are normalized into an
//! `ApiError` whose message always carries the HTTP status.

use crate::model::analysis::{
    AnalysesResponse, AnalysisSummary, AnalyzeResponse, HealthResponse, ResultResponse,
    SummaryResponse, UploadResponse,
};
use crate::model::chat::{ChatHistoryResponse, ChatRequest, ChatResponse};
use regex::Regex;
use reqwest::blocking::{multipart, Client, RequestBuilder};
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

/// Only connecting is bounded; uploads and LLM answers may take as long as they take
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Longest slice of a non-JSON error body kept in the message
const ERROR_BODY_LIMIT: usize = 200;

static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static SPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Errors produced by backend calls
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (connection, timeout, local file).
    #[error("Network error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// A success body did not match the expected shape.
    #[error("Unexpected response from server: {0}")]
    Decode(String),

    /// The HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),
}

impl ApiError {
    /// Build an error from a non-2xx response
    ///
    /// JSON bodies contribute their `detail` field. Anything else
    /// contributes a truncated, tag-stripped excerpt of the raw text.
    pub fn from_response(status: u16, content_type: Option<&str>, body: &str) -> Self {
        let is_json = content_type.is_some_and(|ct| ct.contains("json"));

        let message = if is_json {
            match serde_json::from_str::<Value>(body).ok().as_ref().and_then(detail_message) {
                Some(detail) => format!("{} (HTTP {})", detail, status),
                None => format!("Request failed (HTTP {})", status),
            }
        } else {
            let excerpt = summarize_body(body);
            if excerpt.is_empty() {
                format!("Request failed (HTTP {})", status)
            } else {
                format!("Request failed (HTTP {}): {}", status, excerpt)
            }
        };

        ApiError::Status { status, message }
    }
}

fn detail_message(body: &Value) -> Option<String> {
    match body.get("detail")? {
        Value::String(s) => Some(s.clone()),
        // Validation errors arrive as a list of {loc, msg, type}
        Value::Array(items) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if msgs.is_empty() {
                None
            } else {
                Some(msgs.join("; "))
            }
        }
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn summarize_body(body: &str) -> String {
    let text = TAG_REGEX.replace_all(body, " ");
    let text = SPACE_REGEX.replace_all(&text, " ");
    let text = text.trim();
    if text.chars().count() > ERROR_BODY_LIMIT {
        let cut: String = text.chars().take(ERROR_BODY_LIMIT).collect();
        format!("{}…", cut)
    } else {
        text.to_string()
    }
}

/// Backend operations used by the session
pub trait FaceApi: Send + Sync {
    fn upload(&self, files: &[PathBuf]) -> Result<UploadResponse, ApiError>;
    fn analyze(&self, analysis_id: &str) -> Result<AnalyzeResponse, ApiError>;
    fn result(&self, analysis_id: &str) -> Result<ResultResponse, ApiError>;
    fn list_analyses(&self, limit: u32) -> Result<Vec<AnalysisSummary>, ApiError>;
    fn chat(&self, analysis_id: &str, question: &str) -> Result<ChatResponse, ApiError>;
    fn chat_history(&self, analysis_id: &str) -> Result<ChatHistoryResponse, ApiError>;
    fn summary(&self, analysis_id: &str) -> Result<SummaryResponse, ApiError>;
}

/// Blocking client; call it from worker threads, never the render loop
pub struct ApiClient {
    http: Client,
    base_url: String,
    request_timeout: Option<Duration>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_timeouts(base_url, None, Duration::from_secs(CONNECT_TIMEOUT_SECS))
    }

    /// `request_timeout: None` disables the blocking client's default
    /// request timeout
    pub fn with_timeouts(
        base_url: &str,
        request_timeout: Option<Duration>,
        connect_timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| ApiError::ClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    /// Liveness check (`GET /health`, outside the `/api` prefix)
    pub fn health(&self) -> Result<HealthResponse, ApiError> {
        self.send(self.http.get(format!("{}/health", self.base_url)))
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request
            .send()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = response
            .text()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ApiError::from_response(
                status.as_u16(),
                content_type.as_deref(),
                &text,
            ));
        }

        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn file_part(path: &Path) -> Result<multipart::Part, ApiError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        let bytes = std::fs::read(path)
            .map_err(|e| ApiError::Transport(format!("could not read {}: {}", name, e)))?;
        let mime = mime_guess::from_path(path).first_or_octet_stream();

        multipart::Part::bytes(bytes)
            .file_name(name)
            .mime_str(mime.essence_str())
            .map_err(|e| ApiError::Transport(e.to_string()))
    }
}

impl FaceApi for ApiClient {
    fn upload(&self, files: &[PathBuf]) -> Result<UploadResponse, ApiError> {
        let mut form = multipart::Form::new();
        for path in files {
            form = form.part("files", Self::file_part(path)?);
        }
        tracing::info!(count = files.len(), "uploading images");
        self.send(self.http.post(self.api_url("/upload")).multipart(form))
    }

    fn analyze(&self, analysis_id: &str) -> Result<AnalyzeResponse, ApiError> {
        self.send(self.http.post(self.api_url(&format!("/analyze/{}", analysis_id))))
    }

    fn result(&self, analysis_id: &str) -> Result<ResultResponse, ApiError> {
        self.send(self.http.get(self.api_url(&format!("/result/{}", analysis_id))))
    }

    fn list_analyses(&self, limit: u32) -> Result<Vec<AnalysisSummary>, ApiError> {
        let response: AnalysesResponse = self.send(
            self.http
                .get(self.api_url("/analyses"))
                .query(&[("limit", limit)]),
        )?;
        Ok(response.analyses)
    }

    fn chat(&self, analysis_id: &str, question: &str) -> Result<ChatResponse, ApiError> {
        let body = ChatRequest {
            analysis_id,
            question,
        };
        self.send(self.http.post(self.api_url("/chat")).json(&body))
    }

    fn chat_history(&self, analysis_id: &str) -> Result<ChatHistoryResponse, ApiError> {
        self.send(self.http.get(self.api_url(&format!("/history/{}", analysis_id))))
    }

    fn summary(&self, analysis_id: &str) -> Result<SummaryResponse, ApiError> {
        self.send(self.http.get(self.api_url(&format!("/summary/{}", analysis_id))))
    }
}
