//! Backend requests issued by the session and their outcomes

use super::analysis::{
    AnalysisSummary, AnalyzeResponse, ResultResponse, SummaryResponse, UploadResponse,
};
use super::chat::{ChatHistoryResponse, ChatResponse};
use crate::services::api::ApiError;
use std::path::PathBuf;

/// Why a result is being fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultPurpose {
    /// Periodic status poll while processing
    Poll,
    /// Initial load after selecting or starting an analysis
    Load,
}

/// A single backend round trip
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiRequest {
    Upload { files: Vec<PathBuf> },
    Analyze { analysis_id: String },
    FetchResult { analysis_id: String, purpose: ResultPurpose },
    /// `seq` orders refreshes so an older listing never replaces a newer one
    ListAnalyses { limit: u32, seq: u64 },
    Chat { analysis_id: String, question: String },
    ChatHistory { analysis_id: String },
    Summary { analysis_id: String },
}

impl ApiRequest {
    pub fn name(&self) -> &'static str {
        match self {
            ApiRequest::Upload { .. } => "upload",
            ApiRequest::Analyze { .. } => "analyze",
            ApiRequest::FetchResult { .. } => "result",
            ApiRequest::ListAnalyses { .. } => "analyses",
            ApiRequest::Chat { .. } => "chat",
            ApiRequest::ChatHistory { .. } => "history",
            ApiRequest::Summary { .. } => "summary",
        }
    }
}

/// Result of executing an `ApiRequest`
#[derive(Debug)]
pub enum ApiOutcome {
    Uploaded(Result<UploadResponse, ApiError>),
    AnalysisStarted {
        analysis_id: String,
        result: Result<AnalyzeResponse, ApiError>,
    },
    ResultFetched {
        analysis_id: String,
        purpose: ResultPurpose,
        result: Result<ResultResponse, ApiError>,
    },
    AnalysesListed {
        seq: u64,
        result: Result<Vec<AnalysisSummary>, ApiError>,
    },
    ChatAnswered(Result<ChatResponse, ApiError>),
    ChatHistoryLoaded(Result<ChatHistoryResponse, ApiError>),
    SummaryLoaded(Result<SummaryResponse, ApiError>),
}

impl ApiOutcome {
    /// Outcomes that apply no matter which analysis is active
    ///
    /// The upload flow owns its own chain (upload then analyze). History
    /// listings carry no per-analysis state and are ordered by their own
    /// sequence number instead.
    pub fn ignores_generation(&self) -> bool {
        matches!(
            self,
            ApiOutcome::Uploaded(_)
                | ApiOutcome::AnalysisStarted { .. }
                | ApiOutcome::AnalysesListed { .. }
        )
    }
}

/// An outcome tagged with the session generation it was issued under
#[derive(Debug)]
pub struct ApiEvent {
    pub generation: u64,
    pub outcome: ApiOutcome,
}
