//! Client session state
//!
//! The session is the single owner of what the UI knows about the active
//! analysis. It drives two protocols:
//!
//! - upload → analyze: an upload yields an id, analysis is requested for it
//!   right away, and the new analysis becomes the active one.
//! - status polling: while the active analysis is `processing`, a result
//!   fetch is issued every poll interval until it turns terminal.
//!
//! Session operations never perform I/O. They return the `ApiRequest`s to
//! dispatch, and outcomes come back through [`Session::apply`]. Requests are
//! tagged with the session generation; switching the active analysis bumps
//! it, so outcomes issued for a previous analysis are discarded.

use super::analysis::{AnalysisResult, AnalysisStatus, AnalysisSummary, ResultResponse};
use super::chat::{transcript_from_history, ChatMessage};
use super::request::{ApiEvent, ApiOutcome, ApiRequest, ResultPurpose};
use crate::services::api::ApiError;
use crate::services::poller::{PollKey, PollTimer};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// State of the summary dialog content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryState {
    Loading,
    Ready(String),
    Unavailable,
}

#[derive(Debug)]
pub struct Session {
    /// Active analysis, if any
    pub analysis_id: Option<String>,
    /// Last known status of the active analysis (unknown until loaded)
    pub status: Option<AnalysisStatus>,
    pub result: Option<AnalysisResult>,
    /// Transcript for the active analysis
    pub messages: Vec<ChatMessage>,
    /// Past analyses in server order
    pub history: Vec<AnalysisSummary>,
    pub uploading: bool,
    pub chat_pending: bool,
    /// Dismissible error banner
    pub error: Option<String>,
    pub summary: Option<SummaryState>,

    history_limit: u32,
    poll_interval: Duration,
    poller: Option<PollTimer>,
    generation: u64,
    /// Last history refresh issued, and the newest one applied
    history_seq: u64,
    history_applied: u64,
}

impl Session {
    pub fn new(history_limit: u32, poll_interval: Duration) -> Self {
        Self {
            analysis_id: None,
            status: None,
            result: None,
            messages: Vec::new(),
            history: Vec::new(),
            uploading: false,
            chat_pending: false,
            error: None,
            summary: None,
            history_limit,
            poll_interval,
            poller: None,
            generation: 0,
            history_seq: 0,
            history_applied: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_some()
    }

    /// Questions can only be asked about a completed analysis
    pub fn is_chat_ready(&self) -> bool {
        self.analysis_id.is_some() && self.status == Some(AnalysisStatus::Completed)
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Operations
    // ─────────────────────────────────────────────────────────────────────────

    pub fn refresh_history(&mut self) -> Vec<ApiRequest> {
        self.history_seq += 1;
        vec![ApiRequest::ListAnalyses {
            limit: self.history_limit,
            seq: self.history_seq,
        }]
    }

    /// Start the upload → analyze flow
    pub fn begin_upload(&mut self, files: Vec<PathBuf>) -> Vec<ApiRequest> {
        if self.uploading || files.is_empty() {
            return Vec::new();
        }
        self.uploading = true;
        self.error = None;
        vec![ApiRequest::Upload { files }]
    }

    /// Make a past analysis the active one and load its result
    pub fn select_analysis(&mut self, analysis_id: &str) -> Vec<ApiRequest> {
        tracing::info!(analysis_id, "selecting analysis");
        self.activate(analysis_id.to_string(), None);
        self.error = None;
        vec![ApiRequest::FetchResult {
            analysis_id: analysis_id.to_string(),
            purpose: ResultPurpose::Load,
        }]
    }

    pub fn send_message(&mut self, question: &str) -> Vec<ApiRequest> {
        let question = question.trim();
        if question.is_empty() || self.chat_pending || !self.is_chat_ready() {
            return Vec::new();
        }
        let Some(analysis_id) = self.analysis_id.clone() else {
            return Vec::new();
        };

        self.messages.push(ChatMessage::user(question));
        self.chat_pending = true;
        vec![ApiRequest::Chat {
            analysis_id,
            question: question.to_string(),
        }]
    }

    pub fn request_summary(&mut self) -> Vec<ApiRequest> {
        if !self.is_chat_ready() {
            return Vec::new();
        }
        let Some(analysis_id) = self.analysis_id.clone() else {
            return Vec::new();
        };
        self.summary = Some(SummaryState::Loading);
        vec![ApiRequest::Summary { analysis_id }]
    }

    /// Advance the poll timer; returns a result fetch when one is due
    pub fn tick(&mut self, now: Instant) -> Vec<ApiRequest> {
        let Some(timer) = self.poller.as_mut() else {
            return Vec::new();
        };
        if !timer.check(now) {
            return Vec::new();
        }

        let analysis_id = timer.key().analysis_id.clone();
        tracing::debug!(analysis_id = %analysis_id, poll = timer.fired(), "polling result");
        vec![ApiRequest::FetchResult {
            analysis_id,
            purpose: ResultPurpose::Poll,
        }]
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Outcomes
    // ─────────────────────────────────────────────────────────────────────────

    /// Fold a request outcome into the session, returning follow-up requests
    pub fn apply(&mut self, event: ApiEvent) -> Vec<ApiRequest> {
        if event.generation != self.generation && !event.outcome.ignores_generation() {
            tracing::debug!(
                issued = event.generation,
                current = self.generation,
                "discarding stale response"
            );
            return Vec::new();
        }

        match event.outcome {
            ApiOutcome::Uploaded(Ok(response)) => {
                tracing::info!(
                    analysis_id = %response.analysis_id,
                    images = response.image_count,
                    "upload complete, starting analysis"
                );
                let analysis_id = response.analysis_id;
                self.activate(analysis_id.clone(), Some(AnalysisStatus::Pending));
                vec![ApiRequest::Analyze { analysis_id }]
            }
            ApiOutcome::Uploaded(Err(e)) => {
                self.uploading = false;
                self.fail(e);
                Vec::new()
            }
            ApiOutcome::AnalysisStarted {
                analysis_id,
                result,
            } => {
                self.uploading = false;
                match result {
                    Ok(response) => self.apply_analysis_started(&analysis_id, response.status),
                    Err(e) => {
                        self.fail(e);
                        Vec::new()
                    }
                }
            }
            ApiOutcome::ResultFetched {
                analysis_id,
                purpose,
                result,
            } => {
                if self.analysis_id.as_deref() != Some(analysis_id.as_str()) {
                    tracing::debug!(analysis_id = %analysis_id, "result for inactive analysis");
                    return Vec::new();
                }
                match (purpose, result) {
                    (ResultPurpose::Poll, Ok(response)) => self.apply_poll(response),
                    (ResultPurpose::Poll, Err(e)) => {
                        // The timer stays armed; the next interval polls again
                        self.fail(e);
                        Vec::new()
                    }
                    (ResultPurpose::Load, Ok(response)) => self.apply_load(response),
                    (ResultPurpose::Load, Err(e)) => {
                        self.fail(e);
                        Vec::new()
                    }
                }
            }
            ApiOutcome::AnalysesListed { seq, result } => {
                if seq <= self.history_applied {
                    tracing::debug!(seq, applied = self.history_applied, "discarding older history listing");
                    return Vec::new();
                }
                self.history_applied = seq;
                match result {
                    Ok(analyses) => self.history = analyses,
                    Err(e) => self.fail(e),
                }
                Vec::new()
            }
            ApiOutcome::ChatAnswered(result) => {
                self.chat_pending = false;
                let reply = match result {
                    Ok(response) => ChatMessage::assistant(response.answer),
                    Err(e) => {
                        tracing::warn!(error = %e, "chat request failed");
                        ChatMessage::assistant(format!("Error: {}", e))
                    }
                };
                self.messages.push(reply);
                Vec::new()
            }
            ApiOutcome::ChatHistoryLoaded(Ok(response)) => {
                // Keep anything typed while the history was loading
                let mut transcript = transcript_from_history(&response.history);
                transcript.append(&mut self.messages);
                self.messages = transcript;
                Vec::new()
            }
            ApiOutcome::ChatHistoryLoaded(Err(e)) => {
                tracing::debug!(error = %e, "chat history unavailable");
                Vec::new()
            }
            ApiOutcome::SummaryLoaded(Ok(response)) => {
                self.summary = Some(SummaryState::Ready(response.summary));
                Vec::new()
            }
            ApiOutcome::SummaryLoaded(Err(e)) => {
                self.summary = Some(SummaryState::Unavailable);
                self.fail(e);
                Vec::new()
            }
        }
    }

    fn apply_analysis_started(
        &mut self,
        analysis_id: &str,
        status: AnalysisStatus,
    ) -> Vec<ApiRequest> {
        let mut requests = self.refresh_history();
        if self.analysis_id.as_deref() != Some(analysis_id) {
            return requests;
        }

        tracing::info!(analysis_id, status = status.label(), "analysis started");
        self.status = Some(status);
        self.sync_poller();

        if status == AnalysisStatus::Completed {
            requests.push(ApiRequest::FetchResult {
                analysis_id: analysis_id.to_string(),
                purpose: ResultPurpose::Load,
            });
        }
        requests
    }

    fn apply_poll(&mut self, response: ResultResponse) -> Vec<ApiRequest> {
        // A poll that overlapped the terminal one changes nothing
        if self.status != Some(AnalysisStatus::Processing) {
            return Vec::new();
        }

        match response.status {
            AnalysisStatus::Completed => {
                tracing::info!(analysis_id = %response.analysis_id, "analysis completed");
                self.status = Some(AnalysisStatus::Completed);
                self.result = response.result;
                self.sync_poller();
                self.refresh_history()
            }
            AnalysisStatus::Failed => {
                tracing::warn!(analysis_id = %response.analysis_id, "analysis failed");
                self.status = Some(AnalysisStatus::Failed);
                self.sync_poller();
                Vec::new()
            }
            AnalysisStatus::Pending | AnalysisStatus::Processing => Vec::new(),
        }
    }

    fn apply_load(&mut self, response: ResultResponse) -> Vec<ApiRequest> {
        self.status = Some(response.status);
        self.result = response.result;
        self.sync_poller();

        if response.status == AnalysisStatus::Completed {
            vec![ApiRequest::ChatHistory {
                analysis_id: response.analysis_id,
            }]
        } else {
            Vec::new()
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    /// Switch the active analysis, dropping everything tied to the old one
    fn activate(&mut self, analysis_id: String, status: Option<AnalysisStatus>) {
        self.generation += 1;
        self.analysis_id = Some(analysis_id);
        self.status = status;
        self.result = None;
        self.messages.clear();
        self.chat_pending = false;
        self.summary = None;
        self.sync_poller();
    }

    /// Replace the poll timer when its `(id, status)` key changes
    fn sync_poller(&mut self) {
        let desired = match (&self.analysis_id, self.status) {
            (Some(id), Some(AnalysisStatus::Processing)) => Some(PollKey {
                analysis_id: id.clone(),
                status: AnalysisStatus::Processing,
            }),
            _ => None,
        };

        if self.poller.as_ref().map(|t| t.key()) == desired.as_ref() {
            return;
        }

        if let Some(old) = self.poller.take() {
            tracing::debug!(
                analysis_id = %old.key().analysis_id,
                polls = old.fired(),
                "polling stopped"
            );
        }
        if let Some(key) = desired {
            tracing::debug!(analysis_id = %key.analysis_id, "polling started");
            self.poller = Some(PollTimer::new(key, self.poll_interval));
        }
    }

    fn fail(&mut self, error: ApiError) {
        tracing::warn!(error = %error, "request failed");
        self.error = Some(error.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::result::{format_share, gender_percentages};
    use crate::model::analysis::{
        AgeGroupStats, AnalyzeResponse, GenderStats, SummaryResponse, UploadResponse,
    };
    use crate::model::chat::{ChatHistoryItem, ChatHistoryResponse, ChatResponse};

    const INTERVAL: Duration = Duration::from_secs(2);

    fn session() -> Session {
        Session::new(20, INTERVAL)
    }

    fn current(session: &Session, outcome: ApiOutcome) -> ApiEvent {
        ApiEvent {
            generation: session.generation(),
            outcome,
        }
    }

    fn result_outcome(
        id: &str,
        purpose: ResultPurpose,
        status: AnalysisStatus,
        result: Option<AnalysisResult>,
    ) -> ApiOutcome {
        ApiOutcome::ResultFetched {
            analysis_id: id.to_string(),
            purpose,
            result: Ok(ResultResponse {
                analysis_id: id.to_string(),
                status,
                result,
            }),
        }
    }

    fn five_faces() -> AnalysisResult {
        AnalysisResult {
            total_faces: 5,
            gender: GenderStats { male: 2, female: 3 },
            age_group: AgeGroupStats {
                tens: 0,
                twenties: 3,
                thirties: 1,
                forty_plus: 1,
            },
        }
    }

    fn server_error(status: u16, detail: &str) -> ApiError {
        ApiError::Status {
            status,
            message: format!("{} (HTTP {})", detail, status),
        }
    }

    fn summary_row(id: &str, status: AnalysisStatus) -> AnalysisSummary {
        AnalysisSummary {
            analysis_id: id.to_string(),
            status,
            created_at: None,
            total_faces: 0,
            image_count: 1,
            result: None,
        }
    }

    /// Upload two files and start analysis; leaves the session processing
    fn start_processing(session: &mut Session, id: &str) {
        let requests = session.begin_upload(vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg")]);
        assert_eq!(requests.len(), 1);

        let ev = current(
            session,
            ApiOutcome::Uploaded(Ok(UploadResponse {
                analysis_id: id.to_string(),
                image_count: 2,
                message: String::new(),
            })),
        );
        assert_eq!(
            session.apply(ev),
            vec![ApiRequest::Analyze {
                analysis_id: id.to_string()
            }]
        );
        assert_eq!(session.status, Some(AnalysisStatus::Pending));

        let ev = current(
            session,
            ApiOutcome::AnalysisStarted {
                analysis_id: id.to_string(),
                result: Ok(AnalyzeResponse {
                    analysis_id: id.to_string(),
                    status: AnalysisStatus::Processing,
                    message: String::new(),
                }),
            },
        );
        session.apply(ev);
        assert_eq!(session.status, Some(AnalysisStatus::Processing));
        assert!(!session.uploading);
    }

    fn is_poll(request: &ApiRequest) -> bool {
        matches!(
            request,
            ApiRequest::FetchResult {
                purpose: ResultPurpose::Poll,
                ..
            }
        )
    }

    #[test]
    fn test_polling_stops_after_terminal_response() {
        let mut s = session();
        start_processing(&mut s, "X");
        assert!(s.is_polling());

        let t0 = Instant::now();
        let mut polls = 0;
        let mut history_refreshes = 0;
        let responses = [
            AnalysisStatus::Processing,
            AnalysisStatus::Processing,
            AnalysisStatus::Completed,
        ];
        let mut next = responses.iter();

        for step in 0..=6u32 {
            let now = t0 + INTERVAL * step;
            for request in s.tick(now) {
                assert!(is_poll(&request));
                polls += 1;
                let status = *next.next().expect("poll after terminal response");
                let result = (status == AnalysisStatus::Completed).then(five_faces);
                let ev = current(&s, result_outcome("X", ResultPurpose::Poll, status, result));
                for follow_up in s.apply(ev) {
                    if matches!(follow_up, ApiRequest::ListAnalyses { .. }) {
                        history_refreshes += 1;
                    }
                }
            }
        }

        assert_eq!(polls, 3);
        assert_eq!(history_refreshes, 1);
        assert!(!s.is_polling());
        assert_eq!(s.status, Some(AnalysisStatus::Completed));
        assert_eq!(s.result, Some(five_faces()));
    }

    #[test]
    fn test_upload_to_rendered_percentages() {
        let mut s = session();
        start_processing(&mut s, "X");

        let t0 = Instant::now();
        s.tick(t0);
        let polls = s.tick(t0 + INTERVAL);
        assert_eq!(polls.len(), 1);

        let ev = current(
            &s,
            result_outcome("X", ResultPurpose::Poll, AnalysisStatus::Completed, Some(five_faces())),
        );
        s.apply(ev);

        let result = s.result.as_ref().unwrap();
        let (male, female) = gender_percentages(result);
        assert_eq!(male, 40.0);
        assert_eq!(female, 60.0);
        assert_eq!(format_share(male, result.total_faces), "40.0");
        assert_eq!(format_share(female, result.total_faces), "60.0");
        assert!(s.is_chat_ready());
    }

    #[test]
    fn test_switching_analysis_cancels_timer_and_drops_stale_responses() {
        let mut s = session();
        start_processing(&mut s, "A");
        let t0 = Instant::now();
        s.tick(t0);
        assert_eq!(s.tick(t0 + INTERVAL).len(), 1);
        let stale_generation = s.generation();

        let requests = s.select_analysis("B");
        assert_eq!(
            requests,
            vec![ApiRequest::FetchResult {
                analysis_id: "B".to_string(),
                purpose: ResultPurpose::Load
            }]
        );
        assert!(!s.is_polling());

        // The poll issued for A answers after the switch
        let stale = ApiEvent {
            generation: stale_generation,
            outcome: result_outcome("A", ResultPurpose::Poll, AnalysisStatus::Completed, Some(five_faces())),
        };
        assert!(s.apply(stale).is_empty());
        assert_eq!(s.analysis_id.as_deref(), Some("B"));
        assert_eq!(s.status, None);
        assert_eq!(s.result, None);

        assert!(s.tick(t0 + INTERVAL * 5).is_empty());
    }

    /// Select `id` and let it load as completed
    fn open_completed(s: &mut Session, id: &str) {
        s.select_analysis(id);
        let ev = current(s, result_outcome(id, ResultPurpose::Load, AnalysisStatus::Completed, None));
        s.apply(ev);
    }

    #[test]
    fn test_stale_chat_answer_is_dropped_after_switch() {
        let mut s = session();
        open_completed(&mut s, "A");
        assert_eq!(s.send_message("How many?").len(), 1);
        let stale_generation = s.generation();

        open_completed(&mut s, "B");
        let stale = ApiEvent {
            generation: stale_generation,
            outcome: ApiOutcome::ChatAnswered(Ok(ChatResponse {
                analysis_id: "A".to_string(),
                question: "How many?".to_string(),
                answer: "Five.".to_string(),
            })),
        };
        assert!(s.apply(stale).is_empty());

        assert!(s.messages.is_empty());
        assert!(!s.chat_pending);
        assert!(s.error.is_none());
    }

    #[test]
    fn test_stale_chat_failure_is_dropped_after_switch() {
        let mut s = session();
        open_completed(&mut s, "A");
        s.send_message("How many?");
        let stale_generation = s.generation();

        open_completed(&mut s, "B");
        s.send_message("And here?");
        let stale = ApiEvent {
            generation: stale_generation,
            outcome: ApiOutcome::ChatAnswered(Err(server_error(500, "LLM unavailable"))),
        };
        s.apply(stale);

        assert_eq!(s.messages, vec![ChatMessage::user("And here?")]);
        assert!(s.chat_pending);
    }

    #[test]
    fn test_stale_chat_history_is_dropped_after_switch() {
        let mut s = session();
        s.select_analysis("A");
        let ev = current(&s, result_outcome("A", ResultPurpose::Load, AnalysisStatus::Completed, None));
        assert_eq!(s.apply(ev).len(), 1);
        let stale_generation = s.generation();

        open_completed(&mut s, "B");
        let stale = ApiEvent {
            generation: stale_generation,
            outcome: ApiOutcome::ChatHistoryLoaded(Ok(ChatHistoryResponse {
                analysis_id: "A".to_string(),
                history: vec![ChatHistoryItem {
                    question: "Old question".to_string(),
                    answer: "Old answer".to_string(),
                    created_at: None,
                }],
            })),
        };
        s.apply(stale);

        assert!(s.messages.is_empty());
        assert_eq!(s.analysis_id.as_deref(), Some("B"));
    }

    #[test]
    fn test_stale_summary_is_dropped_after_switch() {
        let mut s = session();
        open_completed(&mut s, "A");
        assert_eq!(s.request_summary().len(), 1);
        let stale_generation = s.generation();

        open_completed(&mut s, "B");
        assert_eq!(s.summary, None);
        for outcome in [
            ApiOutcome::SummaryLoaded(Ok(SummaryResponse {
                analysis_id: "A".to_string(),
                summary: "About A".to_string(),
                raw_data: serde_json::Value::Null,
            })),
            ApiOutcome::SummaryLoaded(Err(server_error(500, "LLM down"))),
        ] {
            s.apply(ApiEvent {
                generation: stale_generation,
                outcome,
            });
        }

        assert_eq!(s.summary, None);
        assert!(s.error.is_none());
    }

    #[test]
    fn test_reselecting_replaces_timer_instead_of_rearming() {
        let mut s = session();
        s.select_analysis("A");
        let ev = current(&s, result_outcome("A", ResultPurpose::Load, AnalysisStatus::Processing, None));
        s.apply(ev);
        let t0 = Instant::now();
        s.tick(t0);
        assert_eq!(s.tick(t0 + INTERVAL).len(), 1);

        s.select_analysis("A");
        let ev = current(&s, result_outcome("A", ResultPurpose::Load, AnalysisStatus::Processing, None));
        s.apply(ev);

        // Fresh timer: the first check only arms it
        assert!(s.tick(t0 + INTERVAL * 2).is_empty());
        assert_eq!(s.tick(t0 + INTERVAL * 3).len(), 1);
    }

    #[test]
    fn test_selecting_completed_analysis_rehydrates_transcript() {
        let mut s = session();
        s.select_analysis("A");
        let ev = current(
            &s,
            result_outcome("A", ResultPurpose::Load, AnalysisStatus::Completed, Some(five_faces())),
        );
        assert_eq!(
            s.apply(ev),
            vec![ApiRequest::ChatHistory {
                analysis_id: "A".to_string()
            }]
        );

        let ev = current(
            &s,
            ApiOutcome::ChatHistoryLoaded(Ok(ChatHistoryResponse {
                analysis_id: "A".to_string(),
                history: vec![ChatHistoryItem {
                    question: "How many?".to_string(),
                    answer: "Five.".to_string(),
                    created_at: None,
                }],
            })),
        );
        s.apply(ev);

        assert_eq!(
            s.messages,
            vec![ChatMessage::user("How many?"), ChatMessage::assistant("Five.")]
        );
    }

    #[test]
    fn test_selecting_unfinished_analysis_skips_chat_history() {
        let mut s = session();
        s.select_analysis("A");
        let ev = current(&s, result_outcome("A", ResultPurpose::Load, AnalysisStatus::Pending, None));
        assert!(s.apply(ev).is_empty());
        assert!(!s.is_polling());
        assert!(!s.is_chat_ready());
    }

    #[test]
    fn test_chat_history_errors_are_swallowed() {
        let mut s = session();
        s.select_analysis("A");
        let ev = current(&s, result_outcome("A", ResultPurpose::Load, AnalysisStatus::Completed, None));
        s.apply(ev);

        let ev = current(&s, ApiOutcome::ChatHistoryLoaded(Err(server_error(500, "db down"))));
        s.apply(ev);

        assert!(s.messages.is_empty());
        assert!(s.error.is_none());
    }

    #[test]
    fn test_switching_clears_transcript() {
        let mut s = session();
        s.select_analysis("A");
        let ev = current(&s, result_outcome("A", ResultPurpose::Load, AnalysisStatus::Completed, None));
        s.apply(ev);
        s.send_message("hello");
        assert_eq!(s.messages.len(), 1);

        s.select_analysis("B");
        assert!(s.messages.is_empty());
        assert!(!s.chat_pending);
    }

    #[test]
    fn test_select_failure_shows_banner() {
        let mut s = session();
        s.select_analysis("gone");
        let ev = current(
            &s,
            ApiOutcome::ResultFetched {
                analysis_id: "gone".to_string(),
                purpose: ResultPurpose::Load,
                result: Err(server_error(404, "Analysis not found")),
            },
        );
        s.apply(ev);
        assert_eq!(s.error.as_deref(), Some("Analysis not found (HTTP 404)"));

        s.dismiss_error();
        assert!(s.error.is_none());
    }

    #[test]
    fn test_upload_failure_aborts_without_touching_history() {
        let mut s = session();
        s.history = vec![summary_row("old", AnalysisStatus::Completed)];
        s.begin_upload(vec![PathBuf::from("a.jpg")]);
        assert!(s.uploading);

        let ev = current(&s, ApiOutcome::Uploaded(Err(ApiError::Transport("connection refused".into()))));
        let follow_up = s.apply(ev);

        assert!(follow_up.is_empty());
        assert!(!s.uploading);
        assert_eq!(s.error.as_deref(), Some("Network error: connection refused"));
        assert_eq!(s.analysis_id, None);
        assert_eq!(s.history.len(), 1);
    }

    #[test]
    fn test_analyze_failure_aborts_flow() {
        let mut s = session();
        s.begin_upload(vec![PathBuf::from("a.jpg")]);
        let ev = current(
            &s,
            ApiOutcome::Uploaded(Ok(UploadResponse {
                analysis_id: "X".to_string(),
                image_count: 1,
                message: String::new(),
            })),
        );
        s.apply(ev);

        let ev = current(
            &s,
            ApiOutcome::AnalysisStarted {
                analysis_id: "X".to_string(),
                result: Err(server_error(400, "No images found for this analysis")),
            },
        );
        let follow_up = s.apply(ev);

        assert!(follow_up.is_empty());
        assert!(!s.uploading);
        assert!(!s.is_polling());
        assert_eq!(s.status, Some(AnalysisStatus::Pending));
        assert!(s.error.as_deref().unwrap().contains("No images found"));
    }

    #[test]
    fn test_upload_ignored_while_uploading_or_empty() {
        let mut s = session();
        assert!(s.begin_upload(Vec::new()).is_empty());
        assert_eq!(s.begin_upload(vec![PathBuf::from("a.jpg")]).len(), 1);
        assert!(s.begin_upload(vec![PathBuf::from("b.jpg")]).is_empty());
    }

    #[test]
    fn test_upload_completing_after_selection_still_takes_over() {
        let mut s = session();
        s.begin_upload(vec![PathBuf::from("a.jpg")]);
        let upload_generation = s.generation();
        s.select_analysis("B");

        let ev = ApiEvent {
            generation: upload_generation,
            outcome: ApiOutcome::Uploaded(Ok(UploadResponse {
                analysis_id: "X".to_string(),
                image_count: 1,
                message: String::new(),
            })),
        };
        let follow_up = s.apply(ev);

        assert_eq!(s.analysis_id.as_deref(), Some("X"));
        assert_eq!(
            follow_up,
            vec![ApiRequest::Analyze {
                analysis_id: "X".to_string()
            }]
        );
    }

    #[test]
    fn test_poll_error_keeps_timer_armed() {
        let mut s = session();
        start_processing(&mut s, "X");
        let t0 = Instant::now();
        s.tick(t0);
        s.tick(t0 + INTERVAL);

        let ev = current(
            &s,
            ApiOutcome::ResultFetched {
                analysis_id: "X".to_string(),
                purpose: ResultPurpose::Poll,
                result: Err(ApiError::Transport("timed out".into())),
            },
        );
        s.apply(ev);

        assert!(s.error.is_some());
        assert!(s.is_polling());
        assert_eq!(s.tick(t0 + INTERVAL * 2).len(), 1);
    }

    #[test]
    fn test_failed_poll_stops_without_history_refresh() {
        let mut s = session();
        start_processing(&mut s, "X");
        let t0 = Instant::now();
        s.tick(t0);
        s.tick(t0 + INTERVAL);

        let ev = current(&s, result_outcome("X", ResultPurpose::Poll, AnalysisStatus::Failed, None));
        assert!(s.apply(ev).is_empty());
        assert_eq!(s.status, Some(AnalysisStatus::Failed));
        assert!(!s.is_polling());
    }

    #[test]
    fn test_overlapping_terminal_polls_refresh_history_once() {
        let mut s = session();
        start_processing(&mut s, "X");

        let first = current(&s, result_outcome("X", ResultPurpose::Poll, AnalysisStatus::Completed, Some(five_faces())));
        let second = current(&s, result_outcome("X", ResultPurpose::Poll, AnalysisStatus::Completed, Some(five_faces())));
        assert_eq!(s.apply(first).len(), 1);
        assert!(s.apply(second).is_empty());
    }

    #[test]
    fn test_already_completed_analysis_loads_result() {
        let mut s = session();
        s.begin_upload(vec![PathBuf::from("a.jpg")]);
        let ev = current(
            &s,
            ApiOutcome::Uploaded(Ok(UploadResponse {
                analysis_id: "X".to_string(),
                image_count: 1,
                message: String::new(),
            })),
        );
        s.apply(ev);
        let ev = current(
            &s,
            ApiOutcome::AnalysisStarted {
                analysis_id: "X".to_string(),
                result: Ok(AnalyzeResponse {
                    analysis_id: "X".to_string(),
                    status: AnalysisStatus::Completed,
                    message: String::new(),
                }),
            },
        );
        let follow_up = s.apply(ev);

        assert!(follow_up
            .iter()
            .any(|r| matches!(r, ApiRequest::ListAnalyses { limit: 20, .. })));
        assert!(follow_up.contains(&ApiRequest::FetchResult {
            analysis_id: "X".to_string(),
            purpose: ResultPurpose::Load
        }));
        assert!(!s.is_polling());
    }

    #[test]
    fn test_chat_requires_completed_analysis_and_no_pending_reply() {
        let mut s = session();
        assert!(s.send_message("hi").is_empty());

        start_processing(&mut s, "X");
        assert!(s.send_message("hi").is_empty());

        let ev = current(&s, result_outcome("X", ResultPurpose::Poll, AnalysisStatus::Completed, None));
        s.apply(ev);
        assert!(s.send_message("   ").is_empty());
        assert_eq!(s.send_message(" How many? ").len(), 1);
        assert!(s.chat_pending);
        assert!(s.send_message("again").is_empty());

        let ev = current(
            &s,
            ApiOutcome::ChatAnswered(Ok(ChatResponse {
                analysis_id: "X".to_string(),
                question: "How many?".to_string(),
                answer: "Five.".to_string(),
            })),
        );
        s.apply(ev);
        assert!(!s.chat_pending);
        assert_eq!(
            s.messages,
            vec![ChatMessage::user("How many?"), ChatMessage::assistant("Five.")]
        );
    }

    #[test]
    fn test_chat_failure_is_rendered_inline() {
        let mut s = session();
        s.select_analysis("A");
        let ev = current(&s, result_outcome("A", ResultPurpose::Load, AnalysisStatus::Completed, None));
        s.apply(ev);
        s.send_message("hi");

        let ev = current(&s, ApiOutcome::ChatAnswered(Err(server_error(500, "LLM unavailable"))));
        s.apply(ev);

        assert!(s.error.is_none());
        assert_eq!(
            s.messages.last(),
            Some(&ChatMessage::assistant("Error: LLM unavailable (HTTP 500)"))
        );
    }

    #[test]
    fn test_history_keeps_server_order() {
        let mut s = session();
        let rows = vec![
            summary_row("c", AnalysisStatus::Processing),
            summary_row("a", AnalysisStatus::Completed),
            summary_row("b", AnalysisStatus::Failed),
        ];
        let seq = listing_seq(&s.refresh_history());
        let ev = current(
            &s,
            ApiOutcome::AnalysesListed {
                seq,
                result: Ok(rows.clone()),
            },
        );
        s.apply(ev);
        assert_eq!(s.history, rows);
    }

    fn listing_seq(requests: &[ApiRequest]) -> u64 {
        requests
            .iter()
            .find_map(|r| match r {
                ApiRequest::ListAnalyses { seq, .. } => Some(*seq),
                _ => None,
            })
            .expect("history refresh request")
    }

    #[test]
    fn test_older_history_listing_never_replaces_newer() {
        let mut s = session();
        start_processing(&mut s, "X");
        let older = s.refresh_history();

        let ev = current(&s, result_outcome("X", ResultPurpose::Poll, AnalysisStatus::Completed, Some(five_faces())));
        let newer = s.apply(ev);

        let ev = current(
            &s,
            ApiOutcome::AnalysesListed {
                seq: listing_seq(&newer),
                result: Ok(vec![summary_row("X", AnalysisStatus::Completed)]),
            },
        );
        s.apply(ev);
        let ev = current(
            &s,
            ApiOutcome::AnalysesListed {
                seq: listing_seq(&older),
                result: Ok(vec![summary_row("X", AnalysisStatus::Processing)]),
            },
        );
        s.apply(ev);

        assert_eq!(s.history.len(), 1);
        assert_eq!(s.history[0].status, AnalysisStatus::Completed);
    }

    #[test]
    fn test_older_history_error_is_ignored() {
        let mut s = session();
        let older = listing_seq(&s.refresh_history());
        let newer = listing_seq(&s.refresh_history());
        assert!(newer > older);

        let ev = current(
            &s,
            ApiOutcome::AnalysesListed {
                seq: newer,
                result: Ok(vec![summary_row("a", AnalysisStatus::Completed)]),
            },
        );
        s.apply(ev);
        let ev = current(
            &s,
            ApiOutcome::AnalysesListed {
                seq: older,
                result: Err(ApiError::Transport("timed out".into())),
            },
        );
        s.apply(ev);

        assert!(s.error.is_none());
        assert_eq!(s.history.len(), 1);
    }

    #[test]
    fn test_summary_requires_completed_analysis() {
        let mut s = session();
        assert!(s.request_summary().is_empty());

        s.select_analysis("A");
        let ev = current(&s, result_outcome("A", ResultPurpose::Load, AnalysisStatus::Completed, None));
        s.apply(ev);
        assert_eq!(s.request_summary().len(), 1);
        assert_eq!(s.summary, Some(SummaryState::Loading));

        let ev = current(&s, ApiOutcome::SummaryLoaded(Err(server_error(500, "LLM down"))));
        s.apply(ev);
        assert_eq!(s.summary, Some(SummaryState::Unavailable));
        assert!(s.error.is_some());
    }
}
