//! Background request runner
//!
//! Executes backend requests on worker threads and hands their outcomes
//! back to the event loop through a channel, drained on every tick.

use crate::model::request::{ApiEvent, ApiOutcome, ApiRequest};
use crate::services::api::FaceApi;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;

pub struct RequestRunner {
    api: Arc<dyn FaceApi>,
    sender: Sender<ApiEvent>,
    receiver: Receiver<ApiEvent>,
    in_flight: usize,
}

impl RequestRunner {
    pub fn new(api: Arc<dyn FaceApi>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            api,
            sender,
            receiver,
            in_flight: 0,
        }
    }

    /// Number of requests whose outcome has not been drained yet
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Run a request on a worker thread, tagging its outcome with `generation`
    pub fn spawn(&mut self, request: ApiRequest, generation: u64) {
        let api = Arc::clone(&self.api);
        let tx = self.sender.clone();
        tracing::debug!(request = request.name(), generation, "dispatching request");

        thread::spawn(move || {
            let outcome = execute(api.as_ref(), request);
            let _ = tx.send(ApiEvent {
                generation,
                outcome,
            });
        });

        self.in_flight += 1;
    }

    /// Drain every outcome that has arrived since the last poll
    pub fn poll(&mut self) -> Vec<ApiEvent> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    events.push(event);
                }
                // The runner keeps its own sender, so disconnection cannot happen
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        events
    }
}

/// Perform one request synchronously
pub fn execute(api: &dyn FaceApi, request: ApiRequest) -> ApiOutcome {
    match request {
        ApiRequest::Upload { files } => ApiOutcome::Uploaded(api.upload(&files)),
        ApiRequest::Analyze { analysis_id } => {
            let result = api.analyze(&analysis_id);
            ApiOutcome::AnalysisStarted {
                analysis_id,
                result,
            }
        }
        ApiRequest::FetchResult {
            analysis_id,
            purpose,
        } => {
            let result = api.result(&analysis_id);
            ApiOutcome::ResultFetched {
                analysis_id,
                purpose,
                result,
            }
        }
        ApiRequest::ListAnalyses { limit, seq } => ApiOutcome::AnalysesListed {
            seq,
            result: api.list_analyses(limit),
        },
        ApiRequest::Chat {
            analysis_id,
            question,
        } => ApiOutcome::ChatAnswered(api.chat(&analysis_id, &question)),
        ApiRequest::ChatHistory { analysis_id } => {
            ApiOutcome::ChatHistoryLoaded(api.chat_history(&analysis_id))
        }
        ApiRequest::Summary { analysis_id } => ApiOutcome::SummaryLoaded(api.summary(&analysis_id)),
    }
}
