//! Chat transcript types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::analysis::deserialize_timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Assistant => "Assistant",
        }
    }
}

/// A single transcript entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub analysis_id: &'a str,
    pub question: &'a str,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatResponse {
    pub analysis_id: String,
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatHistoryItem {
    pub question: String,
    pub answer: String,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatHistoryResponse {
    pub analysis_id: String,
    #[serde(default)]
    pub history: Vec<ChatHistoryItem>,
}

/// Rebuild a transcript from stored question/answer pairs, oldest first
pub fn transcript_from_history(history: &[ChatHistoryItem]) -> Vec<ChatMessage> {
    history
        .iter()
        .flat_map(|item| {
            [
                ChatMessage::user(item.question.clone()),
                ChatMessage::assistant(item.answer.clone()),
            ]
        })
        .collect()
}
