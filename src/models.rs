use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Model,
    System,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Model => "model",
            MessageRole::System => "system",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_error: bool,
}

impl Message {
    pub fn new(role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            text: text.into(),
            created_at: Utc::now(),
            is_error: false,
        }
    }

    pub fn error(role: MessageRole, text: impl Into<String>) -> Self {
        Self { is_error: true, ..Self::new(role, text) }
    }
}

/// The webinar the assistant is grounded in. Swapped as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebinarContext {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub topics: Vec<String>,
}

#[cfg(test)]
impl WebinarContext {
    pub fn new(title: impl Into<String>, description: impl Into<String>, topics: Vec<String>) -> Self {
        Self { title: title.into(), description: description.into(), topics }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One prior exchange as the model gateway sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

/// Everything a single gateway call needs. Built per call, then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEnvelope {
    pub system_instruction: String,
    pub prior_turns: Vec<Turn>,
    pub new_user_text: String,
}

// ── HTTP payloads ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: String,
    pub context: WebinarContext,
    pub messages: Vec<Message>,
    pub is_loading: bool,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoredReason {
    Blank,
    TooLong,
    Busy,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignored_reason: Option<IgnoredReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryRequest {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub topics: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary: String,
    pub is_error: bool,
}
