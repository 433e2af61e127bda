use thiserror::Error;

/// Top-level application error.
/// Recoverable model failures never surface here; they are folded into
/// [`GatewayError`] and rendered as assistant turns.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Invariant violations ─────────────────────────────────────────────────
    #[error("Message id '{id}' already exists in the conversation")]
    DuplicateMessageId { id: String },

    #[error("Session '{session_id}' has no request in flight")]
    NotSending { session_id: String },

    // ── Model backend errors ─────────────────────────────────────────────────
    #[error("Failed to build {provider} client: {message}")]
    ClientBuild { provider: String, message: String },

    #[error("Inference error: {message}")]
    InferenceError { message: String },

    #[error("Chat turn task failed: {message}")]
    TurnTaskFailed { message: String },

    // ── Validation errors ────────────────────────────────────────────────────
    #[error("Field '{field_name}' cannot be empty")]
    EmptyField { field_name: String },

    // ── Session errors ───────────────────────────────────────────────────────
    #[error("Session '{id}' not found")]
    SessionNotFound { id: String },
}

impl AppError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::SessionNotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::EmptyField { .. })
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, AppError::DuplicateMessageId { .. } | AppError::NotSending { .. })
    }
}

/// Failure at the model gateway boundary. Each variant carries the fixed,
/// localized text the user sees in place of a reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("model credential is not configured")]
    MissingCredential { fallback: String },

    #[error("model service failed: {detail}")]
    Service { fallback: String, detail: String },
}

impl GatewayError {
    pub fn user_message(&self) -> &str {
        match self {
            GatewayError::MissingCredential { fallback } => fallback,
            GatewayError::Service { fallback, .. } => fallback,
        }
    }
}
