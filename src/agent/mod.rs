pub mod gemini;
pub mod prompt;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::agent::prompt::PromptBuilder;
use crate::errors::{AppError, GatewayError};
use crate::locale::Phrases;
use crate::models::{RequestEnvelope, Turn};

/// Raw access to a text-generation provider. Errors are provider-shaped and
/// are mapped to user-facing text by [`RelayGateway`].
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Whether a credential is present. Unconfigured backends are never called.
    fn is_configured(&self) -> bool;

    async fn complete(
        &self,
        preamble: Option<&str>,
        history: &[Turn],
        prompt: &str,
    ) -> Result<String, AppError>;
}

/// The boundary the session talks to. Never panics and never lets a provider
/// error through: failures come back as [`GatewayError`] carrying display text.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn send(&self, envelope: &RequestEnvelope) -> Result<String, GatewayError>;

    async fn summarize(&self, description: &str, topics: &[String]) -> Result<String, GatewayError>;
}

/// Single-attempt gateway: credential check, empty-reply fallback, error
/// logging. No retries, no timeouts beyond the transport's own.
#[derive(Clone)]
pub struct RelayGateway {
    backend: Arc<dyn CompletionBackend>,
    phrases: &'static Phrases,
}

impl RelayGateway {
    pub fn new(backend: Arc<dyn CompletionBackend>, phrases: &'static Phrases) -> Self {
        Self { backend, phrases }
    }

    fn non_blank(reply: String, fallback: &str) -> String {
        if reply.trim().is_empty() {
            warn!("Model returned an empty reply, using fallback text");
            fallback.to_string()
        } else {
            reply
        }
    }
}

#[async_trait]
impl ModelGateway for RelayGateway {
    async fn send(&self, envelope: &RequestEnvelope) -> Result<String, GatewayError> {
        if !self.backend.is_configured() {
            warn!("Chat request skipped: no model credential configured");
            return Err(GatewayError::MissingCredential {
                fallback: self.phrases.missing_credential.to_string(),
            });
        }

        debug!(
            "Sending chat turn with {} prior turns",
            envelope.prior_turns.len()
        );
        match self
            .backend
            .complete(
                Some(&envelope.system_instruction),
                &envelope.prior_turns,
                &envelope.new_user_text,
            )
            .await
        {
            Ok(reply) => Ok(Self::non_blank(reply, self.phrases.empty_reply)),
            Err(e) => {
                error!("Model API error: {e}");
                Err(GatewayError::Service {
                    fallback: self.phrases.service_error.to_string(),
                    detail: e.to_string(),
                })
            }
        }
    }

    async fn summarize(&self, description: &str, topics: &[String]) -> Result<String, GatewayError> {
        if !self.backend.is_configured() {
            return Err(GatewayError::MissingCredential {
                fallback: self.phrases.summary_missing_credential.to_string(),
            });
        }

        let prompt = PromptBuilder::new(self.phrases).summary_prompt(description, topics);
        match self.backend.complete(None, &[], &prompt).await {
            Ok(reply) => Ok(Self::non_blank(reply, self.phrases.summary_empty)),
            Err(e) => {
                error!("Model summary error: {e}");
                Err(GatewayError::Service {
                    fallback: self.phrases.summary_error.to_string(),
                    detail: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use tokio::sync::Notify;

    use super::*;

    /// Backend that replays canned results and counts how often it was hit.
    pub struct ScriptedBackend {
        configured: bool,
        replies: Mutex<VecDeque<Result<String, AppError>>>,
        calls: AtomicUsize,
        pub last_preamble: Mutex<Option<String>>,
    }

    impl ScriptedBackend {
        pub fn new(replies: Vec<Result<String, AppError>>) -> Self {
            Self {
                configured: true,
                replies: Mutex::new(replies.into()),
                calls: AtomicUsize::new(0),
                last_preamble: Mutex::new(None),
            }
        }

        pub fn unconfigured() -> Self {
            Self { configured: false, ..Self::new(vec![]) }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn complete(
            &self,
            preamble: Option<&str>,
            _history: &[Turn],
            _prompt: &str,
        ) -> Result<String, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_preamble.lock().unwrap() = preamble.map(str::to_string);
            self.replies.lock().unwrap().pop_front().unwrap_or_else(|| {
                Err(AppError::InferenceError { message: "no scripted reply".into() })
            })
        }
    }

    /// Gateway fake for session tests. A gated gateway parks every call until
    /// [`release`](Self::release) is called.
    pub struct ScriptedGateway {
        replies: Mutex<VecDeque<Result<String, GatewayError>>>,
        calls: AtomicUsize,
        gate: Option<(Notify, Notify)>,
    }

    impl ScriptedGateway {
        pub fn new(replies: Vec<Result<String, GatewayError>>) -> Self {
            Self { replies: Mutex::new(replies.into()), calls: AtomicUsize::new(0), gate: None }
        }

        pub fn gated(replies: Vec<Result<String, GatewayError>>) -> Self {
            Self { gate: Some((Notify::new(), Notify::new())), ..Self::new(replies) }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub async fn wait_for_call(&self) {
            if let Some((entered, _)) = &self.gate {
                entered.notified().await;
            }
        }

        pub fn release(&self) {
            if let Some((_, released)) = &self.gate {
                released.notify_one();
            }
        }
    }

    #[async_trait]
    impl ModelGateway for ScriptedGateway {
        async fn send(&self, _envelope: &RequestEnvelope) -> Result<String, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some((entered, released)) = &self.gate {
                entered.notify_one();
                released.notified().await;
            }
            self.replies.lock().unwrap().pop_front().unwrap_or_else(|| {
                Err(GatewayError::Service { fallback: "unscripted".into(), detail: String::new() })
            })
        }

        async fn summarize(&self, _description: &str, _topics: &[String]) -> Result<String, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("summary".into())
        }
    }
}
