use async_trait::async_trait;
use rig::completion::Chat;
use rig::message::Message as RigMessage;
use rig::prelude::CompletionClient;
use rig::providers::gemini;
use tracing::info;

use crate::agent::CompletionBackend;
use crate::errors::AppError;
use crate::models::{Turn, TurnRole};

/// Builds a rig [`RigMessage`] history list from gateway [`Turn`]s.
fn to_rig_history(turns: &[Turn]) -> Vec<RigMessage> {
    turns
        .iter()
        .map(|t| match t.role {
            TurnRole::User => RigMessage::user(&t.text),
            TurnRole::Assistant => RigMessage::assistant(&t.text),
        })
        .collect()
}

/// Gemini completion backend on top of the rig [`gemini::Client`].
/// A fresh agent is built per call so the preamble and history always come
/// from the caller.
pub struct GeminiBackend {
    client: Option<gemini::Client>,
    model: String,
    temperature: f64,
}

impl GeminiBackend {
    /// With no `api_key` the backend stays unconfigured and is never called.
    pub fn new(api_key: Option<&str>, model: &str, temperature: f64) -> Result<Self, AppError> {
        let client = match api_key {
            Some(key) => Some(
                gemini::Client::builder()
                    .api_key(key.to_string())
                    .build()
                    .map_err(|e| AppError::ClientBuild {
                        provider: "gemini".to_string(),
                        message: e.to_string(),
                    })?,
            ),
            None => None,
        };
        info!(
            "Gemini backend ready (model={model}, configured={})",
            client.is_some()
        );
        Ok(Self { client, model: model.to_string(), temperature })
    }
}

#[async_trait]
impl CompletionBackend for GeminiBackend {
    fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    async fn complete(
        &self,
        preamble: Option<&str>,
        history: &[Turn],
        prompt: &str,
    ) -> Result<String, AppError> {
        let client = self.client.as_ref().ok_or_else(|| AppError::InferenceError {
            message: "gemini client is not configured".to_string(),
        })?;

        let mut builder = client.agent(&self.model).temperature(self.temperature);
        if let Some(preamble) = preamble {
            builder = builder.preamble(preamble);
        }
        let agent = builder.build();

        agent
            .chat(prompt, to_rig_history(history))
            .await
            .map_err(|e| AppError::InferenceError { message: e.to_string() })
    }
}
