use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::agent::ModelGateway;
use crate::config::SessionSettings;
use crate::errors::{AppError, GatewayError};
use crate::models::{SessionView, WebinarContext};
use crate::service::chat_session::{ChatSession, SessionHandle, SubmitOutcome};

/// Owns every live chat session. Sessions are independent; nothing is shared
/// between them except the gateway.
#[derive(Clone)]
pub struct ChatService {
    sessions: Arc<RwLock<HashMap<String, SessionHandle>>>,
    gateway: Arc<dyn ModelGateway>,
    settings: SessionSettings,
}

impl ChatService {
    pub fn new(gateway: Arc<dyn ModelGateway>, settings: SessionSettings) -> Self {
        Self { sessions: Arc::new(RwLock::new(HashMap::new())), gateway, settings }
    }

    pub async fn create_session(&self, context: WebinarContext) -> SessionView {
        let id = Uuid::new_v4().to_string();
        info!("Opening chat session {id} for webinar '{}'", context.title);
        let handle = SessionHandle::new(
            ChatSession::new(id.clone(), context, self.settings),
            self.gateway.clone(),
        );
        let view = handle.view().await;
        self.sessions.write().await.insert(id, handle);
        view
    }

    pub async fn session(&self, id: &str) -> Result<SessionHandle, AppError> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::SessionNotFound { id: id.to_string() })
    }

    pub async fn close_session(&self, id: &str) -> Result<(), AppError> {
        self.sessions
            .write()
            .await
            .remove(id)
            .map(|_| info!("Closed chat session {id}"))
            .ok_or_else(|| AppError::SessionNotFound { id: id.to_string() })
    }

    pub async fn submit(&self, id: &str, text: &str) -> Result<SubmitOutcome, AppError> {
        self.session(id).await?.submit(text).await
    }

    pub async fn switch_context(
        &self,
        id: &str,
        context: WebinarContext,
    ) -> Result<SessionView, AppError> {
        Ok(self.session(id).await?.switch_context(context).await)
    }

    pub async fn summarize(
        &self,
        description: &str,
        topics: &[String],
    ) -> Result<String, GatewayError> {
        self.gateway.summarize(description, topics).await
    }
}
