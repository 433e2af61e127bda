use std::collections::HashSet;

use tokio::sync::watch;
use tracing::debug;

use crate::errors::AppError;
use crate::locale::Phrases;
use crate::models::{Message, MessageRole, WebinarContext};

/// In-memory, append-only conversation for one webinar context.
///
/// Every mutation publishes a fresh snapshot on a [`watch`] channel so
/// observers can re-render without polling.
pub struct ConversationStore {
    messages: Vec<Message>,
    ids: HashSet<String>,
    snapshots: watch::Sender<Vec<Message>>,
}

impl ConversationStore {
    /// Creates a store already holding the greeting for `context`.
    pub fn new(context: &WebinarContext, phrases: &Phrases) -> Self {
        let (snapshots, _) = watch::channel(Vec::new());
        let mut store = Self { messages: Vec::new(), ids: HashSet::new(), snapshots };
        store.reset(context, phrases);
        store
    }

    /// Drops the whole history and starts over with a model greeting.
    pub fn reset(&mut self, context: &WebinarContext, phrases: &Phrases) {
        let greeting = Message::new(MessageRole::Model, phrases.greeting_for(&context.title));
        self.ids.clear();
        self.ids.insert(greeting.id.clone());
        self.messages = vec![greeting];
        debug!("Conversation reset for webinar '{}'", context.title);
        self.publish();
    }

    pub fn append(&mut self, message: Message) -> Result<(), AppError> {
        if !self.ids.insert(message.id.clone()) {
            return Err(AppError::DuplicateMessageId { id: message.id });
        }
        self.messages.push(message);
        self.publish();
        Ok(())
    }

    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Message>> {
        self.snapshots.subscribe()
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.messages.clone());
    }
}
