use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::agent::prompt::PromptBuilder;
use crate::agent::ModelGateway;
use crate::config::{SessionSettings, StaleResponsePolicy};
use crate::errors::{AppError, GatewayError};
use crate::locale::Phrases;
use crate::models::{
    IgnoredReason, Message, MessageRole, RequestEnvelope, SessionView, WebinarContext,
};
use crate::store::conversation_store::ConversationStore;

#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionState {
    Idle,
    Sending { user_message_id: String },
}

/// A request admitted by [`ChatSession::begin_submit`], waiting for the gateway.
#[derive(Debug)]
pub struct PendingTurn {
    epoch: u64,
    pub user_message: Message,
    pub envelope: RequestEnvelope,
}

#[derive(Debug)]
pub enum Admission {
    Accepted(PendingTurn),
    Ignored(IgnoredReason),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The model turn that was appended (flagged `is_error` on failure).
    Replied(Message),
    Ignored(IgnoredReason),
    /// The conversation was reset while the call was in flight and the
    /// reply was dropped.
    Discarded,
}

/// Receivers for everything the presentation layer renders.
#[derive(Clone)]
pub struct SessionObserver {
    pub messages: watch::Receiver<Vec<Message>>,
    pub loading: watch::Receiver<bool>,
}

/// Session controller for one conversation.
///
/// All transitions are synchronous; the gateway call happens between
/// [`begin_submit`](Self::begin_submit) and [`complete`](Self::complete), so
/// the `Sending` tag, not a lock, is what keeps a second request out.
pub struct ChatSession {
    id: String,
    context: WebinarContext,
    store: ConversationStore,
    state: SessionState,
    /// Bumped on every reset; tells stale replies apart.
    epoch: u64,
    loading: watch::Sender<bool>,
    prompt: PromptBuilder,
    phrases: &'static Phrases,
    settings: SessionSettings,
}

impl ChatSession {
    pub fn new(id: String, context: WebinarContext, settings: SessionSettings) -> Self {
        let phrases = settings.locale.phrases();
        let (loading, _) = watch::channel(false);
        Self {
            id,
            store: ConversationStore::new(&context, phrases),
            context,
            state: SessionState::Idle,
            epoch: 0,
            loading,
            prompt: PromptBuilder::new(phrases),
            phrases,
            settings,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, SessionState::Sending { .. })
    }

    pub fn snapshot(&self) -> &[Message] {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> SessionObserver {
        SessionObserver { messages: self.store.subscribe(), loading: self.loading.subscribe() }
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            session_id: self.id.clone(),
            context: self.context.clone(),
            messages: self.store.snapshot().to_vec(),
            is_loading: self.is_loading(),
        }
    }

    /// Replaces the context and starts a fresh conversation. An outstanding
    /// request keeps the session in `Sending` until it resolves.
    pub fn switch_context(&mut self, context: WebinarContext) {
        info!("Session {} switching to webinar '{}'", self.id, context.title);
        self.epoch += 1;
        self.store.reset(&context, self.phrases);
        self.context = context;
    }

    /// Validates input, records the user turn and enters `Sending`.
    pub fn begin_submit(&mut self, text: &str) -> Result<Admission, AppError> {
        if text.trim().is_empty() {
            return Ok(Admission::Ignored(IgnoredReason::Blank));
        }
        if let SessionState::Sending { .. } = self.state {
            debug!("Session {} is busy, dropping submit", self.id);
            return Ok(Admission::Ignored(IgnoredReason::Busy));
        }
        if text.chars().count() > self.settings.max_message_length {
            return Ok(Admission::Ignored(IgnoredReason::TooLong));
        }

        let envelope = self.prompt.envelope(&self.context, self.store.snapshot(), text);
        let user_message = Message::new(MessageRole::User, text);
        self.store.append(user_message.clone())?;

        self.state = SessionState::Sending { user_message_id: user_message.id.clone() };
        self.loading.send_replace(true);

        Ok(Admission::Accepted(PendingTurn { epoch: self.epoch, user_message, envelope }))
    }

    /// Records the gateway outcome for `pending` and returns to `Idle`.
    pub fn complete(
        &mut self,
        pending: PendingTurn,
        result: Result<String, GatewayError>,
    ) -> Result<SubmitOutcome, AppError> {
        match &self.state {
            SessionState::Sending { user_message_id } if *user_message_id == pending.user_message.id => {}
            _ => return Err(AppError::NotSending { session_id: self.id.clone() }),
        }
        self.state = SessionState::Idle;
        self.loading.send_replace(false);

        let reply = match result {
            Ok(text) => Message::new(MessageRole::Model, text),
            Err(e) => {
                warn!("Session {} reply failed: {e}", self.id);
                Message::error(MessageRole::Model, e.user_message())
            }
        };

        if pending.epoch != self.epoch && self.settings.stale_policy == StaleResponsePolicy::Discard {
            warn!(
                "Session {} dropped a stale reply issued before a context switch",
                self.id
            );
            return Ok(SubmitOutcome::Discarded);
        }

        self.store.append(reply.clone())?;
        Ok(SubmitOutcome::Replied(reply))
    }
}

/// Shared handle that drives a [`ChatSession`] through one gateway call.
/// The mutex is only held for the synchronous steps, never across the call.
#[derive(Clone)]
pub struct SessionHandle {
    session: Arc<Mutex<ChatSession>>,
    gateway: Arc<dyn ModelGateway>,
}

impl SessionHandle {
    pub fn new(session: ChatSession, gateway: Arc<dyn ModelGateway>) -> Self {
        Self { session: Arc::new(Mutex::new(session)), gateway }
    }

    pub async fn submit(&self, text: &str) -> Result<SubmitOutcome, AppError> {
        let admission = self.session.lock().await.begin_submit(text)?;
        let pending = match admission {
            Admission::Accepted(pending) => pending,
            Admission::Ignored(reason) => return Ok(SubmitOutcome::Ignored(reason)),
        };

        // Runs detached so a dropped caller cannot leave the session in `Sending`.
        let session = self.session.clone();
        let gateway = self.gateway.clone();
        let turn = tokio::spawn(async move {
            let result = gateway.send(&pending.envelope).await;
            session.lock().await.complete(pending, result)
        });

        turn.await.map_err(|e| {
            error!("Chat turn task failed: {e}");
            AppError::TurnTaskFailed { message: e.to_string() }
        })?
    }

    pub async fn switch_context(&self, context: WebinarContext) -> SessionView {
        let mut session = self.session.lock().await;
        session.switch_context(context);
        session.view()
    }

    pub async fn view(&self) -> SessionView {
        self.session.lock().await.view()
    }

    pub async fn subscribe(&self) -> SessionObserver {
        self.session.lock().await.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::{ScriptedBackend, ScriptedGateway};
    use crate::agent::RelayGateway;
    use crate::locale::Locale;

    fn settings() -> SessionSettings {
        SessionSettings { locale: Locale::English, ..SessionSettings::default() }
    }

    fn context(title: &str) -> WebinarContext {
        WebinarContext::new(title, "About it", vec!["one".into(), "two".into()])
    }

    fn session() -> ChatSession {
        ChatSession::new("s1".into(), context("Intro to X"), settings())
    }

    fn accept(session: &mut ChatSession, text: &str) -> PendingTurn {
        match session.begin_submit(text).unwrap() {
            Admission::Accepted(pending) => pending,
            Admission::Ignored(reason) => panic!("unexpected ignore: {reason:?}"),
        }
    }

    #[test]
    fn happy_path_scenario() {
        let mut session = session();
        assert_eq!(session.snapshot().len(), 1);
        assert!(session.snapshot()[0].text.contains("Intro to X"));

        let pending = accept(&mut session, "hello");
        assert!(session.is_loading());
        assert_eq!(pending.envelope.new_user_text, "hello");
        // History handed to the gateway excludes the new user turn.
        assert_eq!(pending.envelope.prior_turns.len(), 1);

        let outcome = session.complete(pending, Ok("hi there".into())).unwrap();
        assert!(matches!(outcome, SubmitOutcome::Replied(ref m) if m.text == "hi there"));
        assert!(!session.is_loading());

        let messages = session.snapshot();
        assert_eq!(messages.len(), 3);
        assert_eq!((messages[1].role, messages[1].text.as_str()), (MessageRole::User, "hello"));
        assert_eq!((messages[2].role, messages[2].text.as_str()), (MessageRole::Model, "hi there"));
    }

    #[test]
    fn blank_and_oversized_input_are_ignored() {
        let mut session = ChatSession::new(
            "s1".into(),
            context("Intro to X"),
            SessionSettings { max_message_length: 5, ..settings() },
        );
        for text in ["", "   ", "\n\t"] {
            assert!(matches!(
                session.begin_submit(text).unwrap(),
                Admission::Ignored(IgnoredReason::Blank)
            ));
        }
        assert!(matches!(
            session.begin_submit("too long").unwrap(),
            Admission::Ignored(IgnoredReason::TooLong)
        ));
        assert_eq!(session.snapshot().len(), 1);
        assert!(!session.is_loading());
    }

    #[test]
    fn submit_while_sending_is_dropped() {
        let mut session = session();
        let pending = accept(&mut session, "a");
        assert!(matches!(
            session.begin_submit("b").unwrap(),
            Admission::Ignored(IgnoredReason::Busy)
        ));
        session.complete(pending, Ok("reply".into())).unwrap();

        let texts: Vec<&str> = session.snapshot().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts.len(), 3);
        assert!(!texts.contains(&"b"));
    }

    #[test]
    fn failure_appends_flagged_non_empty_turn() {
        let mut session = session();
        let pending = accept(&mut session, "hello");
        let err = GatewayError::Service { fallback: "oops".into(), detail: "503".into() };
        let outcome = session.complete(pending, Err(err)).unwrap();

        let SubmitOutcome::Replied(reply) = outcome else { panic!("expected a reply") };
        assert!(reply.is_error);
        assert_eq!(reply.text, "oops");
        assert_eq!(session.snapshot().last(), Some(&reply));
        assert!(!session.is_loading());
    }

    #[test]
    fn store_grows_by_two_per_accepted_submit() {
        let mut session = session();
        let initial = session.snapshot().len();
        for n in 1..=5 {
            let pending = accept(&mut session, &format!("question {n}"));
            let result = if n % 2 == 0 {
                Ok(format!("answer {n}"))
            } else {
                Err(GatewayError::MissingCredential { fallback: "no key".into() })
            };
            session.complete(pending, result).unwrap();
            assert!(session.begin_submit("").is_ok());
            assert_eq!(session.snapshot().len(), initial + 2 * n);
        }
    }

    #[test]
    fn switch_context_resets_to_single_greeting() {
        let mut session = session();
        let pending = accept(&mut session, "hello");
        session.complete(pending, Ok("hi".into())).unwrap();

        session.switch_context(context("Advanced Y"));
        let messages = session.snapshot();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, MessageRole::Model);
        assert!(messages[0].text.contains("Advanced Y"));
    }

    #[test]
    fn stale_reply_is_appended_by_default() {
        let mut session = session();
        let pending = accept(&mut session, "hello");
        session.switch_context(context("Advanced Y"));
        assert!(session.is_loading());

        let outcome = session.complete(pending, Ok("late".into())).unwrap();
        assert!(matches!(outcome, SubmitOutcome::Replied(ref m) if m.text == "late"));
        let texts: Vec<&str> = session.snapshot().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts.len(), 2);
        assert!(texts[0].contains("Advanced Y"));
        assert_eq!(texts[1], "late");
        assert!(!session.is_loading());
    }

    #[test]
    fn stale_reply_can_be_discarded() {
        let mut session = ChatSession::new(
            "s1".into(),
            context("Intro to X"),
            SessionSettings { stale_policy: StaleResponsePolicy::Discard, ..settings() },
        );
        let pending = accept(&mut session, "hello");
        session.switch_context(context("Advanced Y"));

        let outcome = session.complete(pending, Ok("late".into())).unwrap();
        assert_eq!(outcome, SubmitOutcome::Discarded);
        assert_eq!(session.snapshot().len(), 1);
        assert!(!session.is_loading());
    }

    #[test]
    fn completing_twice_is_an_invariant_violation() {
        let mut session = session();
        let pending = accept(&mut session, "hello");
        let copy = PendingTurn {
            epoch: pending.epoch,
            user_message: pending.user_message.clone(),
            envelope: pending.envelope.clone(),
        };
        session.complete(pending, Ok("hi".into())).unwrap();

        let err = session.complete(copy, Ok("again".into())).unwrap_err();
        assert!(err.is_invariant_violation());
        assert_eq!(session.snapshot().len(), 3);
    }

    #[test]
    fn observers_see_loading_transitions() {
        let mut session = session();
        let mut observer = session.subscribe();
        assert!(!*observer.loading.borrow_and_update());

        let pending = accept(&mut session, "hello");
        assert!(*observer.loading.borrow_and_update());
        assert_eq!(observer.messages.borrow_and_update().len(), 2);

        session.complete(pending, Ok("hi".into())).unwrap();
        assert!(!*observer.loading.borrow_and_update());
        assert_eq!(observer.messages.borrow_and_update().len(), 3);
    }

    #[tokio::test]
    async fn handle_runs_a_full_turn() {
        let gateway = Arc::new(ScriptedGateway::new(vec![Ok("hi there".into())]));
        let handle = SessionHandle::new(session(), gateway.clone());

        let outcome = handle.submit("hello").await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Replied(ref m) if m.text == "hi there"));
        assert_eq!(handle.view().await.messages.len(), 3);
        assert_eq!(gateway.calls(), 1);
    }

    #[tokio::test]
    async fn handle_ignores_empty_input_without_calling() {
        let gateway = Arc::new(ScriptedGateway::new(vec![]));
        let handle = SessionHandle::new(session(), gateway.clone());

        let outcome = handle.submit("").await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Ignored(IgnoredReason::Blank));
        assert_eq!(handle.view().await.messages.len(), 1);
        assert_eq!(gateway.calls(), 0);
    }

    #[tokio::test]
    async fn rapid_second_submit_is_dropped() {
        let gateway = Arc::new(ScriptedGateway::gated(vec![Ok("reply to a".into())]));
        let handle = SessionHandle::new(session(), gateway.clone());

        let first = tokio::spawn({
            let handle = handle.clone();
            async move { handle.submit("a").await }
        });
        gateway.wait_for_call().await;

        let second = handle.submit("b").await.unwrap();
        assert_eq!(second, SubmitOutcome::Ignored(IgnoredReason::Busy));
        assert!(handle.view().await.is_loading);

        gateway.release();
        let first = first.await.unwrap().unwrap();
        assert!(matches!(first, SubmitOutcome::Replied(ref m) if m.text == "reply to a"));

        let view = handle.view().await;
        let texts: Vec<&str> = view.messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts[1..], ["a", "reply to a"]);
        assert!(!view.is_loading);
        assert_eq!(gateway.calls(), 1);
    }

    #[tokio::test]
    async fn dropped_caller_still_completes_the_turn() {
        let gateway = Arc::new(ScriptedGateway::gated(vec![Ok("reply to a".into())]));
        let handle = SessionHandle::new(session(), gateway.clone());
        let mut observer = handle.subscribe().await;

        let caller = tokio::spawn({
            let handle = handle.clone();
            async move { handle.submit("a").await }
        });
        gateway.wait_for_call().await;
        caller.abort();
        assert!(caller.await.unwrap_err().is_cancelled());

        gateway.release();
        tokio::time::timeout(
            std::time::Duration::from_secs(5),
            observer.loading.wait_for(|loading| !*loading),
        )
        .await
        .expect("turn never finished")
        .unwrap();

        let view = handle.view().await;
        assert_eq!(view.messages.len(), 3);
        assert_eq!(view.messages[2].text, "reply to a");
        assert!(!view.is_loading);

        gateway.release();
        let next = handle.submit("b").await.unwrap();
        assert!(!matches!(next, SubmitOutcome::Ignored(_)));
    }

    #[tokio::test]
    async fn missing_credential_on_first_submit() {
        let backend = Arc::new(ScriptedBackend::unconfigured());
        let gateway = Arc::new(RelayGateway::new(backend.clone(), Locale::English.phrases()));
        let handle = SessionHandle::new(session(), gateway);

        let outcome = handle.submit("hello").await.unwrap();
        let SubmitOutcome::Replied(reply) = outcome else { panic!("expected a reply") };
        assert_eq!(reply.text, Locale::English.phrases().missing_credential);
        assert!(reply.is_error);
        assert_eq!(backend.calls(), 0);
    }
}
