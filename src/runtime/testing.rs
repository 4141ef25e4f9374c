//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use crate::api::{
    ApiError, HistoryResponse, SendMessageRequest, SendMessageResponse, SessionGrant,
};
use crate::error::TemplateError;
use crate::format::RenderedMessage;
use crate::identity::PlayerId;
use crate::state_machine::{BubbleId, Connection, Status};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

// ============================================================================
// Journal
// ============================================================================

/// Ordered record of backend calls and view updates, shared between mocks
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Index of the first entry starting with `prefix`
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.entries().iter().position(|e| e.starts_with(prefix))
    }
}

// ============================================================================
// Mock Backend
// ============================================================================

/// Mock backend that returns queued responses
#[derive(Default)]
pub struct MockBackend {
    sessions: Mutex<VecDeque<Result<SessionGrant, ApiError>>>,
    histories: Mutex<VecDeque<Result<HistoryResponse, ApiError>>>,
    sends: Mutex<VecDeque<Result<SendMessageResponse, ApiError>>>,
    session_requests: Mutex<Vec<PlayerId>>,
    send_requests: Mutex<Vec<SendMessageRequest>>,
    journal: Journal,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal,
            ..Self::default()
        }
    }

    pub fn queue_session(&self, grant: Result<SessionGrant, ApiError>) {
        self.sessions.lock().unwrap().push_back(grant);
    }

    pub fn queue_history(&self, history: Result<HistoryResponse, ApiError>) {
        self.histories.lock().unwrap().push_back(history);
    }

    pub fn queue_send(&self, response: Result<SendMessageResponse, ApiError>) {
        self.sends.lock().unwrap().push_back(response);
    }

    pub fn session_requests(&self) -> Vec<PlayerId> {
        self.session_requests.lock().unwrap().clone()
    }

    pub fn send_requests(&self) -> Vec<SendMessageRequest> {
        self.send_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn create_session(&self, player: &PlayerId) -> Result<SessionGrant, ApiError> {
        self.journal.record(format!("backend:session:{player}"));
        self.session_requests.lock().unwrap().push(player.clone());
        self.sessions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::network("No mock session queued")))
    }

    async fn fetch_history(&self, session_token: &str) -> Result<HistoryResponse, ApiError> {
        self.journal.record(format!("backend:history:{session_token}"));
        self.histories
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::network("No mock history queued")))
    }

    async fn send_message(
        &self,
        request: &SendMessageRequest,
    ) -> Result<SendMessageResponse, ApiError> {
        self.journal.record(format!("backend:send:{}", request.message));
        self.send_requests.lock().unwrap().push(request.clone());
        self.sends
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::network("No mock send queued")))
    }
}

// ============================================================================
// Recording View
// ============================================================================

/// In-memory view that keeps the log as a list of bubbles
#[derive(Debug, Default)]
pub struct RecordingView {
    pub log: Vec<(BubbleId, RenderedMessage)>,
    pub connection: Option<Connection>,
    pub locked: Option<bool>,
    pub status: Option<Status>,
    pub input_clears: usize,
    /// Simulate a page whose message template is missing
    pub template_missing: bool,
    journal: Journal,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal,
            ..Self::default()
        }
    }

    pub fn contents(&self) -> Vec<String> {
        self.log.iter().map(|(_, m)| m.html.clone()).collect()
    }
}

impl ChatView for RecordingView {
    fn set_connection(&mut self, connection: Connection) {
        self.journal.record(format!("view:connection:{}", connection.label()));
        self.connection = Some(connection);
    }

    fn set_input_locked(&mut self, locked: bool) {
        self.journal.record(format!("view:locked:{locked}"));
        self.locked = Some(locked);
    }

    fn set_status(&mut self, status: Option<&Status>) {
        self.journal.record(format!(
            "view:status:{}",
            status.map(ToString::to_string).unwrap_or_default()
        ));
        self.status = status.cloned();
    }

    fn clear_log(&mut self) {
        self.journal.record("view:clear_log");
        self.log.clear();
    }

    fn append(
        &mut self,
        bubble: &BubbleId,
        message: &RenderedMessage,
    ) -> Result<(), TemplateError> {
        if self.template_missing {
            return Err(TemplateError::MissingTemplate);
        }
        self.journal.record(format!(
            "view:append:{}:{}",
            message.sender.as_str(),
            message.html
        ));
        self.log.push((bubble.clone(), message.clone()));
        Ok(())
    }

    fn replace(
        &mut self,
        bubble: &BubbleId,
        message: &RenderedMessage,
    ) -> Result<(), TemplateError> {
        let slot = self
            .log
            .iter_mut()
            .find(|(id, _)| id == bubble)
            .ok_or_else(|| TemplateError::MissingBubble(bubble.to_string()))?;
        self.journal.record(format!("view:replace:{}", message.html));
        slot.1 = message.clone();
        Ok(())
    }

    fn remove(&mut self, bubble: &BubbleId) {
        self.journal.record("view:remove");
        self.log.retain(|(id, _)| id != bubble);
    }

    fn clear_input(&mut self) {
        self.journal.record("view:clear_input");
        self.input_clears += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::WireMessage;
    use crate::error::{ChatError, SessionError};
    use crate::message::Sender;
    use crate::runtime::{ConversationController, SubmitOutcome};
    use crate::session::{MemorySlotStorage, SessionStore, SESSION_SLOT_KEY};
    use crate::session::SlotStorage;
    use crate::state_machine::{ChatContext, Delivery};
    use chrono::{Duration, Utc};
    use reqwest::Url;

    type TestController = ConversationController<Arc<MockBackend>, MemorySlotStorage, RecordingView>;

    const PLAYER: &str = "5511988887777";

    fn page(query: &str) -> Url {
        Url::parse(&format!("https://chat.example.com/{query}")).unwrap()
    }

    fn grant(player: &str) -> SessionGrant {
        SessionGrant {
            player: Some(player.to_string()),
            session_token: Some("tok-1".to_string()),
            expires_at: Some((Utc::now() + Duration::hours(2)).to_rfc3339()),
        }
    }

    fn wire(sender: Sender, content: &str) -> WireMessage {
        WireMessage {
            id: None,
            sender,
            content: content.to_string(),
            created_at: Some("2024-05-01T12:00:00+00:00".to_string()),
        }
    }

    fn history(messages: Vec<WireMessage>, is_active: bool) -> HistoryResponse {
        HistoryResponse {
            messages,
            is_active,
        }
    }

    struct Harness {
        backend: Arc<MockBackend>,
        journal: Journal,
        controller: TestController,
    }

    fn harness() -> Harness {
        harness_with(SessionStore::new(MemorySlotStorage::new()), RecordingView::new())
    }

    fn harness_with(sessions: SessionStore<MemorySlotStorage>, view: RecordingView) -> Harness {
        let journal = Journal::default();
        let backend = Arc::new(MockBackend::with_journal(journal.clone()));
        let view = RecordingView {
            journal: journal.clone(),
            ..view
        };
        let controller =
            ConversationController::new(ChatContext::new(700), backend.clone(), sessions, view);
        Harness {
            backend,
            journal,
            controller,
        }
    }

    /// Bootstrap against an active, empty conversation
    async fn online_harness() -> Harness {
        let mut h = harness();
        h.backend.queue_session(Ok(grant(PLAYER)));
        h.backend.queue_history(Ok(history(vec![], true)));
        let mut url = page(&format!("?player={PLAYER}"));
        h.controller.bootstrap(&mut url).await.unwrap();
        h
    }

    #[tokio::test]
    async fn bootstrap_generates_and_persists_player() {
        let mut h = harness();
        h.backend.queue_session(Ok(SessionGrant {
            player: None,
            ..grant(PLAYER)
        }));
        h.backend.queue_history(Ok(history(vec![], true)));

        let mut url = page("?utm=ad");
        let player = h.controller.bootstrap(&mut url).await.unwrap();

        assert!(PlayerId::parse(player.as_str()).is_ok());
        assert_eq!(crate::identity::resolve(&url), Some(player.clone()));
        assert_eq!(h.backend.session_requests(), vec![player]);
        assert_eq!(h.controller.state().connection, Connection::Online);
        assert!(!h.controller.state().locked);
        assert_eq!(h.controller.view().locked, Some(false));
    }

    #[tokio::test]
    async fn bootstrap_reuses_cached_session() {
        let storage = MemorySlotStorage::new();
        storage
            .set(
                SESSION_SLOT_KEY,
                &serde_json::json!({
                    "player": PLAYER,
                    "session_token": "cached",
                    "expires_at": (Utc::now() + Duration::hours(1)).to_rfc3339(),
                })
                .to_string(),
            )
            .unwrap();
        let mut h = harness_with(SessionStore::new(storage), RecordingView::new());
        h.backend.queue_history(Ok(history(vec![], true)));

        let mut url = page(&format!("?player={PLAYER}"));
        h.controller.bootstrap(&mut url).await.unwrap();

        assert!(h.backend.session_requests().is_empty());
        assert!(h.journal.entries().contains(&"backend:history:cached".to_string()));
    }

    #[tokio::test]
    async fn session_failure_is_terminal() {
        let mut h = harness();
        h.backend.queue_session(Err(ApiError::status(503, "down")));

        let mut url = page(&format!("?player={PLAYER}"));
        let err = h.controller.bootstrap(&mut url).await.unwrap_err();

        assert!(matches!(err, ChatError::Session(SessionError::Issuance(_))));
        let state = h.controller.state();
        assert_eq!(state.connection, Connection::Offline);
        assert!(state.locked);
        assert_eq!(h.controller.view().status, Some(Status::BootstrapFailed));
        assert_eq!(h.controller.view().connection, Some(Connection::Offline));

        // No automatic retry, and the locked input refuses submissions.
        assert!(h.controller.submit("hello").await.is_err());
        assert_eq!(h.backend.session_requests().len(), 1);
        assert!(h.backend.send_requests().is_empty());
    }

    #[tokio::test]
    async fn inactive_history_renders_in_order_and_ends() {
        let mut h = harness();
        h.backend.queue_session(Ok(grant(PLAYER)));
        h.backend.queue_history(Ok(history(
            vec![
                wire(Sender::Player, "oi"),
                wire(Sender::Valezap, "*olá*"),
                wire(Sender::Player, "tchau"),
            ],
            false,
        )));

        let mut url = page("");
        h.controller.bootstrap(&mut url).await.unwrap();

        let view = h.controller.view();
        assert_eq!(view.contents(), vec!["oi", "<strong>olá</strong>", "tchau"]);
        assert_eq!(view.log[1].1.sender, Sender::Valezap);
        assert!(h.controller.state().ended);
        assert!(h.controller.state().locked);
        assert_eq!(view.locked, Some(true));

        for _ in 0..3 {
            h.controller.input_changed().await.unwrap();
            let outcome = h.controller.submit("still there?").await.unwrap();
            assert_eq!(
                outcome,
                SubmitOutcome::Rejected {
                    status: Some(Status::Ended)
                }
            );
            assert!(h.controller.state().locked);
        }
        assert!(h.backend.send_requests().is_empty());
    }

    #[tokio::test]
    async fn history_failure_keeps_page_usable() {
        let mut h = harness();
        h.backend.queue_session(Ok(grant(PLAYER)));
        h.backend.queue_history(Err(ApiError::status(404, "missing")));

        let mut url = page("");
        h.controller.bootstrap(&mut url).await.unwrap();

        assert_eq!(h.controller.state().connection, Connection::Online);
        assert!(!h.controller.state().locked);
        assert_eq!(h.controller.view().status, Some(Status::HistoryUnavailable));
        assert!(h.controller.view().log.is_empty());
    }

    #[tokio::test]
    async fn delivered_message_shows_before_request() {
        let mut h = online_harness().await;
        h.backend.queue_send(Ok(SendMessageResponse {
            player_message: Some(wire(Sender::Player, "hello")),
            valezap_message: None,
            ended: false,
        }));

        let outcome = h.controller.submit("hello").await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Delivered { ended: false });

        let shown = h.journal.position("view:append:player:hello").unwrap();
        let sent = h.journal.position("backend:send:hello").unwrap();
        assert!(shown < sent, "optimistic bubble must precede the request");

        let view = h.controller.view();
        assert_eq!(view.contents(), vec!["hello"]);
        assert_eq!(view.log[0].1.sender, Sender::Player);
        assert_eq!(view.status, Some(Status::Delivered));
        assert_eq!(view.locked, Some(false));
        assert_eq!(view.input_clears, 1);

        let request = &h.backend.send_requests()[0];
        assert_eq!(request.session_token, "tok-1");
        assert_eq!(request.player, PLAYER);
        assert_eq!(request.message, "hello");
    }

    #[tokio::test]
    async fn server_echo_replaces_optimistic_content() {
        let mut h = online_harness().await;
        h.backend.queue_send(Ok(SendMessageResponse {
            player_message: Some(wire(Sender::Player, "hello, normalised")),
            valezap_message: Some(wire(Sender::Valezap, "hi there")),
            ended: false,
        }));

        h.controller.submit("hello").await.unwrap();

        let view = h.controller.view();
        assert_eq!(view.contents(), vec!["hello, normalised", "hi there"]);
        let outgoing = h.controller.state().outgoing.as_ref().unwrap();
        assert!(matches!(outgoing.delivery, Delivery::Confirmed { created_at: Some(_) }));
    }

    #[tokio::test]
    async fn oversize_message_never_reaches_network() {
        let mut h = online_harness().await;

        let outcome = h.controller.submit(&"a".repeat(701)).await.unwrap();

        assert_eq!(
            outcome,
            SubmitOutcome::Rejected {
                status: Some(Status::TooLong { max: 700 })
            }
        );
        assert!(h.backend.send_requests().is_empty());
        assert!(h.controller.view().log.is_empty());
        assert_eq!(h.controller.view().input_clears, 0);
        assert!(!h.controller.state().locked);
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let mut h = online_harness().await;
        let outcome = h.controller.submit("  \n ").await.unwrap();
        assert_eq!(
            outcome,
            SubmitOutcome::Rejected {
                status: Some(Status::EmptyMessage)
            }
        );

        // Typing again clears the status line.
        h.controller.input_changed().await.unwrap();
        assert_eq!(h.controller.view().status, None);
    }

    #[tokio::test]
    async fn network_failure_rolls_back_bubble() {
        let mut h = online_harness().await;
        h.backend.queue_send(Err(ApiError::network("timeout")));

        let err = h.controller.submit("hello").await.unwrap_err();

        assert!(matches!(err, ChatError::Send(ref e) if e.reason == "timeout"));
        let view = h.controller.view();
        assert!(view.log.is_empty());
        assert_eq!(view.status, Some(Status::SendFailed));
        assert_eq!(view.locked, Some(false));
        assert!(!h.controller.state().locked);
        assert!(h.journal.position("view:append:player:hello").unwrap() < h.journal.position("view:remove").unwrap());

        // The player may resubmit manually.
        h.backend.queue_send(Ok(SendMessageResponse::default()));
        let outcome = h.controller.submit("hello").await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Delivered { ended: false });
        assert_eq!(h.controller.view().contents(), vec!["hello"]);
    }

    #[tokio::test]
    async fn http_error_status_rolls_back_bubble() {
        let mut h = online_harness().await;
        h.backend.queue_send(Err(ApiError::status(409, "Sessao encerrada")));

        assert!(h.controller.submit("hello").await.is_err());
        assert!(h.controller.view().log.is_empty());
        assert!(!h.controller.state().locked);
    }

    #[tokio::test]
    async fn ending_reply_locks_permanently() {
        let mut h = online_harness().await;
        h.backend.queue_send(Ok(SendMessageResponse {
            player_message: Some(wire(Sender::Player, "bye")),
            valezap_message: Some(wire(Sender::Valezap, "Fim da interação")),
            ended: true,
        }));

        let outcome = h.controller.submit("bye").await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Delivered { ended: true });
        assert!(h.controller.state().ended);
        assert_eq!(h.controller.view().locked, Some(true));
        assert_eq!(h.controller.view().status, Some(Status::Ended));

        let again = h.controller.submit("hello?").await.unwrap();
        assert!(matches!(again, SubmitOutcome::Rejected { .. }));
        assert_eq!(h.backend.send_requests().len(), 1);
    }

    #[tokio::test]
    async fn missing_template_is_fatal() {
        let view = RecordingView {
            template_missing: true,
            ..RecordingView::new()
        };
        let mut h = harness_with(SessionStore::new(MemorySlotStorage::new()), view);
        h.backend.queue_session(Ok(grant(PLAYER)));
        h.backend
            .queue_history(Ok(history(vec![wire(Sender::Valezap, "oi")], true)));

        let mut url = page("");
        let err = h.controller.bootstrap(&mut url).await.unwrap_err();
        assert!(matches!(err, ChatError::Template(TemplateError::MissingTemplate)));
    }
}
