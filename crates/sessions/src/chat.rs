//! Follow-up chat on a processed session
//!
//! Keeps the local message log, the artifact registry derived from tool
//! calls, and the per-session error state. One message may be in flight
//! at a time; sends issued while a reply is pending are rejected rather
//! than queued. Switching sessions is a purely local reset.

use agent_client::{ChatResponse, ToolCallRecord};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::artifacts::{extract_artifacts, ArtifactRegistry};
use crate::gateway::Gateway;

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl std::str::FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            _ => Err(format!("Unknown message role: {}", s)),
        }
    }
}

/// One entry in the chat log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRecord>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCallRecord>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            tool_calls,
        }
    }
}

/// How a send request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The reply was received and appended to the log
    Delivered,
    /// The remote call failed; the optimistic user message stays
    Failed,
    /// Empty or whitespace-only input, nothing was sent
    Empty,
    /// A previous send is still waiting for its reply
    Busy,
    /// No session is bound to this chat
    NoSession,
    /// The reply arrived after a reset or session switch and was dropped
    Discarded,
}

impl SendOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, SendOutcome::Delivered)
    }

    /// The message was dropped before any network call
    pub fn was_rejected(&self) -> bool {
        matches!(
            self,
            SendOutcome::Empty | SendOutcome::Busy | SendOutcome::NoSession
        )
    }
}

#[derive(Debug, Default)]
struct ChatState {
    session_id: Option<String>,
    messages: Vec<ChatMessage>,
    registry: ArtifactRegistry,
    in_flight: bool,
    error: Option<String>,
    /// Bumped on every session switch and successful clear; replies
    /// carrying an older epoch are dropped.
    epoch: u64,
}

/// Chat attached to one agent session
///
/// State lives behind a mutex that is never held across a gateway call,
/// so session switches can happen while a reply is pending.
pub struct ChatSession<G: Gateway> {
    gateway: G,
    state: Mutex<ChatState>,
}

impl<G: Gateway> ChatSession<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            state: Mutex::new(ChatState::default()),
        }
    }

    pub fn for_session(gateway: G, session_id: impl Into<String>) -> Self {
        Self {
            gateway,
            state: Mutex::new(ChatState {
                session_id: Some(session_id.into()),
                ..ChatState::default()
            }),
        }
    }

    pub async fn session_id(&self) -> Option<String> {
        self.state.lock().await.session_id.clone()
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.state.lock().await.messages.clone()
    }

    pub async fn message_count(&self) -> usize {
        self.state.lock().await.messages.len()
    }

    /// Artifact references collected from tool calls, oldest first
    pub async fn artifacts(&self) -> Vec<String> {
        self.state.lock().await.registry.entries().to_vec()
    }

    pub async fn error(&self) -> Option<String> {
        self.state.lock().await.error.clone()
    }

    pub async fn is_in_flight(&self) -> bool {
        self.state.lock().await.in_flight
    }

    /// Bind the chat to a session. Switching to a different id clears
    /// the local log, registry, and error without touching the backend;
    /// rebinding the same id keeps them. Returns whether a switch
    /// happened.
    pub async fn set_session(&self, session_id: &str) -> bool {
        let mut state = self.state.lock().await;
        if state.session_id.as_deref() == Some(session_id) {
            return false;
        }
        debug!("Switching chat to session {}", session_id);
        state.epoch += 1;
        state.session_id = Some(session_id.to_string());
        state.messages.clear();
        state.registry.clear();
        state.error = None;
        state.in_flight = false;
        true
    }

    /// Send one user message and append the agent's reply.
    ///
    /// The user message is appended optimistically before the call goes
    /// out; on failure it stays in the log and the error lands in the
    /// session error state. An error embedded in an otherwise successful
    /// reply is surfaced the same way without discarding the reply.
    pub async fn send_message(&self, text: &str) -> SendOutcome {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            debug!("Ignoring empty chat message");
            return SendOutcome::Empty;
        }

        let (session_id, issued) = {
            let mut state = self.state.lock().await;
            let session_id = match &state.session_id {
                Some(id) => id.clone(),
                None => {
                    debug!("Ignoring chat message with no session bound");
                    return SendOutcome::NoSession;
                }
            };
            if state.in_flight {
                debug!("Rejecting chat message while a reply is pending");
                return SendOutcome::Busy;
            }
            state.in_flight = true;
            state.messages.push(ChatMessage::user(trimmed));
            (session_id, state.epoch)
        };

        match self.gateway.send_chat(&session_id, trimmed).await {
            Ok(response) => {
                let ChatResponse {
                    response: reply,
                    tool_calls,
                    error,
                    ..
                } = response;

                let mut extracted = Vec::new();
                for call in &tool_calls {
                    extracted.extend(extract_artifacts(&call.result));
                }

                let mut state = self.state.lock().await;
                if state.epoch != issued {
                    debug!("Discarding chat reply for superseded session");
                    return SendOutcome::Discarded;
                }
                state.in_flight = false;
                let added = state.registry.merge(extracted);
                if added > 0 {
                    debug!("Collected {} new artifact(s)", added);
                }
                state.error = error;
                state.messages.push(ChatMessage::assistant(reply, tool_calls));
                SendOutcome::Delivered
            }
            Err(e) => {
                let mut state = self.state.lock().await;
                if state.epoch != issued {
                    debug!("Discarding chat failure for superseded session");
                    return SendOutcome::Discarded;
                }
                state.in_flight = false;
                warn!("Failed to send chat message: {}", e);
                state.error = Some(format!("Failed to send message: {}", e));
                SendOutcome::Failed
            }
        }
    }

    /// Clear the conversation on the backend, then locally.
    ///
    /// The local log, registry, and error survive untouched when the
    /// remote call fails. A successful clear bumps the epoch, so a reply
    /// still in flight is dropped instead of landing in the emptied log.
    pub async fn clear_history(&self) -> bool {
        let (session_id, issued) = {
            let state = self.state.lock().await;
            match &state.session_id {
                Some(id) => (id.clone(), state.epoch),
                None => return false,
            }
        };

        match self.gateway.clear_chat_history(&session_id).await {
            Ok(_) => {
                let mut state = self.state.lock().await;
                if state.epoch != issued {
                    debug!("Discarding clear acknowledgement for superseded session");
                    return false;
                }
                state.epoch += 1;
                state.messages.clear();
                state.registry.clear();
                state.error = None;
                state.in_flight = false;
                true
            }
            Err(e) => {
                let mut state = self.state.lock().await;
                if state.epoch != issued {
                    return false;
                }
                warn!("Failed to clear chat history: {}", e);
                state.error = Some(format!("Failed to clear history: {}", e));
                false
            }
        }
    }

    /// Replace the local log with the backend's record of the session.
    ///
    /// Entries with an unknown role are skipped rather than failing the
    /// whole hydration. The registry is rebuilt from the fetched tool
    /// calls.
    pub async fn hydrate_history(&self) -> bool {
        let (session_id, issued) = {
            let state = self.state.lock().await;
            match &state.session_id {
                Some(id) => (id.clone(), state.epoch),
                None => return false,
            }
        };

        let response = match self.gateway.get_chat_history(&session_id).await {
            Ok(response) => response,
            Err(e) => {
                let mut state = self.state.lock().await;
                if state.epoch == issued {
                    warn!("Failed to fetch chat history for {}: {}", session_id, e);
                    state.error = Some(format!("Failed to fetch chat history: {}", e));
                }
                return false;
            }
        };

        let mut messages = Vec::with_capacity(response.history.len());
        for entry in response.history {
            match entry.role.parse::<MessageRole>() {
                Ok(role) => messages.push(ChatMessage {
                    role,
                    content: entry.content,
                    tool_calls: entry.tool_calls,
                }),
                Err(e) => warn!("Skipping chat history entry: {}", e),
            }
        }
        let registry = ArtifactRegistry::from_results(
            messages
                .iter()
                .flat_map(|message| message.tool_calls.iter())
                .map(|call| call.result.as_str()),
        );

        let mut state = self.state.lock().await;
        if state.epoch != issued {
            debug!("Discarding chat history for superseded session");
            return false;
        }
        state.messages = messages;
        state.registry = registry;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::*;
    use agent_client::{ChatHistoryEntry, ChatHistoryResponse};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    const REPORT_RESULT: &str = "{'status': 'ok', 'download_url': '/api/download/S1/report.md'}";

    #[test]
    fn test_message_role_round_trip() {
        assert_eq!("user".parse::<MessageRole>(), Ok(MessageRole::User));
        assert_eq!("assistant".parse::<MessageRole>(), Ok(MessageRole::Assistant));
        assert!("system".parse::<MessageRole>().is_err());
        assert_eq!(MessageRole::User.to_string(), "user");
        assert_eq!(MessageRole::Assistant.to_string(), "assistant");
    }

    #[tokio::test]
    async fn test_send_appends_user_then_assistant() {
        let gateway = Arc::new(FakeGateway::new());
        gateway.chats.lock().unwrap().push_back(chat_ok(
            "S1",
            "Here is your report",
            &[REPORT_RESULT],
        ));

        let chat = ChatSession::for_session(gateway, "S1");
        let outcome = chat.send_message("Summarize the schedule").await;

        assert_eq!(outcome, SendOutcome::Delivered);
        let messages = chat.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[0].content, "Summarize the schedule");
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert_eq!(messages[1].content, "Here is your report");
        assert_eq!(
            chat.artifacts().await,
            vec!["/api/download/S1/report.md".to_string()]
        );
        assert_eq!(chat.error().await, None);
        assert!(!chat.is_in_flight().await);
    }

    #[tokio::test]
    async fn test_send_rejects_empty_input() {
        let gateway = Arc::new(FakeGateway::new());
        let chat = ChatSession::for_session(gateway.clone(), "S1");

        assert_eq!(chat.send_message("").await, SendOutcome::Empty);
        assert_eq!(chat.send_message("   \n\t").await, SendOutcome::Empty);
        assert_eq!(gateway.chat_calls.load(Ordering::SeqCst), 0);
        assert!(chat.messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_send_without_session_rejected() {
        let gateway = Arc::new(FakeGateway::new());
        let chat = ChatSession::new(gateway.clone());

        let outcome = chat.send_message("hello").await;
        assert_eq!(outcome, SendOutcome::NoSession);
        assert!(outcome.was_rejected());
        assert_eq!(gateway.chat_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_send_rejected() {
        let gateway = Arc::new(FakeGateway::new());
        let gate = gateway.gate_chats();
        gateway
            .chats
            .lock()
            .unwrap()
            .push_back(chat_ok("S1", "first reply", &[]));

        let chat = Arc::new(ChatSession::for_session(gateway.clone(), "S1"));

        let runner = {
            let chat = chat.clone();
            tokio::spawn(async move { chat.send_message("first").await })
        };

        // Wait until the first send is parked inside the gateway call.
        while gateway.chat_calls.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        assert_eq!(chat.send_message("second").await, SendOutcome::Busy);
        // Only the first message's optimistic append is in the log.
        assert_eq!(chat.message_count().await, 1);

        gate.notify_one();
        assert_eq!(runner.await.unwrap(), SendOutcome::Delivered);
        assert_eq!(chat.message_count().await, 2);

        // The slot is free again once the reply lands.
        gateway
            .chats
            .lock()
            .unwrap()
            .push_back(chat_ok("S1", "third reply", &[]));
        assert_eq!(chat.send_message("third").await, SendOutcome::Delivered);
        assert_eq!(chat.message_count().await, 4);
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_user_message() {
        let gateway = Arc::new(FakeGateway::new());
        gateway
            .chats
            .lock()
            .unwrap()
            .push_back(Err(api_error("agent backend crashed")));

        let chat = ChatSession::for_session(gateway.clone(), "S1");
        assert_eq!(chat.send_message("hello").await, SendOutcome::Failed);

        let messages = chat.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, MessageRole::User);
        assert!(chat
            .error()
            .await
            .unwrap()
            .contains("Failed to send message"));

        // The failure releases the in-flight slot, so a retry works.
        gateway
            .chats
            .lock()
            .unwrap()
            .push_back(chat_ok("S1", "recovered", &[]));
        assert_eq!(chat.send_message("hello again").await, SendOutcome::Delivered);
        assert_eq!(chat.message_count().await, 3);
        assert_eq!(chat.error().await, None);
    }

    #[tokio::test]
    async fn test_embedded_error_surfaces_without_discarding_reply() {
        let gateway = Arc::new(FakeGateway::new());
        gateway.chats.lock().unwrap().push_back(Ok(ChatResponse {
            session_id: "S1".to_string(),
            response: "I could not finish the analysis".to_string(),
            tool_calls: Vec::new(),
            generated_files: Vec::new(),
            error: Some("Max iterations reached".to_string()),
        }));

        let chat = ChatSession::for_session(gateway.clone(), "S1");
        assert_eq!(chat.send_message("analyze").await, SendOutcome::Delivered);

        // The partial reply stays in the log with the error surfaced.
        assert_eq!(chat.message_count().await, 2);
        assert_eq!(chat.error().await, Some("Max iterations reached".to_string()));

        // A later clean reply clears the surfaced error.
        gateway
            .chats
            .lock()
            .unwrap()
            .push_back(chat_ok("S1", "all good", &[]));
        assert_eq!(chat.send_message("try again").await, SendOutcome::Delivered);
        assert_eq!(chat.error().await, None);
    }

    #[tokio::test]
    async fn test_duplicate_artifacts_collapse() {
        let gateway = Arc::new(FakeGateway::new());
        // Two tool calls in one turn produce the same reference.
        gateway.chats.lock().unwrap().push_back(chat_ok(
            "S1",
            "done",
            &[REPORT_RESULT, REPORT_RESULT],
        ));

        let chat = ChatSession::for_session(gateway.clone(), "S1");
        assert_eq!(chat.send_message("make report").await, SendOutcome::Delivered);
        assert_eq!(chat.artifacts().await.len(), 1);

        // A later turn repeating the reference adds nothing; a new one
        // lands after it.
        gateway.chats.lock().unwrap().push_back(chat_ok(
            "S1",
            "done again",
            &[
                REPORT_RESULT,
                "{'download_url': '/api/download/S1/chart.png'}",
            ],
        ));
        assert_eq!(chat.send_message("make chart").await, SendOutcome::Delivered);
        assert_eq!(
            chat.artifacts().await,
            vec![
                "/api/download/S1/report.md".to_string(),
                "/api/download/S1/chart.png".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_registry_matches_rebuild_from_log() {
        let gateway = Arc::new(FakeGateway::new());
        gateway
            .chats
            .lock()
            .unwrap()
            .push_back(chat_ok("S1", "one", &[REPORT_RESULT]));
        gateway.chats.lock().unwrap().push_back(chat_ok(
            "S1",
            "two",
            &["{'download_url': '/api/download/S1/chart.png'}", REPORT_RESULT],
        ));

        let chat = ChatSession::for_session(gateway, "S1");
        chat.send_message("first").await;
        chat.send_message("second").await;

        let messages = chat.messages().await;
        let rebuilt = ArtifactRegistry::from_results(
            messages
                .iter()
                .flat_map(|message| message.tool_calls.iter())
                .map(|call| call.result.as_str()),
        );
        assert_eq!(rebuilt.entries(), chat.artifacts().await.as_slice());
    }

    #[tokio::test]
    async fn test_clear_history_clears_log_registry_and_error() {
        let gateway = Arc::new(FakeGateway::new());
        gateway.chats.lock().unwrap().push_back(Ok(ChatResponse {
            session_id: "S1".to_string(),
            response: "partial".to_string(),
            tool_calls: vec![agent_client::ToolCallRecord {
                tool: "write_report".to_string(),
                args: Default::default(),
                result: REPORT_RESULT.to_string(),
            }],
            generated_files: Vec::new(),
            error: Some("Max iterations reached".to_string()),
        }));
        gateway
            .clears
            .lock()
            .unwrap()
            .push_back(message_ok("History cleared"));

        let chat = ChatSession::for_session(gateway.clone(), "S1");
        chat.send_message("report please").await;
        assert_eq!(chat.message_count().await, 2);
        assert_eq!(chat.artifacts().await.len(), 1);
        assert!(chat.error().await.is_some());

        assert!(chat.clear_history().await);
        assert!(chat.messages().await.is_empty());
        assert!(chat.artifacts().await.is_empty());
        assert_eq!(chat.error().await, None);
        assert_eq!(gateway.clear_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_clear_history_failure_preserves_log() {
        let gateway = Arc::new(FakeGateway::new());
        gateway
            .chats
            .lock()
            .unwrap()
            .push_back(chat_ok("S1", "reply", &[REPORT_RESULT]));
        gateway
            .clears
            .lock()
            .unwrap()
            .push_back(Err(api_error("db locked")));

        let chat = ChatSession::for_session(gateway, "S1");
        chat.send_message("hello").await;

        assert!(!chat.clear_history().await);
        // Remote clear failed, so nothing local is lost.
        assert_eq!(chat.message_count().await, 2);
        assert_eq!(chat.artifacts().await.len(), 1);
        assert!(chat
            .error()
            .await
            .unwrap()
            .contains("Failed to clear history"));
    }

    #[tokio::test]
    async fn test_clear_during_in_flight_send_discards_reply() {
        let gateway = Arc::new(FakeGateway::new());
        let gate = gateway.gate_chats();
        gateway
            .chats
            .lock()
            .unwrap()
            .push_back(chat_ok("S1", "late reply", &[REPORT_RESULT]));
        gateway
            .clears
            .lock()
            .unwrap()
            .push_back(message_ok("History cleared"));

        let chat = Arc::new(ChatSession::for_session(gateway.clone(), "S1"));

        let runner = {
            let chat = chat.clone();
            tokio::spawn(async move { chat.send_message("hello").await })
        };
        while gateway.chat_calls.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        // Clear lands while the reply is still in flight.
        assert!(chat.clear_history().await);
        gate.notify_one();

        assert_eq!(runner.await.unwrap(), SendOutcome::Discarded);
        // The emptied log does not pick the superseded reply back up.
        assert!(chat.messages().await.is_empty());
        assert!(chat.artifacts().await.is_empty());
        assert!(!chat.is_in_flight().await);

        gateway
            .chats
            .lock()
            .unwrap()
            .push_back(chat_ok("S1", "fresh reply", &[]));
        assert_eq!(chat.send_message("again").await, SendOutcome::Delivered);
        assert_eq!(chat.message_count().await, 2);
    }

    #[tokio::test]
    async fn test_switch_session_resets_locally() {
        let gateway = Arc::new(FakeGateway::new());
        gateway
            .chats
            .lock()
            .unwrap()
            .push_back(chat_ok("S1", "reply", &[REPORT_RESULT]));

        let chat = ChatSession::for_session(gateway.clone(), "S1");
        chat.send_message("hello").await;
        assert_eq!(chat.message_count().await, 2);

        assert!(chat.set_session("S2").await);
        assert_eq!(chat.session_id().await, Some("S2".to_string()));
        assert!(chat.messages().await.is_empty());
        assert!(chat.artifacts().await.is_empty());
        assert_eq!(chat.error().await, None);
        // The switch is purely local.
        assert_eq!(gateway.clear_calls.load(Ordering::SeqCst), 0);

        // Rebinding the same session keeps the log.
        gateway
            .chats
            .lock()
            .unwrap()
            .push_back(chat_ok("S2", "reply", &[]));
        chat.send_message("hi").await;
        assert!(!chat.set_session("S2").await);
        assert_eq!(chat.message_count().await, 2);
    }

    #[tokio::test]
    async fn test_late_reply_discarded_after_switch() {
        let gateway = Arc::new(FakeGateway::new());
        let gate = gateway.gate_chats();
        gateway
            .chats
            .lock()
            .unwrap()
            .push_back(chat_ok("S1", "late reply", &[REPORT_RESULT]));

        let chat = Arc::new(ChatSession::for_session(gateway.clone(), "S1"));

        let runner = {
            let chat = chat.clone();
            tokio::spawn(async move { chat.send_message("hello").await })
        };
        while gateway.chat_calls.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        // Switch sessions while the reply is still in flight.
        assert!(chat.set_session("S2").await);
        gate.notify_one();

        assert_eq!(runner.await.unwrap(), SendOutcome::Discarded);
        // Nothing from the old session leaks into the new one.
        assert!(chat.messages().await.is_empty());
        assert!(chat.artifacts().await.is_empty());
        assert!(!chat.is_in_flight().await);

        gateway
            .chats
            .lock()
            .unwrap()
            .push_back(chat_ok("S2", "fresh reply", &[]));
        assert_eq!(chat.send_message("new session").await, SendOutcome::Delivered);
        assert_eq!(chat.message_count().await, 2);
    }

    #[tokio::test]
    async fn test_hydrate_rebuilds_log_and_registry() {
        let gateway = Arc::new(FakeGateway::new());
        gateway
            .histories
            .lock()
            .unwrap()
            .push_back(Ok(ChatHistoryResponse {
                session_id: "S1".to_string(),
                history: vec![
                    ChatHistoryEntry {
                        role: "user".to_string(),
                        content: "Analyze the data".to_string(),
                        tool_calls: Vec::new(),
                    },
                    ChatHistoryEntry {
                        role: "assistant".to_string(),
                        content: "Done".to_string(),
                        tool_calls: vec![agent_client::ToolCallRecord {
                            tool: "write_report".to_string(),
                            args: Default::default(),
                            result: REPORT_RESULT.to_string(),
                        }],
                    },
                    ChatHistoryEntry {
                        role: "system".to_string(),
                        content: "internal prompt".to_string(),
                        tool_calls: Vec::new(),
                    },
                ],
            }));

        let chat = ChatSession::for_session(gateway, "S1");
        assert!(chat.hydrate_history().await);

        // The unknown role was skipped, not fatal.
        let messages = chat.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert_eq!(
            chat.artifacts().await,
            vec!["/api/download/S1/report.md".to_string()]
        );
    }

    #[tokio::test]
    async fn test_hydrate_failure_sets_error() {
        let gateway = Arc::new(FakeGateway::new());
        gateway
            .histories
            .lock()
            .unwrap()
            .push_back(Err(api_error("session not found")));

        let chat = ChatSession::for_session(gateway, "S1");
        assert!(!chat.hydrate_history().await);
        assert!(chat
            .error()
            .await
            .unwrap()
            .contains("Failed to fetch chat history"));
    }
}
