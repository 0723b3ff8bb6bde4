//! Conversation session controller
//!
//! `ChatSession` owns the conversation log and the flags the UI renders.
//! Intents (`send_message`, `clear_messages`, `retry_last_message`,
//! `set_persona`) mutate state immediately; backend calls run on spawned
//! tasks and report back as [`SessionEvent`]s, which the owner feeds to
//! [`ChatSession::apply`]. Every state change therefore happens on the task
//! that owns the session.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{GatewayError, SendFailure};
use crate::gateway::{ChatBackend, ChatReply};
use crate::health::{HealthMonitor, Readiness};
use crate::persona::Persona;
use crate::scheduler::DelayedTask;
use crate::state::{history_of, now_timestamp, ChatMessage, ChatRole, HistoryEntry, SessionState};

/// Settlement of a backend call, delivered back to the session.
#[derive(Debug)]
pub enum SessionEvent {
    ChatSettled(Result<ChatReply, GatewayError>),
    ProbeSettled(Result<(), GatewayError>),
}

pub struct ChatSession {
    backend: Arc<dyn ChatBackend>,
    state: SessionState,
    health: HealthMonitor,
    probe: Option<DelayedTask>,
    chat_task: Option<JoinHandle<()>>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    closed: bool,
}

impl ChatSession {
    /// Creates an empty session and fires the first health probe.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(backend: Arc<dyn ChatBackend>, persona: Persona) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut session = Self {
            backend,
            state: SessionState {
                persona,
                ..SessionState::default()
            },
            health: HealthMonitor::new(),
            probe: None,
            chat_task: None,
            events_tx,
            events_rx,
            closed: false,
        };
        session.schedule_probe(Duration::ZERO);
        session
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.state.messages
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading
    }

    pub fn backend_ready(&self) -> bool {
        self.state.backend_ready
    }

    pub fn persona(&self) -> Persona {
        self.state.persona
    }

    pub fn last_error(&self) -> Option<&str> {
        self.state.last_error.as_deref()
    }

    pub fn pending_input(&self) -> &str {
        &self.state.pending_input
    }

    pub fn readiness(&self) -> Readiness {
        self.health.state()
    }

    pub fn is_shut_down(&self) -> bool {
        self.closed
    }

    /// Sends `text` as a new user message.
    ///
    /// Returns `false` without touching state when the text is blank, a send
    /// is already in flight, or the session has been shut down.
    pub fn send_message(&mut self, text: &str) -> bool {
        let content = text.trim();
        if content.is_empty() || self.state.is_loading || self.closed {
            return false;
        }

        // History is the log as it was before this message is appended.
        let history = history_of(&self.state.messages);
        self.state.messages.push(ChatMessage::user(content));
        self.dispatch(text.to_string(), history);
        true
    }

    pub fn clear_messages(&mut self) {
        self.state.messages.clear();
        self.state.last_error = None;
    }

    /// Replaces the reply to the last user message with a fresh one.
    ///
    /// Only applies when the log ends with a user message followed by an
    /// assistant entry and nothing is in flight; otherwise a no-op.
    pub fn retry_last_message(&mut self) -> bool {
        if self.state.is_loading || self.closed {
            return false;
        }

        let len = self.state.messages.len();
        if len < 2 {
            return false;
        }
        let user_idx = len - 2;
        if self.state.messages[user_idx].role != ChatRole::User
            || self.state.messages[len - 1].role != ChatRole::Assistant
        {
            return false;
        }

        self.state.messages.pop();
        let content = self.state.messages[user_idx].content.clone();
        let history = history_of(&self.state.messages[..user_idx]);
        debug!(chars = content.len(), "retrying last message");
        self.dispatch(content, history);
        true
    }

    /// Takes effect for the next send; a send already in flight keeps the
    /// persona it was dispatched with.
    pub fn set_persona(&mut self, persona: Persona) {
        if self.state.persona != persona {
            info!(from = %self.state.persona, to = %persona, "persona changed");
        }
        self.state.persona = persona;
    }

    pub fn set_pending_input(&mut self, text: impl Into<String>) {
        self.state.pending_input = text.into();
    }

    pub fn pending_input_mut(&mut self) -> &mut String {
        &mut self.state.pending_input
    }

    /// Sends the pending input, clearing it if the send was accepted.
    pub fn submit_pending_input(&mut self) -> bool {
        let text = self.state.pending_input.clone();
        let sent = self.send_message(&text);
        if sent {
            self.state.pending_input.clear();
        }
        sent
    }

    /// Waits for the next backend settlement. Cancel-safe.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events_rx.recv().await
    }

    /// Applies every settlement that has already arrived; returns how many.
    pub fn drain_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    /// Processes events until no send is in flight.
    pub async fn settle(&mut self) {
        while self.state.is_loading && !self.closed {
            match self.events_rx.recv().await {
                Some(event) => self.apply(event),
                None => break,
            }
        }
    }

    /// Processes events until the backend reports healthy or `timeout`
    /// elapses. Returns the readiness flag.
    pub async fn wait_until_ready(&mut self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while !self.state.backend_ready && !self.closed {
            match tokio::time::timeout_at(deadline, self.events_rx.recv()).await {
                Ok(Some(event)) => self.apply(event),
                Ok(None) | Err(_) => break,
            }
        }
        self.state.backend_ready
    }

    pub fn apply(&mut self, event: SessionEvent) {
        if self.closed {
            debug!(?event, "session shut down, dropping event");
            return;
        }

        match event {
            SessionEvent::ChatSettled(result) => self.finish_send(result),
            SessionEvent::ProbeSettled(Ok(())) => {
                self.health.record_success();
                self.state.backend_ready = true;
                self.probe = None;
                info!("backend is ready");
            }
            SessionEvent::ProbeSettled(Err(err)) => {
                if let Some(delay) = self.health.record_failure() {
                    let retry_in_ms = delay.as_millis() as u64;
                    warn!(error = %err, retry_in_ms, "health check failed");
                    self.schedule_probe(delay);
                }
            }
        }
    }

    /// Cancels the pending probe and any in-flight request. Events that
    /// arrive afterwards are ignored.
    pub fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Some(probe) = self.probe.take() {
            probe.cancel();
        }
        if let Some(task) = self.chat_task.take() {
            task.abort();
            debug!("aborted in-flight chat request");
        }
        self.state.is_loading = false;
    }

    fn dispatch(&mut self, message: String, history: Vec<HistoryEntry>) {
        let persona = self.state.persona;
        self.state.is_loading = true;
        self.state.last_error = None;

        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        info!(%persona, history_len = history.len(), "sending message");

        self.chat_task = Some(tokio::spawn(async move {
            let result = backend.send_chat_message(&message, &history, persona).await;
            let _ = tx.send(SessionEvent::ChatSettled(result));
        }));
    }

    fn finish_send(&mut self, result: Result<ChatReply, GatewayError>) {
        if !self.state.is_loading {
            warn!("chat settlement with no send in flight");
            return;
        }
        self.chat_task = None;
        self.state.is_loading = false;

        match result {
            Ok(reply) => {
                let timestamp = reply.timestamp.unwrap_or_else(now_timestamp);
                self.state
                    .messages
                    .push(ChatMessage::assistant(reply.response, reply.safety, timestamp));
            }
            Err(err) => {
                error!(error = %err, "failed to send message");
                let text = SendFailure::classify(&err).to_string();
                self.state.messages.push(ChatMessage::error(text.clone()));
                self.state.last_error = Some(text);
            }
        }
    }

    fn schedule_probe(&mut self, delay: Duration) {
        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        self.probe = Some(DelayedTask::spawn(delay, async move {
            let result = backend.health_check().await;
            let _ = tx.send(SessionEvent::ProbeSettled(result));
        }));
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}
