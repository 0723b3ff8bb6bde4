#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use singlish_chat::{ChatBackend, ChatReply, GatewayError, HistoryEntry, Persona, Safety};

/// A chat request as the backend saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub message: String,
    pub history: Vec<HistoryEntry>,
    pub persona: Persona,
}

/// In-memory backend that replays queued results and records every call.
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<ChatReply, GatewayError>>>,
    probes: Mutex<VecDeque<Result<(), GatewayError>>>,
    probe_fallback: Result<(), GatewayError>,
    reply_delay: Duration,
    requests: Mutex<Vec<RecordedRequest>>,
    probe_times: Mutex<Vec<Instant>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedBackend {
    /// Health checks always succeed.
    pub fn healthy() -> Self {
        Self::with_probe_fallback(Ok(()))
    }

    /// Health checks fail until a queued success says otherwise.
    pub fn unhealthy() -> Self {
        Self::with_probe_fallback(Err(GatewayError::Network("connection refused".into())))
    }

    fn with_probe_fallback(probe_fallback: Result<(), GatewayError>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            probes: Mutex::new(VecDeque::new()),
            probe_fallback,
            reply_delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
            probe_times: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn reply(self, result: Result<ChatReply, GatewayError>) -> Self {
        self.replies.lock().unwrap().push_back(result);
        self
    }

    pub fn probe(self, result: Result<(), GatewayError>) -> Self {
        self.probes.lock().unwrap().push_back(result);
        self
    }

    pub fn reply_delay(mut self, delay: Duration) -> Self {
        self.reply_delay = delay;
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn probe_times(&self) -> Vec<Instant> {
        self.probe_times.lock().unwrap().clone()
    }

    pub fn probe_count(&self) -> usize {
        self.probe_times.lock().unwrap().len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

pub fn ok_reply(text: &str) -> Result<ChatReply, GatewayError> {
    Ok(ChatReply {
        response: text.to_string(),
        safety: Some(Safety::Safe),
        timestamp: Some("2024-05-01T10:00:00.000000".to_string()),
    })
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn send_chat_message(
        &self,
        message: &str,
        history: &[HistoryEntry],
        persona: Persona,
    ) -> Result<ChatReply, GatewayError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        self.requests.lock().unwrap().push(RecordedRequest {
            message: message.to_string(),
            history: history.to_vec(),
            persona,
        });

        if !self.reply_delay.is_zero() {
            tokio::time::sleep(self.reply_delay).await;
        }

        let result = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ok_reply("ok"));

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn health_check(&self) -> Result<(), GatewayError> {
        self.probe_times.lock().unwrap().push(Instant::now());
        self.probes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.probe_fallback.clone())
    }
}
