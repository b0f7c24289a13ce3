//! Chat session store for the mock responder.
//!
//! DESIGN
//! ======
//! An explicit, cloneable handle over `Arc<Mutex<HashMap>>` — constructed in
//! `main` and passed to whoever needs it, never a module-level singleton.
//! Each record holds the per-session bearer token, the single current node,
//! and the write-only message log.
//!
//! TRADE-OFFS
//! ==========
//! Expiry is enforced twice: lazily on lookup (an expired record behaves
//! exactly like an absent one) and by a periodic background sweep so idle
//! sessions do not pin memory between requests. Both paths share the same
//! TTL so the two observers can never disagree about liveness.

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use protocol::{ChatMessage, NodeResponse};
use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;
use uuid::Uuid;

// =============================================================================
// TOKENS
// =============================================================================

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a chat session identifier.
#[must_use]
pub fn generate_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generate a 32-byte hex chat token.
#[must_use]
pub fn generate_chat_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Unknown or expired session. Fatal for the turn; the caller must
    /// start a new chat.
    #[error("chat session not found for chatSessionId: {0}")]
    NotFound(String),
    /// The presented chat token does not match the stored one.
    #[error("chat token does not match this session")]
    TokenMismatch,
}

// =============================================================================
// STORE
// =============================================================================

/// One live conversation, keyed by its `chatSessionId`.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub chat_token: String,
    pub workflow_id: String,
    /// Exactly one active node; replaced wholesale on every turn.
    pub current_node: NodeResponse,
    /// Write-only turn log; nothing reads it back, kept for parity with
    /// real backends that persist transcripts.
    pub messages: Vec<ChatMessage>,
    last_seen: Instant,
}

/// Cloneable handle to the in-memory session map.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<String, SessionRecord>>>,
    ttl: Duration,
}

impl SessionStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self { inner: Arc::new(Mutex::new(HashMap::new())), ttl }
    }

    /// Create a session around an initial node, returning its credentials.
    pub fn create(&self, workflow_id: &str, initial_node: NodeResponse) -> (String, String) {
        self.create_at(workflow_id, initial_node, Instant::now())
    }

    pub(crate) fn create_at(&self, workflow_id: &str, initial_node: NodeResponse, now: Instant) -> (String, String) {
        let chat_session_id = generate_session_id();
        let chat_token = generate_chat_token();
        let record = SessionRecord {
            chat_token: chat_token.clone(),
            workflow_id: workflow_id.to_owned(),
            current_node: initial_node,
            messages: Vec::new(),
            last_seen: now,
        };
        let mut inner = self.lock();
        inner.insert(chat_session_id.clone(), record);
        (chat_session_id, chat_token)
    }

    /// Record a turn: verify the token, log the user input, and replace the
    /// session's current node.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotFound`] for unknown or expired sessions,
    /// [`SessionError::TokenMismatch`] for a wrong `chatToken`.
    pub fn advance(
        &self,
        chat_session_id: &str,
        chat_token: &str,
        user_input: &str,
        next_node: NodeResponse,
    ) -> Result<(), SessionError> {
        self.advance_at(chat_session_id, chat_token, user_input, next_node, Instant::now())
    }

    pub(crate) fn advance_at(
        &self,
        chat_session_id: &str,
        chat_token: &str,
        user_input: &str,
        next_node: NodeResponse,
        now: Instant,
    ) -> Result<(), SessionError> {
        let mut inner = self.lock();

        let expired = inner
            .get(chat_session_id)
            .is_some_and(|record| now.duration_since(record.last_seen) > self.ttl);
        if expired {
            inner.remove(chat_session_id);
        }

        let record = inner
            .get_mut(chat_session_id)
            .ok_or_else(|| SessionError::NotFound(chat_session_id.to_owned()))?;
        if record.chat_token != chat_token {
            return Err(SessionError::TokenMismatch);
        }

        record.messages.push(ChatMessage::user(user_input));
        record.current_node = next_node;
        record.last_seen = now;
        Ok(())
    }

    /// Snapshot a session's current node, ignoring expiry. Test/diagnostic
    /// accessor; protocol paths go through [`SessionStore::advance`].
    #[must_use]
    pub fn current_node(&self, chat_session_id: &str) -> Option<NodeResponse> {
        self.lock().get(chat_session_id).map(|r| r.current_node.clone())
    }

    /// Number of logged messages for a session, if it exists.
    #[must_use]
    pub fn message_count(&self, chat_session_id: &str) -> Option<usize> {
        self.lock().get(chat_session_id).map(|r| r.messages.len())
    }

    /// Drop every expired session, returning how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub(crate) fn sweep_at(&self, now: Instant) -> usize {
        let mut inner = self.lock();
        let before = inner.len();
        inner.retain(|_, record| now.duration_since(record.last_seen) <= self.ttl);
        before - inner.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SessionRecord>> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

// =============================================================================
// EVICTION TASK
// =============================================================================

/// Spawn the periodic sweep for expired sessions.
pub fn spawn_eviction_task(store: SessionStore, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let removed = store.sweep();
            if removed > 0 {
                debug!(removed, live = store.len(), "evicted expired chat sessions");
            }
        }
    })
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
