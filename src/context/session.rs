//! Conversation session store
//!
//! Volatile per-conversation turn history keyed by session id. The store
//! owns its synchronization (one DashMap shard lock per key) and is injected
//! into callers; there is no ambient global.
//!
//! Retention is bounded two ways: each session keeps at most `max_turns`
//! (oldest dropped first), and sessions idle longer than `idle_expiry` are
//! removed by [`SessionStore::purge_expired`].

use dashmap::mapref::one::RefMut;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::types::DiagnosticResult;

/// Default per-session turn cap
pub const DEFAULT_MAX_TURNS: usize = 40;
/// Default idle expiry (24 h)
pub const DEFAULT_IDLE_EXPIRY_SECS: u64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct ConversationSession {
    pub session_id: String,
    pub turns: Vec<Turn>,
    /// Last verdict shown in this conversation, if any
    pub last_diagnostic: Option<DiagnosticResult>,
    last_active: Instant,
}

impl ConversationSession {
    fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            turns: Vec::new(),
            last_active: Instant::now(),
            last_diagnostic: None,
        }
    }

    fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    fn push(&mut self, role: Role, text: String) {
        self.turns.push(Turn { role, text });
    }

    /// Drop the oldest turns beyond `max_turns`
    fn enforce_cap(&mut self, max_turns: usize) {
        if self.turns.len() > max_turns {
            let excess = self.turns.len() - max_turns;
            self.turns.drain(..excess);
        }
    }
}

#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<String, ConversationSession>,
    max_turns: usize,
    idle_expiry: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TURNS, Duration::from_secs(DEFAULT_IDLE_EXPIRY_SECS))
    }
}

impl SessionStore {
    pub fn new(max_turns: usize, idle_expiry: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            max_turns: max_turns.max(1),
            idle_expiry,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.max_turns, Duration::from_secs(config.idle_expiry_secs))
    }

    /// Exclusive handle on the session, created on first contact.
    ///
    /// The shard lock is held until the handle drops; do not hold it
    /// across an `.await`.
    pub fn get_or_create(&self, session_id: &str) -> RefMut<'_, String, ConversationSession> {
        let mut session = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| ConversationSession::new(session_id));
        session.touch();
        session
    }

    pub fn append(&self, session_id: &str, role: Role, text: impl Into<String>) {
        let mut session = self.get_or_create(session_id);
        session.push(role, text.into());
        session.enforce_cap(self.max_turns);
    }

    /// Record a user message and its reply as adjacent turns, under one
    /// shard lock so concurrent exchanges on the same session never interleave
    pub fn append_exchange(
        &self,
        session_id: &str,
        user: impl Into<String>,
        assistant: impl Into<String>,
    ) {
        let mut session = self.get_or_create(session_id);
        session.push(Role::User, user.into());
        session.push(Role::Assistant, assistant.into());
        session.enforce_cap(self.max_turns);
    }

    /// Clear the conversation to empty
    pub fn reset(&self, session_id: &str) {
        let mut session = self.get_or_create(session_id);
        session.turns.clear();
        session.last_diagnostic = None;
        info!(session_id, "Session reset");
    }

    /// Snapshot of the turn history; empty for unknown sessions
    pub fn turns(&self, session_id: &str) -> Vec<Turn> {
        self.sessions
            .get(session_id)
            .map(|s| s.turns.clone())
            .unwrap_or_default()
    }

    pub fn set_diagnostic(&self, session_id: &str, diagnostic: DiagnosticResult) {
        self.get_or_create(session_id).last_diagnostic = Some(diagnostic);
    }

    pub fn last_diagnostic(&self, session_id: &str) -> Option<DiagnosticResult> {
        self.sessions
            .get(session_id)
            .and_then(|s| s.last_diagnostic.clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop sessions idle for at least the configured expiry. Returns the
    /// number removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.sessions.len();
        let now = Instant::now();
        self.sessions
            .retain(|_, s| now.duration_since(s.last_active) < self.idle_expiry);
        let purged = before.saturating_sub(self.sessions.len());
        if purged > 0 {
            debug!(purged, "Expired idle sessions");
        }
        purged
    }
}
