//! Session Management
//!
//! Outer conversations between a human and the facade. Each session keeps
//! the human-visible exchange only; inner agent discussions are discarded
//! once reduced.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AgentError, Result};
use crate::message::Message;

/// Sessions kept by a [`MemorySessionStore`] unless configured otherwise
pub const DEFAULT_SESSION_CAPACITY: usize = 1024;

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A human-facing conversation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,

    /// Questions and facade answers, oldest first
    pub history: Vec<Message>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(SessionId::new())
    }

    pub fn with_id(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Record one question/answer exchange
    pub fn push_turn(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.history.push(Message::user(question));
        self.history.push(Message::assistant(answer));
        self.updated_at = Utc::now();
    }

    pub fn message_count(&self) -> usize {
        self.history.len()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Session store trait for persistence
pub trait SessionStore: Send + Sync {
    fn load(&self, id: &SessionId) -> Result<Option<Session>>;

    /// Append one exchange to `id`, creating the session when missing.
    ///
    /// The append is atomic, so concurrent turns on one conversation are
    /// all kept.
    fn push_turn(&self, id: &SessionId, question: &str, answer: &str) -> Result<Session>;
}

/// In-memory session store.
///
/// Holds at most `capacity` sessions; creating one more evicts the session
/// that was updated least recently.
pub struct MemorySessionStore {
    inner: RwLock<StoreInner>,
    capacity: usize,
}

#[derive(Default)]
struct StoreInner {
    /// Session plus the store tick of its last update
    sessions: HashMap<SessionId, (u64, Session)>,
    tick: u64,
}

impl StoreInner {
    fn evict_oldest(&mut self) {
        let oldest = self
            .sessions
            .iter()
            .min_by_key(|(_, (tick, _))| *tick)
            .map(|(id, _)| id.clone());
        if let Some(id) = oldest {
            tracing::debug!(session = %id, "Evicting session");
            self.sessions.remove(&id);
        }
    }
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SESSION_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            capacity: capacity.max(1),
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> AgentError {
    AgentError::Session("session store lock poisoned".into())
}

impl SessionStore for MemorySessionStore {
    fn load(&self, id: &SessionId) -> Result<Option<Session>> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.sessions.get(id).map(|(_, session)| session.clone()))
    }

    fn push_turn(&self, id: &SessionId, question: &str, answer: &str) -> Result<Session> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        if !inner.sessions.contains_key(id) && inner.sessions.len() >= self.capacity {
            inner.evict_oldest();
        }
        inner.tick += 1;
        let tick = inner.tick;
        let (touched, session) = inner
            .sessions
            .entry(id.clone())
            .or_insert_with(|| (tick, Session::with_id(id.clone())));
        *touched = tick;
        session.push_turn(question, answer);
        Ok(session.clone())
    }
}
