//! Per-session conversation state.
//!
//! A `Session` owns the chat history and the active agent. Replacing the agent
//! always clears the history. Sessions live in a `SessionStore` keyed by the id
//! the page sends with every request; nothing is persisted,
//! and sessions left idle are evicted.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::agents::DataAgent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnKind {
    Text,
    Plot,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TurnContent {
    Text(String),
    Image(Bytes),
}

/// One history entry. The kind follows from the content, so a plot turn
/// always carries image bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    role: Role,
    content: TurnContent,
}

impl Turn {
    pub fn user(question: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: TurnContent::Text(question.into()),
        }
    }

    pub fn assistant_text(answer: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: TurnContent::Text(answer.into()),
        }
    }

    pub fn assistant_plot(image: Bytes) -> Self {
        Self {
            role: Role::Assistant,
            content: TurnContent::Image(image),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &TurnContent {
        &self.content
    }

    pub fn kind(&self) -> TurnKind {
        match self.content {
            TurnContent::Text(_) => TurnKind::Text,
            TurnContent::Image(_) => TurnKind::Plot,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            TurnContent::Text(text) => Some(text),
            TurnContent::Image(_) => None,
        }
    }

    pub fn image(&self) -> Option<&Bytes> {
        match &self.content {
            TurnContent::Image(bytes) => Some(bytes),
            TurnContent::Text(_) => None,
        }
    }
}

#[derive(Default)]
pub struct Session {
    history: Vec<Turn>,
    agent: Option<Box<dyn DataAgent>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_turn(&mut self, turn: Turn) {
        self.history.push(turn);
    }

    /// Installs a new agent and starts an empty conversation.
    pub fn replace_agent(&mut self, agent: Box<dyn DataAgent>) {
        self.agent = Some(agent);
        self.history.clear();
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn agent(&self) -> Option<&dyn DataAgent> {
        self.agent.as_deref()
    }

    pub fn has_agent(&self) -> bool {
        self.agent.is_some()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("history_len", &self.history.len())
            .field("has_agent", &self.agent.is_some())
            .finish()
    }
}

pub type SharedSession = Arc<Mutex<Session>>;

struct Slot {
    session: SharedSession,
    last_seen: DateTime<Utc>,
}

/// In-memory sessions keyed by the page's session id. Every lookup refreshes
/// the entry's last-seen time; `evict_idle` drops entries nobody has touched.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, Slot>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_create(&self, id: Uuid) -> SharedSession {
        let mut guard = self.inner.write().await;
        let slot = guard.entry(id).or_insert_with(|| {
            debug!(session_id = %id, "Session created");
            Slot {
                session: Arc::new(Mutex::new(Session::new())),
                last_seen: Utc::now(),
            }
        });
        slot.last_seen = Utc::now();
        slot.session.clone()
    }

    pub async fn get(&self, id: &Uuid) -> Option<SharedSession> {
        let mut guard = self.inner.write().await;
        let slot = guard.get_mut(id)?;
        slot.last_seen = Utc::now();
        Some(slot.session.clone())
    }

    pub async fn remove(&self, id: &Uuid) -> bool {
        self.inner.write().await.remove(id).is_some()
    }

    /// Removes sessions last seen before `cutoff` and returns how many went.
    /// A session whose lock is held by an in-flight request is kept.
    pub async fn evict_idle(&self, cutoff: DateTime<Utc>) -> usize {
        let mut guard = self.inner.write().await;
        let before = guard.len();
        guard.retain(|id, slot| {
            let keep = slot.last_seen >= cutoff || slot.session.try_lock().is_err();
            if !keep {
                debug!(session_id = %id, last_seen = %slot.last_seen, "Session evicted");
            }
            keep
        });
        before - guard.len()
    }

    /// Sweeps idle sessions every `every` until the runtime shuts down.
    pub fn spawn_idle_eviction(&self, max_idle: TimeDelta, every: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let evicted = store.evict_idle(Utc::now() - max_idle).await;
                if evicted > 0 {
                    let remaining = store.len().await;
                    info!(evicted, remaining, "Evicted idle sessions");
                }
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
