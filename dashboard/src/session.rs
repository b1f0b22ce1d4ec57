//! Per-user session state

use chrono::{DateTime, Utc};
use feedback_relay::{SessionId, TrustedModel};
use forecast_eval::Period;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

/// One answered chat question
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatExchange {
    pub timestamp: DateTime<Utc>,
    pub question: String,
    pub answer: String,
}

/// State owned by one user's session
#[derive(Debug, Clone)]
pub struct SessionContext {
    id: SessionId,
    created_at: DateTime<Utc>,
    last_seen: Instant,
    pub selected_period: Option<Period>,
    pub trusted_model: Option<TrustedModel>,
    chat_history: Vec<ChatExchange>,
    pending_question: Option<String>,
}

impl SessionContext {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            last_seen: Instant::now(),
            selected_period: None,
            trusted_model: None,
            chat_history: Vec::new(),
            pending_question: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn chat_history(&self) -> &[ChatExchange] {
        &self.chat_history
    }

    pub fn pending_question(&self) -> Option<&str> {
        self.pending_question.as_deref()
    }

    /// Mark a question as in flight. Returns false if one already is.
    pub fn begin_question(&mut self, question: &str) -> bool {
        if self.pending_question.is_some() {
            return false;
        }
        self.pending_question = Some(question.to_string());
        true
    }

    /// Clear the in-flight question, recording the answer if there is one.
    pub fn finish_question(&mut self, answer: Option<String>) -> Option<ChatExchange> {
        let question = self.pending_question.take()?;
        let answer = answer?;

        let exchange = ChatExchange {
            timestamp: Utc::now(),
            question,
            answer,
        };
        self.chat_history.push(exchange.clone());
        Some(exchange)
    }
}

/// All live sessions. Contexts are created on first interaction and removed
/// when ended explicitly or when idle past the TTL.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, SessionContext>>,
    idle_ttl: Duration,
}

impl SessionRegistry {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_ttl,
        }
    }

    fn sessions(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, SessionContext>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the session, creating it when `id` is absent or unknown.
    pub fn with_session<R>(
        &self,
        id: Option<SessionId>,
        f: impl FnOnce(&mut SessionContext) -> R,
    ) -> (SessionId, R) {
        let mut sessions = self.sessions();
        Self::purge(&mut sessions, self.idle_ttl);

        let id = id.unwrap_or_default();
        let context = sessions.entry(id).or_insert_with(|| {
            debug!(session = %id, "session started");
            SessionContext::new(id)
        });
        context.last_seen = Instant::now();

        (id, f(context))
    }

    /// Run `f` against an existing session without creating one
    pub fn update<R>(&self, id: SessionId, f: impl FnOnce(&mut SessionContext) -> R) -> Option<R> {
        let mut sessions = self.sessions();
        let context = sessions.get_mut(&id)?;
        context.last_seen = Instant::now();
        Some(f(context))
    }

    /// Mark `question` as in flight for the session, creating it if needed.
    ///
    /// Returns `None` alongside the id when another question is still pending.
    /// The returned guard clears the flag when dropped unless it was finished.
    pub fn begin_question(
        self: &Arc<Self>,
        id: Option<SessionId>,
        question: &str,
    ) -> (SessionId, Option<PendingQuestion>) {
        let (id, accepted) = self.with_session(id, |s| s.begin_question(question));
        let pending = accepted.then(|| PendingQuestion {
            registry: Arc::clone(self),
            id,
            armed: true,
        });
        (id, pending)
    }

    /// Read-only view of an existing session
    pub fn inspect<R>(&self, id: SessionId, f: impl FnOnce(&SessionContext) -> R) -> Option<R> {
        let mut sessions = self.sessions();
        Self::purge(&mut sessions, self.idle_ttl);
        sessions.get(&id).map(f)
    }

    /// Tear down a session. Returns false when it did not exist.
    pub fn end(&self, id: SessionId) -> bool {
        let removed = self.sessions().remove(&id).is_some();
        if removed {
            debug!(session = %id, "session ended");
        }
        removed
    }

    /// Remove idle sessions, returning how many were dropped
    pub fn purge_idle(&self) -> usize {
        Self::purge(&mut self.sessions(), self.idle_ttl)
    }

    // Sessions with a question in flight are kept until it settles
    fn purge(sessions: &mut HashMap<SessionId, SessionContext>, ttl: Duration) -> usize {
        let before = sessions.len();
        sessions.retain(|_, s| s.pending_question.is_some() || s.last_seen.elapsed() < ttl);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions().is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}

/// A chat question in flight for one session
#[derive(Debug)]
pub struct PendingQuestion {
    registry: Arc<SessionRegistry>,
    id: SessionId,
    armed: bool,
}

impl PendingQuestion {
    pub fn session_id(&self) -> SessionId {
        self.id
    }

    /// Settle the question, recording the answer if there is one. Returns the
    /// session's history length, or 0 when the session was ended meanwhile.
    pub fn finish(mut self, answer: Option<String>) -> usize {
        self.armed = false;
        self.registry
            .update(self.id, |s| {
                s.finish_question(answer);
                s.chat_history().len()
            })
            .unwrap_or(0)
    }
}

impl Drop for PendingQuestion {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let cleared = self
            .registry
            .update(self.id, |s| s.finish_question(None))
            .is_some();
        if cleared {
            debug!(session = %self.id, "abandoned chat question cleared");
        }
    }
}
