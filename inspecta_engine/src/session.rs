//! Per-session conversational context.
//!
//! Each session id owns one async mutex. Updates are single read-modify-write
//! critical sections; distinct sessions share nothing but the registry map,
//! which is only held long enough to look up or insert an entry.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use inspecta_core::BoundParameter;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionContext {
    pub last_query: Option<String>,
    pub last_rule_id: Option<i32>,
    pub last_parameters: Vec<BoundParameter>,
    /// Oldest first, bounded by the registry's history limit.
    pub recent_queries: VecDeque<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SessionContext {
    #[must_use]
    pub fn recent(&self) -> Vec<String> {
        self.recent_queries.iter().cloned().collect()
    }
}

/// What a finished request leaves behind in its session.
#[derive(Debug, Clone)]
pub struct SessionUpdate {
    pub query: String,
    /// Rule that answered, with the values it was bound with.
    pub answered_by: Option<(i32, Vec<BoundParameter>)>,
}

type Slot = Arc<tokio::sync::Mutex<SessionContext>>;

#[derive(Debug)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Slot>>,
    history_limit: usize,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(history_limit: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            history_limit,
        }
    }

    fn slot(&self, id: &str) -> Slot {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(sessions.entry(id.to_string()).or_default())
    }

    fn existing(&self, id: &str) -> Option<Slot> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Copy of the session's context. The session lock is released on return.
    pub async fn snapshot(&self, id: &str) -> SessionContext {
        match self.existing(id) {
            Some(slot) => slot.lock().await.clone(),
            None => SessionContext::default(),
        }
    }

    /// Apply a finished request to its session in one critical section.
    pub async fn record(&self, id: &str, update: SessionUpdate) {
        let slot = self.slot(id);
        let mut context = slot.lock().await;

        context.recent_queries.push_back(update.query.clone());
        while context.recent_queries.len() > self.history_limit {
            context.recent_queries.pop_front();
        }
        context.last_query = Some(update.query);
        if let Some((rule_id, parameters)) = update.answered_by {
            context.last_rule_id = Some(rule_id);
            context.last_parameters = parameters;
        }
        context.updated_at = Some(Utc::now());

        debug!(
            "Session {id}: {} recent queries, last rule {:?}",
            context.recent_queries.len(),
            context.last_rule_id
        );
    }

    pub fn clear(&self, id: &str) -> bool {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
