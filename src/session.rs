//! Process-wide MCP session registry
//!
//! Sessions are created by `initialize`, looked up on every later request, and
//! removed by an explicit `DELETE /mcp` or when the server shuts down. There is
//! no idle expiry.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub client_info: Value,
}

#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, client_info: Value) -> String {
        let id = Uuid::new_v4().to_string();
        let session = Session {
            id: id.clone(),
            created_at: Utc::now(),
            client_info,
        };

        let active = {
            let mut sessions = self.sessions.write().await;
            sessions.insert(id.clone(), session);
            sessions.len()
        };

        info!(session_id = %id, active_sessions = active, "session created");
        id
    }

    pub async fn exists(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    pub async fn get(&self, session_id: &str) -> Option<Session> {
        self.sessions.read().await.get(session_id).cloned()
    }

    pub async fn delete(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(session_id).is_some();
        if removed {
            info!(session_id = %session_id, "session terminated");
        } else {
            debug!(session_id = %session_id, "delete for unknown session");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drops every session. Called once during shutdown.
    pub async fn clear(&self) {
        let mut sessions = self.sessions.write().await;
        let dropped = sessions.len();
        sessions.clear();
        info!(dropped_sessions = dropped, "session store cleared");
    }
}
