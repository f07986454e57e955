//! Application state shared across request handlers.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use libcivicast::service::CivicastService;
use libcivicast::CurationSession;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// One curation session; the mutex serializes operations on it
pub type SessionHandle = Arc<Mutex<CurationSession>>;

struct SessionSlot {
    created_at: i64,
    handle: SessionHandle,
}

pub struct AppState {
    pub service: CivicastService,
    /// Open curation sessions, held in memory only
    sessions: RwLock<HashMap<Uuid, SessionSlot>>,
    max_sessions: usize,
    session_ttl_secs: i64,
}

impl AppState {
    pub fn new(service: CivicastService) -> Self {
        let server = &service.config().server;
        let max_sessions = server.max_sessions.max(1);
        let session_ttl_secs = i64::try_from(server.session_ttl_secs).unwrap_or(i64::MAX);
        Self {
            service,
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
            session_ttl_secs,
        }
    }

    pub async fn insert_session(&self, session: CurationSession) -> SessionHandle {
        let id = session.id;
        let created_at = session.created_at;
        let handle = Arc::new(Mutex::new(session));

        let mut sessions = self.sessions.write().await;
        evict(
            &mut sessions,
            Utc::now().timestamp(),
            self.session_ttl_secs,
            self.max_sessions - 1,
        );
        sessions.insert(
            id,
            SessionSlot {
                created_at,
                handle: Arc::clone(&handle),
            },
        );
        handle
    }

    pub async fn session(&self, id: &str) -> ApiResult<SessionHandle> {
        let not_found = || ApiError::not_found(format!("Not found: session {}", id));
        let id = Uuid::parse_str(id).map_err(|_| not_found())?;
        let now = Utc::now().timestamp();
        self.sessions
            .read()
            .await
            .get(&id)
            .filter(|slot| !expired(slot.created_at, now, self.session_ttl_secs))
            .map(|slot| Arc::clone(&slot.handle))
            .ok_or_else(not_found)
    }

    /// Drop a session; returns false if it did not exist
    pub async fn remove_session(&self, id: &str) -> bool {
        match Uuid::parse_str(id) {
            Ok(id) => self.sessions.write().await.remove(&id).is_some(),
            Err(_) => false,
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

fn expired(created_at: i64, now: i64, ttl_secs: i64) -> bool {
    now.saturating_sub(created_at) > ttl_secs
}

/// Drop expired sessions, then the oldest ones until at most `keep` remain
fn evict(sessions: &mut HashMap<Uuid, SessionSlot>, now: i64, ttl_secs: i64, keep: usize) {
    let before = sessions.len();
    sessions.retain(|_, slot| !expired(slot.created_at, now, ttl_secs));

    if sessions.len() > keep {
        let mut by_age: Vec<(i64, Uuid)> = sessions
            .iter()
            .map(|(id, slot)| (slot.created_at, *id))
            .collect();
        by_age.sort();
        let excess = sessions.len() - keep;
        for (_, id) in by_age.into_iter().take(excess) {
            sessions.remove(&id);
        }
    }

    let dropped = before - sessions.len();
    if dropped > 0 {
        tracing::info!(dropped, open = sessions.len(), "Evicted curation sessions");
    }
}
