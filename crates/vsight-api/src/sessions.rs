//! In-memory session store.
//!
//! Each session owns one [`VideoWorkflow`]. Status reads go through a watch
//! receiver and never wait on the workflow lock, which is held for the whole
//! duration of an upload or analysis.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex, OwnedMutexGuard, RwLock};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use vsight_gemini::{GeminiClient, VideoWorkflow, WorkflowStatus};
use vsight_models::SessionId;

use crate::error::{ApiError, ApiResult};
use crate::metrics;

/// One user's workflow context.
pub struct SessionEntry {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    workflow: Arc<Mutex<VideoWorkflow>>,
    status: watch::Receiver<WorkflowStatus>,
    cancel: Mutex<CancellationToken>,
    last_touched: Mutex<Instant>,
}

impl SessionEntry {
    fn new(id: SessionId, client: GeminiClient) -> Self {
        let workflow = VideoWorkflow::new(client);
        let status = workflow.subscribe();
        Self {
            id,
            created_at: Utc::now(),
            workflow: Arc::new(Mutex::new(workflow)),
            status,
            cancel: Mutex::new(CancellationToken::new()),
            last_touched: Mutex::new(Instant::now()),
        }
    }

    /// Latest published status; never blocks on in-flight work.
    pub fn status(&self) -> WorkflowStatus {
        self.status.borrow().clone()
    }

    /// Lock the workflow, waiting for in-flight work to finish.
    pub async fn lock_workflow(&self) -> OwnedMutexGuard<VideoWorkflow> {
        Arc::clone(&self.workflow).lock_owned().await
    }

    /// Lock the workflow only if nothing is running.
    pub fn try_lock_workflow(&self) -> ApiResult<OwnedMutexGuard<VideoWorkflow>> {
        Arc::clone(&self.workflow)
            .try_lock_owned()
            .map_err(|_| ApiError::conflict("session is busy"))
    }

    /// Cancel the in-flight upload, if any, and hand out a fresh token.
    pub async fn restart_cancellation(&self) -> CancellationToken {
        let mut current = self.cancel.lock().await;
        current.cancel();
        *current = CancellationToken::new();
        current.clone()
    }

    /// Cancel the in-flight upload, if any.
    pub async fn cancel(&self) {
        self.cancel.lock().await.cancel();
    }

    async fn touch(&self) {
        *self.last_touched.lock().await = Instant::now();
    }

    async fn idle_for(&self) -> Duration {
        self.last_touched.lock().await.elapsed()
    }
}

/// All live sessions.
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Arc<SessionEntry>>>,
    client: GeminiClient,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(client: GeminiClient, max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            client,
            max_sessions,
        }
    }

    /// Create a session with its own workflow.
    pub async fn create(&self) -> ApiResult<Arc<SessionEntry>> {
        let mut sessions = self.sessions.write().await;
        if sessions.len() >= self.max_sessions {
            return Err(ApiError::conflict("session limit reached"));
        }

        let entry = Arc::new(SessionEntry::new(SessionId::new(), self.client.clone()));
        sessions.insert(entry.id.clone(), Arc::clone(&entry));
        metrics::set_active_sessions(sessions.len());

        info!(session_id = %entry.id, "Created session");
        Ok(entry)
    }

    /// Look up a session and mark it as used.
    pub async fn get(&self, id: &str) -> ApiResult<Arc<SessionEntry>> {
        if !SessionId::is_valid(id) {
            return Err(ApiError::bad_request("Invalid session ID format"));
        }

        let entry = self
            .sessions
            .read()
            .await
            .get(&SessionId::from(id))
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("session {}", id)))?;

        entry.touch().await;
        Ok(entry)
    }

    /// Cancel a session's work and forget it.
    pub async fn remove(&self, id: &str) -> ApiResult<()> {
        let entry = {
            let mut sessions = self.sessions.write().await;
            let entry = sessions
                .remove(&SessionId::from(id))
                .ok_or_else(|| ApiError::not_found(format!("session {}", id)))?;
            metrics::set_active_sessions(sessions.len());
            entry
        };

        entry.cancel().await;
        info!(session_id = %entry.id, "Deleted session");
        Ok(())
    }

    /// Evict sessions untouched for at least `ttl`, cancelling their work.
    pub async fn evict_idle(&self, ttl: Duration) -> Vec<SessionId> {
        let candidates: Vec<Arc<SessionEntry>> = self.sessions.read().await.values().cloned().collect();

        let mut expired = Vec::new();
        for entry in candidates {
            if entry.idle_for().await >= ttl {
                expired.push(entry);
            }
        }
        if expired.is_empty() {
            return Vec::new();
        }

        let mut sessions = self.sessions.write().await;
        let mut evicted = Vec::with_capacity(expired.len());
        for entry in expired {
            if sessions.remove(&entry.id).is_some() {
                entry.cancel().await;
                debug!(session_id = %entry.id, "Evicted idle session");
                evicted.push(entry.id.clone());
            }
        }
        metrics::set_active_sessions(sessions.len());
        evicted
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
