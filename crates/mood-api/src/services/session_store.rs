//! In-memory store of analysis sessions.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use mood_vision::BatchOutcome;

/// One completed analysis: everything a batch of uploads produced.
///
/// Immutable once stored; results live in memory for the session TTL and are
/// never persisted.
#[derive(Debug)]
pub struct AnalysisSession {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub outcome: BatchOutcome,
}

/// Concurrent map of session id to analysis results.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, Arc<AnalysisSession>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a batch outcome under a fresh session id.
    pub async fn insert(&self, outcome: BatchOutcome) -> Arc<AnalysisSession> {
        let session = Arc::new(AnalysisSession {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            outcome,
        });
        self.inner
            .write()
            .await
            .insert(session.id, Arc::clone(&session));
        session
    }

    pub async fn get(&self, id: &Uuid) -> Option<Arc<AnalysisSession>> {
        self.inner.read().await.get(id).cloned()
    }

    /// Drop sessions older than `ttl`. Returns how many were evicted.
    pub async fn evict_older_than(&self, ttl: Duration) -> usize {
        // A TTL too large for chrono can never expire anything
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return 0;
        };
        let cutoff = Utc::now() - ttl;
        let mut sessions = self.inner.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.created_at > cutoff);
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
