//! Registry of running sessions.
//!
//! The registry is responsible for:
//! - Spawning session actors and making them visible for routing
//! - Forgetting sessions once their actor stops
//! - Graceful shutdown of all actors

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::handle::SessionHandle;
use super::types::StopReason;

/// Running sessions by id. Thread-safe and cheap to clone.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    handles: Arc<DashMap<String, SessionHandle>>,
    /// Actor task handles for graceful shutdown.
    task_handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handle` and run its actor until it stops.
    pub(crate) async fn spawn<F>(&self, handle: SessionHandle, actor: F)
    where
        F: Future<Output = StopReason> + Send + 'static,
    {
        let id = handle.id().to_string();

        // Insert before spawning so activations can be routed immediately
        self.handles.insert(id.clone(), handle);

        let handles = self.handles.clone();
        let task = tokio::spawn(async move {
            let reason = actor.await;
            handles.remove(&id);
            debug!(session_id = %id, reason = ?reason, "Session removed from registry");
        });

        let mut guard = self.task_handles.lock().await;
        guard.retain(|h| !h.is_finished());
        guard.push(task);
    }

    /// Get a session handle by id.
    pub fn get(&self, id: &str) -> Option<SessionHandle> {
        self.handles.get(id).map(|r| r.clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.handles.contains_key(id)
    }

    /// Number of running sessions.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Stop accepting activations and wait for every actor to finish.
    ///
    /// Dropping the registry's handles closes each actor's queue, which stops
    /// the session with [`StopReason::Explicit`].
    pub async fn shutdown(&self) {
        info!(sessions = self.handles.len(), "Shutting down session registry");
        self.handles.clear();

        let task_handles = {
            let mut handles = self.task_handles.lock().await;
            std::mem::take(&mut *handles)
        };

        for task_handle in task_handles {
            if let Err(e) = task_handle.await {
                warn!(error = ?e, "Session task panicked during shutdown");
            }
        }

        info!("Session registry shutdown complete");
    }
}
