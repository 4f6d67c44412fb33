//! services/web/src/web/state.rs
//!
//! Defines the application's shared state and the per-browser workspaces.

use crate::config::Config;
use minijinja::Environment;
use paypeek_core::ports::IdentityProvider;
use paypeek_core::{AuthClient, CollectionStore, DashboardView, SessionStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub config: Arc<Config>,
    pub workspaces: Arc<WorkspaceRegistry>,
    pub templates: Environment<'static>,
}

impl AppState {
    pub fn new(config: Arc<Config>, identity: Arc<dyn IdentityProvider>) -> Result<Self, minijinja::Error> {
        let workspaces = Arc::new(WorkspaceRegistry::new(
            identity,
            config.success_delay,
            config.max_workspaces,
        ));
        Ok(Self {
            templates: crate::web::pages::templates()?,
            workspaces,
            config,
        })
    }
}

//=========================================================================================
// Workspace (Specific to One Browser)
//=========================================================================================

/// Everything one browser sees: its auth client and session, its collections
/// and the dashboard's UI state.
pub struct Workspace {
    pub id: Uuid,
    pub client: Arc<AuthClient>,
    pub session: Arc<SessionStore>,
    pub collections: Mutex<CollectionStore>,
    pub view: Mutex<DashboardView>,
    last_seen: std::sync::Mutex<Instant>,
    /// Stops the background token refresh.
    refresh: CancellationToken,
}

impl Workspace {
    /// Creates the workspace and restores its session before returning.
    pub async fn open(id: Uuid, identity: Arc<dyn IdentityProvider>, success_delay: Duration) -> Arc<Self> {
        let client = Arc::new(AuthClient::new(identity));
        let session = SessionStore::new(Arc::clone(&client), success_delay);
        session.init().await;

        let refresh = CancellationToken::new();
        client.spawn_auto_refresh(refresh.clone());

        Arc::new(Self {
            id,
            client,
            session,
            collections: Mutex::new(CollectionStore::seeded()),
            view: Mutex::new(DashboardView::default()),
            last_seen: std::sync::Mutex::new(Instant::now()),
            refresh,
        })
    }

    pub fn touch(&self) {
        if let Ok(mut last_seen) = self.last_seen.lock() {
            *last_seen = Instant::now();
        }
    }

    pub fn idle_for(&self) -> Duration {
        self.last_seen
            .lock()
            .map(|last_seen| last_seen.elapsed())
            .unwrap_or_default()
    }

    /// Cancels the session subscription, pending timers and the refresh task.
    pub fn teardown(&self) {
        self.session.teardown();
        self.refresh.cancel();
        debug!(workspace = %self.id, "Workspace torn down");
    }
}

//=========================================================================================
// WorkspaceRegistry
//=========================================================================================

pub struct WorkspaceRegistry {
    identity: Arc<dyn IdentityProvider>,
    success_delay: Duration,
    capacity: usize,
    workspaces: Mutex<HashMap<Uuid, Arc<Workspace>>>,
}

impl WorkspaceRegistry {
    pub fn new(identity: Arc<dyn IdentityProvider>, success_delay: Duration, capacity: usize) -> Self {
        Self {
            identity,
            success_delay,
            capacity: capacity.max(1),
            workspaces: Mutex::new(HashMap::new()),
        }
    }

    /// Looks up a live workspace and marks it as seen.
    pub async fn get(&self, id: Uuid) -> Option<Arc<Workspace>> {
        let workspaces = self.workspaces.lock().await;
        let existing = workspaces.get(&id)?;
        existing.touch();
        Some(Arc::clone(existing))
    }

    /// Opens a workspace under a fresh id. At capacity, the longest idle one is torn down first.
    pub async fn open(&self) -> Arc<Workspace> {
        let mut workspaces = self.workspaces.lock().await;
        while workspaces.len() >= self.capacity {
            let Some(oldest) = workspaces
                .values()
                .max_by_key(|w| w.idle_for())
                .map(|w| w.id)
            else {
                break;
            };
            if let Some(evicted) = workspaces.remove(&oldest) {
                evicted.teardown();
                debug!(workspace = %oldest, "Workspace evicted at capacity");
            }
        }

        let id = Uuid::new_v4();
        let workspace = Workspace::open(id, Arc::clone(&self.identity), self.success_delay).await;
        workspaces.insert(id, Arc::clone(&workspace));
        debug!(workspace = %id, "Workspace opened");
        workspace
    }

    pub async fn len(&self) -> usize {
        self.workspaces.lock().await.len()
    }

    /// Tears down and forgets every workspace idle for longer than `idle`.
    pub async fn evict_idle(&self, idle: Duration) -> usize {
        let mut workspaces = self.workspaces.lock().await;
        let stale: Vec<Uuid> = workspaces
            .values()
            .filter(|w| w.idle_for() > idle)
            .map(|w| w.id)
            .collect();
        for id in &stale {
            if let Some(workspace) = workspaces.remove(id) {
                workspace.teardown();
            }
        }
        stale.len()
    }

    /// Tears down every workspace, e.g. on shutdown.
    pub async fn close_all(&self) {
        for (_, workspace) in self.workspaces.lock().await.drain() {
            workspace.teardown();
        }
    }

    /// Periodically evicts idle workspaces until `cancel` fires.
    pub fn spawn_sweeper(self: &Arc<Self>, idle: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        let period = idle.min(MAX_SWEEP_INTERVAL).max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let evicted = registry.evict_idle(idle).await;
                        if evicted > 0 {
                            info!(evicted, "Evicted idle workspaces");
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryIdentityProvider;

    fn registry(capacity: usize) -> WorkspaceRegistry {
        WorkspaceRegistry::new(
            Arc::new(MemoryIdentityProvider::new()),
            Duration::from_millis(1500),
            capacity,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn known_ids_are_reused_unknown_ones_are_absent() {
        let registry = registry(8);
        let first = registry.open().await;
        assert!(!first.session.snapshot().loading);
        assert_eq!(first.collections.lock().await.len(), 6);

        let again = registry.get(first.id).await.unwrap();
        assert_eq!(again.id, first.id);
        assert!(registry.get(Uuid::new_v4()).await.is_none());

        let other = registry.open().await;
        assert_ne!(other.id, first.id);
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_workspaces_are_torn_down() {
        let registry = registry(8);
        let stale = registry.open().await;
        tokio::time::advance(Duration::from_secs(120)).await;
        let fresh = registry.open().await;

        let evicted = registry.evict_idle(Duration::from_secs(60)).await;

        assert_eq!(evicted, 1);
        assert!(stale.session.is_torn_down());
        assert!(!fresh.session.is_torn_down());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn full_registry_evicts_the_longest_idle() {
        let registry = registry(2);
        let oldest = registry.open().await;
        tokio::time::advance(Duration::from_secs(30)).await;
        let recent = registry.open().await;
        tokio::time::advance(Duration::from_secs(30)).await;

        let newest = registry.open().await;

        assert_eq!(registry.len().await, 2);
        assert!(oldest.session.is_torn_down());
        assert!(registry.get(oldest.id).await.is_none());
        assert!(registry.get(recent.id).await.is_some());
        assert!(registry.get(newest.id).await.is_some());
    }
}
