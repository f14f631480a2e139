use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::auth::AuthState;
use crate::database::RemoteStore;

use super::DataSession;

/// Owns the data session for whoever is signed in. Reacts to auth
/// transitions only: entering an authenticated state (or switching users)
/// opens a fresh session and loads it; leaving it empties and drops the
/// session.
pub struct DataContext {
    store: Arc<dyn RemoteStore>,
    session: RwLock<Option<Arc<DataSession>>>,
}

impl DataContext {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store, session: RwLock::new(None) }
    }

    pub async fn session(&self) -> Option<Arc<DataSession>> {
        self.session.read().await.clone()
    }

    /// Bring the session in line with `state`. Returns the session that is
    /// current afterwards.
    pub async fn apply(&self, state: &AuthState) -> Option<Arc<DataSession>> {
        let identity = match (&state.user, state.is_authenticated) {
            (Some(identity), true) => identity.clone(),
            _ => {
                if let Some(previous) = self.session.write().await.take() {
                    previous.clear().await;
                }
                return None;
            }
        };

        let fresh = {
            let mut slot = self.session.write().await;
            if let Some(existing) = slot.as_ref() {
                if existing.identity() == &identity {
                    return Some(existing.clone());
                }
                existing.clear().await;
            }
            let fresh = Arc::new(DataSession::open(self.store.clone(), identity));
            *slot = Some(fresh.clone());
            fresh
        };

        if let Err(e) = fresh.refresh_data().await {
            error!(user = %fresh.identity().id, error = %e, "initial data load failed");
        }
        Some(fresh)
    }

    /// Follow an auth channel until it closes
    pub fn spawn_listener(self: Arc<Self>, mut rx: watch::Receiver<AuthState>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let initial = rx.borrow_and_update().clone();
            self.apply(&initial).await;
            while rx.changed().await.is_ok() {
                let state = rx.borrow_and_update().clone();
                self.apply(&state).await;
            }
            info!("auth channel closed, stopping data context listener");
        })
    }
}
