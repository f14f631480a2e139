use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{AuthState, Identity};
use crate::config::config;
use crate::database::RemoteStore;
use crate::handlers;
use crate::middleware::jwt_auth_middleware;
use crate::session::{DataContext, DataError, DataSession};

/// Shared state behind the router: the store and one data context per
/// signed-in user.
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn RemoteStore>,
    contexts: Arc<RwLock<HashMap<Uuid, Arc<DataContext>>>>,
}

impl AppState {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store, contexts: Arc::new(RwLock::new(HashMap::new())) }
    }

    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    /// Sign `identity` in, opening and loading its session unless one is
    /// already open for the same identity.
    pub async fn sign_in(&self, identity: Identity) -> Result<Arc<DataSession>, DataError> {
        let context = {
            let mut contexts = self.contexts.write().await;
            contexts
                .entry(identity.id)
                .or_insert_with(|| Arc::new(DataContext::new(self.store.clone())))
                .clone()
        };
        context
            .apply(&AuthState::signed_in(identity))
            .await
            .ok_or(DataError::NotAuthenticated)
    }

    /// Close the user's session. Returns whether one was open.
    pub async fn sign_out(&self, user_id: Uuid) -> bool {
        let removed = self.contexts.write().await.remove(&user_id);
        match removed {
            Some(context) => {
                context.apply(&AuthState::signed_out()).await;
                true
            }
            None => false,
        }
    }

    /// The open session for `identity`. A token whose claims no longer match
    /// the open session has to sign in again.
    pub async fn session_for(&self, identity: &Identity) -> Result<Arc<DataSession>, DataError> {
        let context = self
            .contexts
            .read()
            .await
            .get(&identity.id)
            .cloned()
            .ok_or(DataError::NotAuthenticated)?;
        let session = context.session().await.ok_or(DataError::NotAuthenticated)?;
        if session.identity() != identity {
            return Err(DataError::NotAuthenticated);
        }
        Ok(session)
    }

    pub async fn open_sessions(&self) -> usize {
        self.contexts.read().await.len()
    }
}

pub fn app(state: AppState) -> Router {
    let protected = Router::new()
        .merge(session_routes())
        .merge(project_routes())
        .merge(file_routes())
        .merge(lead_routes())
        .merge(brochure_routes())
        .route_layer(middleware::from_fn(jwt_auth_middleware));

    let router = Router::new()
        // Public
        .route("/", get(handlers::public::root))
        .route("/health", get(handlers::public::health))
        // Bearer token required
        .merge(protected)
        .with_state(state)
        // Global middleware
        .layer(cors_layer());

    if config().api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

fn session_routes() -> Router<AppState> {
    use handlers::session;

    Router::new()
        .route("/auth/session", post(session::open).delete(session::close))
        .route("/api/data", get(session::snapshot))
        .route("/api/data/refresh", post(session::refresh))
}

fn project_routes() -> Router<AppState> {
    use handlers::{projects, tasks};

    Router::new()
        .route("/api/projects", get(projects::list).post(projects::create))
        .route("/api/my-projects", get(projects::mine))
        .route(
            "/api/projects/:id",
            patch(projects::update).delete(projects::delete),
        )
        .route("/api/projects/:id/stages", get(projects::stages))
        .route("/api/projects/:id/tasks", get(tasks::list))
        .route("/api/stages/:id/progress", put(projects::stage_progress))
        .route("/api/stages/:id/approval", put(projects::stage_approval))
        .route("/api/tasks", post(tasks::create))
        .route("/api/tasks/:id/status", put(tasks::update_status))
        .route("/api/workload", get(projects::workload))
}

fn file_routes() -> Router<AppState> {
    use handlers::files;

    Router::new()
        .route("/api/files", post(files::upload))
        .route("/api/files/:id", patch(files::update))
        .route("/api/files/:id/download", post(files::download))
        .route("/api/downloads", get(files::history))
}

fn lead_routes() -> Router<AppState> {
    use handlers::leads;

    Router::new()
        .route("/api/leads", post(leads::create))
        .route("/api/leads/:id", patch(leads::update).delete(leads::delete))
}

fn brochure_routes() -> Router<AppState> {
    use handlers::brochures;

    Router::new()
        .route("/api/brochures", post(brochures::create))
        .route("/api/brochure-review", get(brochures::review_queue))
        .route("/api/brochures/:id", patch(brochures::update))
        .route("/api/brochures/:id/pages", get(brochures::pages).put(brochures::save_page))
        .route("/api/pages/:id/comments", get(brochures::comments).post(brochures::add_comment))
        .route("/api/pages/:id/approval", put(brochures::approve))
        .route("/api/pages/:id/lock", post(brochures::lock).delete(brochures::unlock))
}

fn cors_layer() -> CorsLayer {
    let configured = &config().security.cors_origins;
    if configured.iter().any(|origin| origin == "*") {
        info!("CORS open to any origin");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = configured
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
