/// Application state and router builder
///
/// The router is generic over the [`OnboardingStore`], so the same routes run
/// against PostgreSQL in production and the in-memory store in tests.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use folio_api::app::{build_router, AppState};
/// use folio_shared::auth::{CredentialService, TokenWhitelist};
/// use folio_shared::notify::{LogMailer, NotificationDispatcher, RetryPolicy};
/// use folio_shared::store::MemoryOnboardingStore;
///
/// let store = Arc::new(MemoryOnboardingStore::new());
/// let credentials = CredentialService::new(Some("secret".into()), TokenWhitelist::new());
/// let dispatcher = NotificationDispatcher::new(Arc::new(LogMailer), RetryPolicy::default(), 32);
///
/// let app = build_router(AppState::new(store, credentials, dispatcher));
/// ```

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use folio_shared::{
    auth::{require_session, CredentialService},
    notify::NotificationDispatcher,
    onboarding::InvitationWorkflow,
    store::OnboardingStore,
};
use std::sync::Arc;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::routes;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor; every
/// field is a cheap handle.
pub struct AppState<S: OnboardingStore> {
    pub store: Arc<S>,
    pub credentials: CredentialService,
    pub workflow: InvitationWorkflow<S>,
}

impl<S: OnboardingStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            credentials: self.credentials.clone(),
            workflow: self.workflow.clone(),
        }
    }
}

impl<S: OnboardingStore> AppState<S> {
    pub fn new(
        store: Arc<S>,
        credentials: CredentialService,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        let workflow = InvitationWorkflow::new(Arc::clone(&store), dispatcher);
        Self {
            store,
            credentials,
            workflow,
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET  /health                       # Store probe (public)
/// ├── POST /login                        # Issue session (public)
/// ├── POST /logout                       # Revoke session (gated)
/// └── /profiles/:id
///     ├── POST /invite                   # send_invitation (gated)
///     └── POST /admin_invite             # complete_invitation (gated)
/// ```
///
/// Gated routes sit behind the session gate; a request it rejects never
/// reaches the handler.
pub fn build_router<S: OnboardingStore>(state: AppState<S>) -> Router {
    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check::<S>))
        .route("/login", post(routes::auth::login::<S>));

    let gated_routes = Router::new()
        .route("/logout", post(routes::auth::logout::<S>))
        .route(
            "/profiles/:id/invite",
            post(routes::invitations::send_invitation::<S>),
        )
        .route(
            "/profiles/:id/admin_invite",
            post(routes::invitations::complete_invitation::<S>),
        )
        .layer(middleware::from_fn_with_state(
            state.credentials.clone(),
            require_session,
        ));

    Router::new()
        .merge(public_routes)
        .merge(gated_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
