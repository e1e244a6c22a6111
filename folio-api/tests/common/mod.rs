/// Common test utilities for integration tests
///
/// Builds the full router over the in-memory store:
/// - profile 42 (`a@x.com`)
/// - admin accounts 1 (`admin1@x.com`) and 2 (`admin2@x.com`)
/// - a recording mailer behind the notification dispatcher

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use folio_api::app::{build_router, AppState};
use folio_shared::auth::{CredentialService, TokenWhitelist};
use folio_shared::models::{NewUser, Profile, User};
use folio_shared::notify::{NotificationDispatcher, RecordingMailer, RetryPolicy};
use folio_shared::store::MemoryOnboardingStore;
use serde_json::Value;
use std::sync::Arc;
use tower::Service as _;

pub const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: Arc<MemoryOnboardingStore>,
    pub mailer: Arc<RecordingMailer>,
    pub credentials: CredentialService,
    pub dispatcher: NotificationDispatcher,
    pub app: Router,
    pub admin: User,
    pub second_admin: User,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_secret(Some(SECRET.to_string()))
    }

    pub fn with_secret(secret: Option<String>) -> Self {
        let store = Arc::new(MemoryOnboardingStore::new());
        store.insert_profile(Profile::new(42, "a@x.com").with_name("Ada"));
        let admin = store.seed_user(NewUser::admin("admin1@x.com"));
        let second_admin = store.seed_user(NewUser::admin("admin2@x.com"));

        let mailer = Arc::new(RecordingMailer::new());
        let dispatcher = NotificationDispatcher::new(mailer.clone(), RetryPolicy::no_retry(), 4);
        let credentials = CredentialService::new(secret, TokenWhitelist::new());

        let app = build_router(AppState::new(
            store.clone(),
            credentials.clone(),
            dispatcher.clone(),
        ));

        TestContext {
            store,
            mailer,
            credentials,
            dispatcher,
            app,
            admin,
            second_admin,
        }
    }

    /// Logs in through the API and returns the session token
    pub async fn login(&self, email: &str) -> String {
        let (status, body) = self
            .request(Method::POST, "/login", None, Some(serde_json::json!({ "email": email })))
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["token"].as_str().unwrap().to_string()
    }

    /// Sends a request and returns the status and JSON body (`Null` if empty)
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }
}
