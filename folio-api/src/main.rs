//! # Folio API Server
//!
//! HTTP entry point for profile onboarding: session login/logout and the
//! two-phase invitation workflow.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/folio JWT_SECRET=... cargo run -p folio-api
//! ```

use anyhow::Context;
use folio_api::{
    app::{build_router, AppState},
    config::Config,
};
use folio_shared::{
    auth::{CredentialService, TokenWhitelist},
    db::pool::{self, create_pool},
    notify::{HttpMailer, LogMailer, Mailer, MailerConfig, NotificationDispatcher},
    store::PgOnboardingStore,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "folio_api=debug,folio_shared=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Folio API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let db = create_pool(pool::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await
    .context("Failed to connect to the database")?;

    let store = Arc::new(PgOnboardingStore::new(db.clone()));

    // The whitelist lives for the process; a restart logs everyone out
    let credentials = CredentialService::new(config.jwt.secret.clone(), TokenWhitelist::new());
    if !credentials.has_secret() {
        tracing::warn!("JWT_SECRET is not set; login and every gated route will fail");
    }

    let mailer: Arc<dyn Mailer> = match &config.mail.endpoint {
        Some(endpoint) => {
            let mut mailer_config = MailerConfig::new(endpoint.clone(), config.mail.from.clone());
            mailer_config.api_key = config.mail.api_key.clone();
            let mailer = HttpMailer::new(mailer_config)?;
            tracing::info!(endpoint = %mailer.endpoint(), "Sending mail through HTTP relay");
            Arc::new(mailer)
        }
        None => {
            tracing::info!("MAIL_ENDPOINT is not set; mail will only be logged");
            Arc::new(LogMailer)
        }
    };

    let dispatcher = NotificationDispatcher::new(
        mailer,
        config.notify.retry_policy(),
        config.notify.max_in_flight,
    );

    let app = build_router(AppState::new(store, credentials, dispatcher.clone()));

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown signal received, draining notifications...");
    dispatcher.shutdown().await;
    pool::close_pool(db).await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
