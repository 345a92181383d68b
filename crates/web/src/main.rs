//! linkbio - link-in-bio web server.
//!
//! Serves the public profile page and the admin editor on port 3000.
//!
//! # Backends
//!
//! - `postgres` (default): documents, identity users and browser sessions in
//!   `PostgreSQL`. Run migrations first with `linkbio-cli migrate`.
//! - `memory`: everything in process memory, seeded with one admin user from
//!   `LINKBIO_ADMIN_EMAIL` / `LINKBIO_ADMIN_PASSWORD`. Data is lost on exit.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use secrecy::ExposeSecret;
use sentry::integrations::tracing as sentry_tracing;
use tower_sessions::MemoryStore;
use tower_sessions_sqlx_store::PostgresStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use linkbio_web::backend::memory::{MemoryDocumentStore, MemoryIdentityProvider};
use linkbio_web::backend::postgres::{PgDocumentStore, PgIdentityProvider};
use linkbio_web::build_app;
use linkbio_web::config::{BackendConfig, LinkbioConfig, LogFormat};
use linkbio_web::db;
use linkbio_web::state::AppState;

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &LinkbioConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        tracing::Level::TRACE => sentry_tracing::EventFilter::Ignore,
    }
}

/// Initialize tracing with `EnvFilter` and Sentry integration.
///
/// Defaults to info level for our crate if `RUST_LOG` is not set.
fn init_tracing(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "linkbio_web=info,linkbio=info,tower_http=debug".into());

    let json_layer = (format == LogFormat::Json)
        .then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (format == LogFormat::Pretty).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = LinkbioConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);
    init_tracing(config.log_format);

    let app = match &config.backend {
        BackendConfig::Postgres { database_url } => {
            let pool = db::create_pool(database_url)
                .await
                .expect("Failed to create database pool");
            tracing::info!("Database pool created");

            // NOTE: Migrations are NOT run automatically on startup.
            // Run them explicitly via: cargo run -p linkbio-cli -- migrate

            let state = AppState::new(
                config.clone(),
                Arc::new(PgIdentityProvider::new(pool.clone(), config.token_ttl)),
                Arc::new(PgDocumentStore::new(pool.clone())),
            );
            build_app(state, PostgresStore::new(pool))
        }
        BackendConfig::Memory { admin } => {
            let identity = MemoryIdentityProvider::new(config.token_ttl);
            match admin {
                Some(seed) => {
                    identity
                        .add_user(&seed.email, seed.password.expose_secret())
                        .await
                        .expect("Failed to seed admin user");
                    tracing::info!(email = %seed.email, "Seeded admin user");
                }
                None => tracing::warn!(
                    "Memory backend has no admin user; set LINKBIO_ADMIN_EMAIL and LINKBIO_ADMIN_PASSWORD"
                ),
            }
            tracing::warn!("Using the memory backend; data is lost on exit");

            let state = AppState::new(
                config.clone(),
                Arc::new(identity),
                Arc::new(MemoryDocumentStore::new()),
            );
            build_app(state, MemoryStore::default())
        }
    };

    // Start server
    let addr = config.socket_addr();
    tracing::info!("linkbio listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
