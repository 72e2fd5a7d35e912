//! qrtag server - QR bracelet claiming and profile service.
//!
//! This binary serves the JSON API on port 3000.
//!
//! # Architecture
//!
//! - Axum web framework with cookie sessions (tower-sessions)
//! - `PostgreSQL` for accounts, profiles and sessions
//! - Object storage for profile photos, either local disk served under
//!   `/media` or a Supabase-compatible storage API
//!
//! Migrations are not run on startup. Run them explicitly via
//! `cargo run -p qrtag-cli -- migrate`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use axum::http::{HeaderValue, header};
use sentry::integrations::tracing as sentry_tracing;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use qrtag_server::config::{ServerConfig, StorageConfig};
use qrtag_server::db::{self, PgProfileStore};
use qrtag_server::middleware::{create_session_layer, request_id_middleware};
use qrtag_server::routes;
use qrtag_server::services::PgAuthProvider;
use qrtag_server::state::AppState;
use qrtag_server::storage::local::MEDIA_ROUTE;
use qrtag_server::storage::{HttpObjectStore, LocalObjectStore, ObjectStore};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ServerConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
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
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Build the photo object store from configuration.
///
/// Returns the local media root when files are served by this process.
fn build_object_store(
    config: &ServerConfig,
) -> Result<(Arc<dyn ObjectStore>, Option<std::path::PathBuf>), BoxError> {
    match &config.storage {
        StorageConfig::Local { root, bucket } => {
            let public_base = Url::parse(&config.base_url)?;
            let store = LocalObjectStore::new(root.clone(), bucket.clone(), public_base);
            let media_root = store.root().to_path_buf();
            Ok((Arc::new(store), Some(media_root)))
        }
        StorageConfig::Http {
            base_url,
            api_key,
            bucket,
            timeout,
        } => {
            let store =
                HttpObjectStore::new(base_url.clone(), api_key.clone(), bucket.clone(), *timeout)?;
            Ok((Arc::new(store), None))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load configuration from environment (needed for Sentry init)
    let config = ServerConfig::from_env()?;

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "qrtag_server=info,tower_http=debug".into());

    // JSON logs when LOG_FORMAT=json, text otherwise
    let is_json = std::env::var("LOG_FORMAT").is_ok_and(|v| v == "json");
    let json_layer = is_json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!is_json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    let (objects, media_root) = build_object_store(&config)?;
    tracing::info!(storage = ?config.storage, "Object store configured");

    let state = AppState::new(
        Arc::new(PgAuthProvider::new(pool.clone())),
        Arc::new(PgProfileStore::new(pool.clone())),
        objects,
        config.media,
    )?;

    let session_layer = create_session_layer(&pool, &config);

    let mut app = routes::routes(config.max_upload_bytes);
    if let Some(root) = media_root {
        // Photos are replaced in place under a stable key.
        let media = tower::ServiceBuilder::new()
            .layer(SetResponseHeaderLayer::overriding(
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-cache"),
            ))
            .service(ServeDir::new(root));
        app = app.nest_service(MEDIA_ROUTE, media);
    }

    let app = app
        .layer(session_layer)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let addr = config.socket_addr();
    tracing::info!("qrtag server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
