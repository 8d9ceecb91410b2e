//! cinescope-web - movie discovery web service
//!
//! Serves the browsing UI and JSON API, holding sessions and the
//! catalog cache in local SQLite while the movie catalog, identity
//! provider, and ratings store remain hosted services.

use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use cinescope_common::config;
use cinescope_common::db::{self, settings};
use cinescope_web::firebase::auth::FirebaseAuthClient;
use cinescope_web::firebase::firestore::FirestoreClient;
use cinescope_web::tmdb::TmdbClient;
use cinescope_web::{build_router, session, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification immediately for instant startup feedback
    info!(
        "Starting Cinescope (cinescope-web) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let data_dir = config::resolve_data_dir(std::env::args().nth(1).as_deref());
    config::ensure_data_dir(&data_dir)?;

    let app_config = config::load_app_config(&data_dir)?;

    let db_path = config::database_path(&data_dir);
    info!("Database path: {}", db_path.display());

    let pool = db::init_database(&db_path).await?;
    info!("✓ Database initialized");

    match session::sweep_expired_sessions(&pool).await {
        Ok(0) => {}
        Ok(n) => info!("Removed {} expired session(s)", n),
        Err(e) => warn!("Session sweep failed: {}", e),
    }

    let tmdb_api_key = config::resolve_tmdb_api_key(&pool, &app_config).await?;
    let firebase_api_key = config::resolve_firebase_api_key(&pool, &app_config).await?;
    let firebase_project_id = config::resolve_firebase_project_id(&pool, &app_config).await?;

    let language = settings::get_catalog_language(&pool).await?;
    let timeout = Duration::from_millis(settings::get_http_request_timeout_ms(&pool).await?);

    let tmdb = TmdbClient::new(tmdb_api_key, language, timeout)?;
    let auth = FirebaseAuthClient::new(firebase_api_key, timeout)?;
    let firestore = FirestoreClient::new(firebase_project_id, timeout)?;
    info!("✓ Upstream service clients ready");

    let state = AppState::new(pool, tmdb, auth, firestore);
    let app = build_router(state);

    let bind_addr = format!("{}:{}", app_config.bind_address(), app_config.port());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("cinescope-web listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("cinescope-web shut down cleanly");

    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM so in-flight requests can finish
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl-C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => warn!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
