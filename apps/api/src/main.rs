mod acl;
mod auth;
mod config;
mod errors;
mod records;
mod routes;
mod state;
mod storage;
#[cfg(test)]
mod testing;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::provider::{IdentityProvider, IdentityToolkitClient};
use crate::auth::SessionManager;
use crate::config::Config;
use crate::records::client::BaasClient;
use crate::records::RecordStore;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::S3PhotoStorage;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting DriveHouse API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized");

    // Identity provider client (one per process)
    let provider: Arc<dyn IdentityProvider> =
        Arc::new(IdentityToolkitClient::new(config.identity_api_key.clone()));
    info!(
        "Identity provider client initialized (project: {})",
        config.identity_project_id
    );

    // Record store client, unless the deployment URL is the placeholder
    let records: Option<Arc<dyn RecordStore>> = if config.record_store_configured() {
        let url = config.record_store_url.clone().unwrap_or_default();
        info!("Record store client initialized ({url})");
        Some(Arc::new(BaasClient::new(url)))
    } else {
        warn!("Record store not configured, user sync disabled");
        None
    };

    let photo_storage = Arc::new(S3PhotoStorage::new(
        s3,
        config.s3_bucket.clone(),
        config.s3_endpoint.clone(),
    ));

    let sessions = Arc::new(SessionManager::new(
        provider.clone(),
        records.clone(),
        photo_storage,
    ));

    // Log session transitions as subscribers see them
    let mut events = sessions.subscribe();
    tokio::spawn(async move {
        while events.changed().await.is_ok() {
            let snapshot = events.borrow_and_update().clone();
            info!(state = ?snapshot.state, loading = snapshot.loading, "Session transition");
        }
    });

    // Bootstrap: a custom token injected by the hosting environment wins,
    // otherwise start anonymous. A failure here leaves the manager in its
    // error state; the sign-in routes recover from it.
    if let Err(e) = sessions
        .initialize(config.initial_auth_token.as_deref())
        .await
    {
        error!("Auth initialization failed: {e}");
    }

    // Build app state
    let state = AppState {
        sessions,
        provider,
        records,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "drivehouse-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
