mod auth;
mod certificates;
mod config;
mod db;
mod error;
mod mail;
mod pdf;
mod render;
mod routes;
mod state;
mod storage;
mod templates;

use axum::http::{header, HeaderValue, Method};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::google::GoogleClient;
use crate::certificates::{CertificatePipeline, CertificateService, PreviewJanitor};
use crate::db::PgCertificateStore;
use crate::render::RendererConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "originhash=info,tower_http=info".into()),
        )
        .init();

    let config = config::Config::from_env()?;
    let config = Arc::new(config);

    crate::storage::ensure_dirs(&config.upload_folder)?;
    let fonts = Arc::new(RendererConfig::load(&config.font_dir)?);

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(pool.as_ref()).await?;

    if let Some(seed) = &config.super_admin {
        routes::bootstrap_super_admin(pool.as_ref(), seed)
            .await
            .map_err(|e| format!("super admin bootstrap failed: {e}"))?;
    }

    let janitor = PreviewJanitor::new();
    let certificates = CertificateService::new(
        Arc::new(PgCertificateStore::new(pool.clone())),
        CertificatePipeline::new(fonts, config.upload_folder.clone()),
        mail::from_config(&config.mail)?,
        janitor.clone(),
        config.preview_ttl,
        format!("{}/verify", config.frontend_url),
    );

    let google = match config.google.clone() {
        Some(google) => Some(Arc::new(GoogleClient::new(google)?)),
        None => {
            tracing::info!("Google sign-in disabled");
            None
        }
    };

    let state = Arc::new(state::AppState {
        pool,
        config: config.clone(),
        certificates,
        google,
    });

    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_str(&config.frontend_url)?)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("OriginHash listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let removed = janitor.drain().await;
    tracing::info!("Shutdown complete, removed {} pending previews", removed);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to listen for SIGTERM: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutting down");
}
