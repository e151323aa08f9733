//! Server entry point.

use anyhow::Result;
use std::net::SocketAddr;
use tokio::signal;
use tracing::info;

use adsearch_common::logging::{init_logging, LogConfig};
use adsearch_server::{
    api::{self, AppState},
    config::Config,
    db,
    search::SearchClient,
};

#[tokio::main]
async fn main() -> Result<()> {
    let mut log_config = LogConfig::from_env()?;
    if std::env::var("LOG_FILE_PREFIX").is_err() {
        log_config.log_file_prefix = "adsearch-server".to_string();
    }
    if log_config.filter_directives.is_none() {
        log_config.filter_directives =
            Some("adsearch_server=debug,tower_http=debug,sqlx=info".to_string());
    }
    init_logging(&log_config)?;

    info!("starting adsearch server");

    let config = Config::load()?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        "configuration loaded"
    );

    let pool = db::connect_pool(&config.database).await?;

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .map_err(|err| anyhow::anyhow!("failed to run migrations: {err}"))?;
    info!("database migrations completed");

    let search = SearchClient::new(&config.search)?;
    search.ping().await?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let state = AppState {
        db: pool,
        search,
        config,
    };
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install terminate handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
