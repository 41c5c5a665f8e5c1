use std::net::SocketAddr;
use std::path::PathBuf;

use tower_http::services::ServeDir;
use tracing::{info, warn};

use train_api::{AppStateInner, build_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "train_of_thought=debug,train_api=debug,train_db=info,tower_http=debug".into()),
        )
        .init();

    // Config
    let db_path = std::env::var("TRAIN_DB_PATH").unwrap_or_else(|_| "train-of-thought.db".into());
    let host = std::env::var("TRAIN_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("TRAIN_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let assets_dir: Option<PathBuf> = std::env::var("TRAIN_ASSETS_DIR").ok().map(PathBuf::from);

    // Init database
    let db = train_db::Database::open(&PathBuf::from(&db_path))?;
    let state = AppStateInner::new(db);

    let mut app = build_router(state);

    // Background image and audio loops are opaque files served as-is
    if let Some(dir) = assets_dir {
        if dir.is_dir() {
            info!("Serving assets from {}", dir.display());
            app = app.nest_service("/assets", ServeDir::new(dir));
        } else {
            warn!("TRAIN_ASSETS_DIR {} is not a directory; assets disabled", dir.display());
        }
    }

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Train of Thought listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
