use product_service::{
    build_state, create_app,
    infrastructure::{
        config::{load_dotenv, AppConfig},
        database::DatabaseManager,
        logger::Logger,
    },
};
use tokio::{net::TcpListener, signal};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // `.env` 中的 RUST_LOG 需在日志初始化前生效
    let dotenv = load_dotenv();
    Logger::init();
    match dotenv {
        Ok(Some(path)) => info!(path = %path.display(), "Loaded environment file"),
        Ok(None) => {}
        Err(e) => warn!("Failed to load .env file: {}", e),
    }

    let config = AppConfig::from_env().map_err(|e| {
        error!("Configuration error: {}", e);
        e
    })?;

    let database = DatabaseManager::new(&config.database, &config.pool);
    let state = build_state(&config, &database);
    let app = create_app(state, config.server.request_timeout);

    let listener = TcpListener::bind(config.server.bind).await?;
    let addr = listener.local_addr()?;
    info!(
        %addr,
        failure_mode = ?config.server.failure_mode,
        "Product service listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    database.close().await;
    info!("Product service stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("Received Ctrl+C, shutting down"),
        _ = terminate => warn!("Received SIGTERM, shutting down"),
    }
}
