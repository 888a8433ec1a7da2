use std::{net::SocketAddr, sync::Arc};

use order_webhooks::{
    queue::{HttpBeacon, HttpSender, QueueConfig, QueueDeps, QueueManager, SystemClock},
    routes::router,
    state::AppState,
    storage::{KvStore, connect, migrate},
};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:order-webhooks.db".to_string());
    let bind_addr = std::env::var("ORDER_WEBHOOKS_BIND_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:3002".to_string());
    let admin_api_token = std::env::var("ORDER_WEBHOOKS_ADMIN_TOKEN")
        .ok()
        .filter(|token| !token.trim().is_empty());

    let pool = connect(&database_url).await?;
    migrate(&pool).await?;
    let store = KvStore::new(pool);

    let config = QueueConfig::from_env();
    let sender = HttpSender::new(config.webhook_url.clone(), config.request_timeout)?;
    let beacon = HttpBeacon::new(reqwest::Client::new(), config.webhook_url.clone());
    let deps = QueueDeps {
        store: store.clone(),
        sender: Arc::new(sender),
        beacon: Arc::new(beacon),
        clock: Arc::new(SystemClock),
    };
    let queue = QueueManager::start(config.clone(), deps);

    let state = AppState {
        store,
        queue: queue.clone(),
        config,
        admin_api_token,
    };
    let app = router(state);

    let addr: SocketAddr = bind_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "order webhook service listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let flushed = queue.shutdown().await?;
    info!(accepted = flushed.accepted, "order webhook service stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C, shutting down"),
        () = terminate => info!("received terminate signal, shutting down"),
    }
}
