use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use tincan_server::{router, spawn_coordinator, ServerConfig};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "tincan_server=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::parse();
    let bind = config.bind;
    let app = router(spawn_coordinator(config));

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("tincan signaling server listening on http://{bind}");
    axum::serve(listener, app).await
}
