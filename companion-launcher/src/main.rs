mod cli;

use axum::Router;
use backend::AppState;
use backend::completion::build_provider;
use backend::notify::LogNotifier;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
    let cli = cli::Cli::parse();

    let store = backend::store::open(&cli.store_config()).await?;
    let provider = build_provider(cli.provider_config());
    let state = AppState::new(store, provider, Arc::new(LogNotifier), cli.app_options()).await;

    let router = match &cli.dist_dir {
        Some(dir) => Router::new().fallback_service(ServeDir::new(dir)),
        None => Router::new(),
    };
    let addr = SocketAddr::new(cli.host, cli.port);
    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let router = backend::init(router, state);
    axum::serve(listener, router).await?;
    Ok(())
}
