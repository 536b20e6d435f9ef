use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

mod api;
mod backend;
mod config;
mod desk;
mod documents;
mod error;
mod geometry;
mod i18n;
mod signature;
mod view;
mod websocket;
mod workspace;

#[cfg(test)]
mod test_support;

use crate::api::AppState;
use crate::backend::SigningBackendClient;
use crate::config::load_config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    info!("Starting signing desk v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        backend = %config.backend.api_url,
        "Configuration loaded"
    );

    let client = SigningBackendClient::new(&config.backend.api_url, config.backend.timeout_secs)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, client));
    let app = api::router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let format = fmt::format()
        .with_target(true)
        .with_thread_ids(true)
        .compact();

    // Use RUST_LOG if set, otherwise default to info level for our crate
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("signing_desk=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().event_format(format))
        .with(filter)
        .init();
}
