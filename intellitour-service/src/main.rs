use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

mod api;
mod assistant;
mod config;
mod db;
mod error;
mod i18n;
mod lookups;
mod service;
mod tools;

#[cfg(test)]
mod testing;

use crate::assistant::OpenAiAssistantClient;
use crate::config::AppConfig;
use crate::db::Database;
use crate::lookups::HttpTravelLookups;
use crate::service::{TravelAssistantService, resolve_assistant_id};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_logging();

    info!(
        "Starting IntelliTour service v{}",
        env!("CARGO_PKG_VERSION")
    );

    let mut config = AppConfig::load()?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        "Configuration loaded"
    );

    // Initialize the user -> thread registry
    let db_path = config.storage.thread_db_path();
    let db = Arc::new(Database::open(&db_path)?);
    info!(path = %db_path.display(), "Database initialized");

    // Provision the assistant if needed, then bind the client to it
    let provisioning = OpenAiAssistantClient::new(&config.assistant)?;
    config.assistant.assistant_id = resolve_assistant_id(&config.assistant, &provisioning).await?;
    let assistant = Arc::new(OpenAiAssistantClient::new(&config.assistant)?);
    info!(assistant_id = %config.assistant.assistant_id, "Assistant ready");

    let lookups = Arc::new(HttpTravelLookups::new(&config)?);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let service = Arc::new(TravelAssistantService::new(config, db, assistant, lookups));

    let app = api::router(service);

    info!(addr = %addr, "Starting HTTP server");
    let listener = TcpListener::bind(&addr).await?;
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
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("intellitour_service=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().event_format(format))
        .with(filter)
        .init();
}
