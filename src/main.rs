// src/main.rs
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use governor::{Quota, RateLimiter};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod auth;
mod config;
mod db;
mod duplicates;
mod error;
mod import;
mod models;
mod pdf;
mod routes;
mod store;
mod validate;

#[cfg(test)]
mod pdf_tests;
#[cfg(test)]
mod store_tests;
#[cfg(test)]
mod validate_tests;

use config::Config;
use routes::AppState;
use store::RecordStore;

#[derive(Parser)]
#[command(name = "novedades-core", about = "Registro de novedades de personal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API server
    Serve,
    /// Bulk-import users from a CSV file (email,nombre,dependencia,password)
    ImportUsers {
        #[arg(long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("loading configuration from environment")?;
    let pool = db::init(&config.database_url)
        .await
        .context("initializing database")?;
    let store = RecordStore::new(pool);

    match Cli::parse().command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, store).await,
        Command::ImportUsers { file } => {
            let imported = import::import_users(&store, &file)
                .await
                .context("importing users")?;
            println!("Imported {} users", imported);
            Ok(())
        }
    }
}

async fn serve(config: Config, store: RecordStore) -> anyhow::Result<()> {
    info!("Starting API server");

    let quota = Quota::per_minute(
        NonZeroU32::new(config.rate_limit_requests).unwrap_or_else(|| NonZeroU32::new(1).unwrap()),
    );

    // Create application state with config
    let state = AppState {
        store,
        limiter: Arc::new(RateLimiter::keyed(quota)),
        config: Arc::new(config),
    };

    let addr = format!(
        "{}:{}",
        state.config.server_host, state.config.server_port
    );
    let app = routes::build_router(state);

    // Run the server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
