//! Taskboard task server.
//!
//! # Usage
//!
//! ```bash
//! # Listen on 127.0.0.1:3000 with the default database
//! cargo run --bin taskboard-server
//!
//! # Custom address and database, with the default categories
//! cargo run --bin taskboard-server -- --bind 0.0.0.0:8080 --database ./tasks.db --seed-categories
//!
//! # Or via environment variables
//! TASKBOARD_ADDR=0.0.0.0:8080 TASKBOARD_DB=./tasks.db cargo run --bin taskboard-server
//! ```

use std::sync::Arc;

use clap::Parser;
use taskboard_server::config::{ServerCliArgs, ServerConfig};
use taskboard_server::http;
use taskboard_server::service::TaskService;
use taskboard_server::store::{self, SqliteStore};

#[tokio::main]
async fn main() {
    let cli = ServerCliArgs::parse();

    let config = match ServerConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(
        addr = %config.bind_addr,
        database = %config.database_path.display(),
        "starting taskboard server"
    );

    let store = match SqliteStore::open(&config.database_path) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "failed to open database");
            std::process::exit(1);
        }
    };

    if config.seed_categories {
        match store::seed_default_categories(&store).await {
            Ok(categories) => tracing::info!(count = categories.len(), "seeded categories"),
            Err(e) => {
                tracing::error!(error = %e, "failed to seed categories");
                std::process::exit(1);
            }
        }
    }

    let service = TaskService::new(Arc::new(store));

    match http::start_server(&config.bind_addr, service).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "task server listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "task server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start task server");
            std::process::exit(1);
        }
    }
}
