use anyhow::{Context, Result};
use std::sync::Arc;

use simple_bank::config::AppConfig;
use simple_bank::db::Database;
use simple_bank::gateway::{self, state::AppState};
use simple_bank::store::PgStore;
use simple_bank::token::JwtMaker;

/// Get environment name from command line (--env / -e), default "dev"
fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = get_env();
    let mut app_config = AppConfig::load(&env)?;
    if let Some(port) = get_port_override() {
        app_config.server.port = port;
    }
    let _log_guard = simple_bank::logging::init_logging(&app_config);

    tracing::info!("Starting Simple Bank in {} mode", env);

    // PostgreSQL
    let db = Database::connect_with_timeout(
        &app_config.database.url,
        app_config.database.max_connections,
        app_config.database.acquire_timeout(),
    )
    .await
    .context("Failed to connect to PostgreSQL")?;
    db.health_check()
        .await
        .context("PostgreSQL health check failed")?;
    db.init_schema()
        .await
        .context("Failed to initialize schema")?;

    // Token maker
    let token_maker = JwtMaker::new(&app_config.token.symmetric_key)
        .context("Failed to create token maker")?;

    let state = AppState::new(
        Arc::new(PgStore::new(db.pool().clone())),
        Arc::new(token_maker),
        app_config.token.access_token_duration(),
        app_config.ledger.tx_timeout(),
    );

    gateway::run_server(&app_config.server_addr(), Arc::new(state)).await
}
