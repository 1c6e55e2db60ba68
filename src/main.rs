mod config;
mod db;
mod frame;
mod rate_limit;
mod routes;
mod services;
mod state;
mod store;

use std::sync::Arc;

use config::ServerConfig;
use store::{MemoryStore, PgStore};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env();
    let port = config.port;

    let state = match config.database_url.clone() {
        Some(url) => match db::init_pool(&url, config.db_max_connections).await {
            Ok(pool) => {
                let store = Arc::new(PgStore::new(pool));
                state::AppState::new(store.clone(), store, config)
            }
            Err(e) => {
                tracing::error!(error = %e, "database init failed");
                return;
            }
        },
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            let store = Arc::new(MemoryStore::new());
            state::AppState::new(store.clone(), store, config)
        }
    };

    // Typing expiry and rate-limit pruning.
    let _sweeper = services::chat::spawn_sweeper(state.clone());

    let app = routes::app(state);
    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%port, error = %e, "failed to bind");
            return;
        }
    };

    tracing::info!(%port, "lobby listening");
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server failed");
    }
}
