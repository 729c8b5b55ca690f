mod config;
mod error;
mod routes;

use netman_drivers::default_registry;
use netman_engine::{SessionConfig, SessionManager};
use std::net::SocketAddr;
use std::sync::Arc;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let config = match config::NetmanConfig::load() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("failed to load configuration: {err:?}");
            std::process::exit(1);
        }
    };

    let registry = default_registry();
    let sessions = SessionManager::new(
        registry,
        SessionConfig {
            inactivity_timeout: config.session_inactivity_timeout(),
        },
    );
    let state = AppState { sessions };

    let app = routes::router(state);

    let addr = match SocketAddr::from_str(&config.bind_address) {
        Ok(addr) => addr,
        Err(err) => {
            tracing::error!("invalid bind address {}: {err}", config.bind_address);
            std::process::exit(1);
        }
    };

    tracing::info!("netman listening on {addr}");
    let result = axum::Server::try_bind(&addr)
        .unwrap_or_else(|err| {
            tracing::error!("failed to bind {addr}: {err}");
            std::process::exit(2);
        })
        .serve(app.into_make_service())
        .await;

    if let Err(err) = result {
        tracing::error!("server error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();
}
