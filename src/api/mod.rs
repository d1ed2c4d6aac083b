use axum::{ routing::get, Router };

pub mod registry;

use crate::db::Registry;

#[derive(Clone)]
pub struct AppState {
    pub registry: Registry,
}

impl AppState {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }
}

/// Read-only routes over the persisted registry.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/chains", get(registry::list_chains))
        .route("/api/chains/{id}", get(registry::get_chain))
        .route("/api/evm-networks", get(registry::list_evm_networks))
        .route("/api/evm-networks/{id}", get(registry::get_evm_network))
        .route("/api/tokens", get(registry::list_tokens))
        .route("/api/tokens/{id}", get(registry::get_token))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
