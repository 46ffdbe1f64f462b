//! HTTP routes served by the gateway.

use axum::{Router, routing::get};

use crate::state::SharedState;

pub mod health;
pub mod metrics;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/metrics", get(metrics::metrics))
        .route("/health", get(health::health))
        .with_state(state)
}
