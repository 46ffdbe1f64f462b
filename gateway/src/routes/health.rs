use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::state::SharedState;

#[derive(Serialize)]
pub struct CollectorStatus {
    pub name: &'static str,
    pub enabled: bool,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub collectors: Vec<CollectorStatus>,
}

/// `GET /health`
///
/// Liveness plus the collectors this process was configured with. It does
/// not touch the node; use the `query_successful` metrics for that.
pub async fn health(State(state): State<SharedState>) -> (StatusCode, Json<HealthResponse>) {
    let collectors = state
        .collectors
        .iter()
        .map(|c| CollectorStatus {
            name: c.name(),
            enabled: c.enabled(),
        })
        .collect();

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            collectors,
        }),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use exporter::{Collector, NodeStatsCollector};

    use super::*;
    use crate::state::AppState;

    #[tokio::test]
    async fn health_lists_collectors() {
        let node_stats: Arc<dyn Collector> =
            Arc::new(NodeStatsCollector::new("node-stats-querier", None));
        let state: SharedState = Arc::new(AppState {
            collectors: vec![node_stats],
            collect_timeout: Duration::from_secs(1),
        });

        let (status, Json(body)) = health(State(state)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            serde_json::to_value(&body).expect("serializes"),
            serde_json::json!({
                "status": "ok",
                "collectors": [{ "name": "node-stats-querier", "enabled": false }]
            })
        );
    }
}
