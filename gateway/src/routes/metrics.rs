use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::state::SharedState;

/// `GET /metrics`
///
/// Runs one collection cycle on the blocking pool and returns the
/// Prometheus text exposition.
pub async fn metrics(State(state): State<SharedState>) -> Response {
    match tokio::task::spawn_blocking(move || state.scrape()).await {
        Ok(Ok(body)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, exporter::metrics::content_type())],
            body,
        )
            .into_response(),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "failed to render metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to render metrics: {e}"),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "metrics collection task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "metrics collection failed".to_string(),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use exporter::{Collector, UpgradeCollector};

    use super::*;
    use crate::state::AppState;

    #[tokio::test(flavor = "multi_thread")]
    async fn metrics_returns_prometheus_text() {
        let upgrades: Arc<dyn Collector> =
            Arc::new(UpgradeCollector::new("upgrades-querier", None, None));
        let state: SharedState = Arc::new(AppState {
            collectors: vec![upgrades],
            collect_timeout: Duration::from_secs(1),
        });

        let resp = metrics(State(state)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE],
            exporter::metrics::content_type()
        );

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        let text = String::from_utf8(body.to_vec()).expect("utf-8 body");
        assert!(text.contains("cosmos_node_exporter_scrape_duration_seconds"));
    }
}
