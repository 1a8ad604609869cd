//! Prometheus metrics endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;

/// GET /metrics: renders the Prometheus exposition snapshot.
pub async fn get(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    metrics::counter!("metrics_scrapes_total").increment(1);

    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        handle.render(),
    )
}
