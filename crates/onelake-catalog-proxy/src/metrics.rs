use std::net::SocketAddr;

use axum::{routing::get, Router};
use axum_prometheus::PrometheusMetricLayer;

/// Installs the global Prometheus recorder, serves it under
/// `0.0.0.0:{metrics_port}/metrics` from a background task and returns the
/// layer recording request counts and latencies per route.
///
/// Must be called at most once per process.
///
/// # Errors
/// Fails if the metrics port cannot be bound.
pub async fn get_axum_layer_and_serve_metrics(
    metrics_port: u16,
) -> anyhow::Result<PrometheusMetricLayer<'static>> {
    let (layer, handle) = PrometheusMetricLayer::pair();

    let listener =
        tokio::net::TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], metrics_port))).await?;
    let router = Router::new().route(
        "/metrics",
        get(move || std::future::ready(handle.render())),
    );

    tokio::task::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!("Metrics server failed: {e}");
        }
    });

    tracing::info!(metrics_port, "Serving Prometheus metrics");
    Ok(layer)
}
