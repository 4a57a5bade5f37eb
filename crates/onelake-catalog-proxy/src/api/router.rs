use std::sync::Arc;
use std::time::Duration;

use axum::response::IntoResponse;
use axum::{routing::get, Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer, sensitive_headers::SetSensitiveHeadersLayer,
    timeout::TimeoutLayer, trace, trace::TraceLayer, ServiceBuilderExt,
};

use crate::api::{catalog, shutdown_signal, ApiContext, ProxyState};
use crate::service::health::HealthState;
use crate::service::{CatalogProxy, TokenProvider};
use crate::tracing::{MakeRequestUuid7, RestMakeSpan};

/// Build the proxy router: catalog routes below `route_prefix`, `/health` at
/// the root.
///
/// # Panics
/// If `route_prefix` is not empty and does not start with `/`.
#[allow(clippy::module_name_repetitions)]
pub fn new_full_router<T: TokenProvider>(
    token_provider: T,
    proxy: CatalogProxy,
    route_prefix: &str,
    request_timeout: Duration,
    metrics_layer: Option<PrometheusMetricLayer<'static>>,
) -> Router {
    let catalog_routes = catalog::router::<T>();
    let routes = if route_prefix.is_empty() {
        Router::new().merge(catalog_routes)
    } else {
        Router::new().nest(route_prefix, catalog_routes)
    };

    let routes = routes.route(
        "/health",
        get(|| async { Json(HealthState::healthy()).into_response() }),
    );
    let routes = match metrics_layer {
        Some(metrics_layer) => routes.layer(metrics_layer),
        None => routes,
    };

    routes
        .layer(axum::middleware::from_fn(
            crate::request_metadata::create_request_metadata_with_trace_id_fn,
        ))
        .layer(
            ServiceBuilder::new()
                .set_x_request_id(MakeRequestUuid7)
                .layer(SetSensitiveHeadersLayer::new([
                    axum::http::header::AUTHORIZATION,
                ]))
                .layer(
                    TraceLayer::new_for_http()
                        .on_failure(())
                        .make_span_with(RestMakeSpan::new(tracing::Level::INFO))
                        .on_response(trace::DefaultOnResponse::new().level(tracing::Level::DEBUG)),
                )
                .layer(TimeoutLayer::new(request_timeout))
                .layer(CatchPanicLayer::new())
                .propagate_x_request_id(),
        )
        .with_state(ApiContext {
            v1_state: ProxyState {
                tokens: Arc::new(token_provider),
                proxy,
            },
        })
}

/// Serve the given router on the given listener
///
/// # Errors
/// Fails if the webserver panics
pub async fn serve(listener: tokio::net::TcpListener, router: Router) -> anyhow::Result<()> {
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!(e).context("error running HTTP server"))
}
