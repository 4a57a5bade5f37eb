use onelake_catalog_proxy::api::router::{new_full_router, serve as service_serve};
use onelake_catalog_proxy::service::{CatalogProxy, ClientCredentialsTokenProvider};
use onelake_catalog_proxy::{ProxyConfig, STORAGE_SCOPE};

pub(crate) async fn serve(config: ProxyConfig) -> anyhow::Result<()> {
    let principal = config.service_principal();
    // Refuse to start without a complete service principal.
    principal.validate()?;

    if let Some(configured_scope) = config.ignored_scope() {
        tracing::warn!(
            configured_scope,
            used_scope = STORAGE_SCOPE,
            "ONELAKE_SCOPE differs from the scope tokens are requested for and is ignored."
        );
    }
    if let Some(endpoint) = &config.onelake_test_endpoint {
        tracing::info!(%endpoint, "ONELAKE_TEST_ENDPOINT is set but not used.");
    }
    tracing::debug!(?config, "Loaded configuration");

    let client = reqwest::Client::builder().build()?;
    let token_provider =
        ClientCredentialsTokenProvider::new(config.authority_host.clone(), principal)
            .with_timeout(config.upstream_timeout());
    let proxy = CatalogProxy::new(client, config.catalog_base_uri.clone())
        .with_timeout(config.upstream_timeout());

    let metrics_layer = if let Some(port) = config.metrics_port {
        Some(onelake_catalog_proxy::metrics::get_axum_layer_and_serve_metrics(port).await?)
    } else {
        None
    };

    let router = new_full_router(
        token_provider,
        proxy,
        &config.route_prefix(),
        config.request_timeout(),
        metrics_layer,
    );

    let bind_addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.listen_port));
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(
        catalog = %config.catalog_base_uri,
        route_prefix = %config.route_prefix(),
        "Listening on {bind_addr}"
    );

    service_serve(listener, router).await
}
