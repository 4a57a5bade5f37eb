use onelake_catalog_proxy::service::health::HealthState;
use onelake_catalog_proxy::ProxyConfig;

pub(crate) async fn health(config: &ProxyConfig) -> anyhow::Result<()> {
    tracing::info!("Checking health...");
    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://localhost:{}/health", config.listen_port))
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        tracing::info!("Server is not healthy: StatusCode: '{}'", status);
        std::process::exit(1);
    }

    let body = response.json::<HealthState>().await?;
    // Fail with an error if the server is not healthy
    if body.is_healthy() {
        tracing::info!("Server is healthy.");
    } else {
        tracing::info!(?body, "Server is not healthy: StatusCode: '{}'", status);
        std::process::exit(1);
    }
    Ok(())
}
