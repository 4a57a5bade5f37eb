use std::collections::HashMap;
use std::time::Duration;

use axum::body::Bytes;
use axum::response::{IntoResponse, Response};
use http::{header, StatusCode};
use url::Url;

use super::endpoint::{CatalogEndpoint, CatalogPath, ValidationError};
use super::token::{AccessToken, TokenError, TokenProvider};
use crate::config::ConfigurationError;

pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("Authentication required for OneLake tables call")]
    TokenMissing,
    #[error("{}", error_chain(.0))]
    UpstreamTransport(reqwest::Error),
}

impl ProxyError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::Validation(_) => StatusCode::BAD_REQUEST,
            ProxyError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::TokenMissing => StatusCode::UNAUTHORIZED,
            ProxyError::UpstreamTransport(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamBody {
    Json(serde_json::Value),
    /// Relayed byte for byte as `text/plain`.
    Raw(Bytes),
}

/// Catalog response as relayed to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: UpstreamBody,
}

impl UpstreamResponse {
    /// Successful responses are re-serialized if they are JSON, everything
    /// else is passed on unchanged with the upstream status.
    #[must_use]
    pub fn from_upstream(status: StatusCode, body: Bytes) -> Self {
        let body = if status.is_success() {
            serde_json::from_slice(&body).map_or(UpstreamBody::Raw(body), UpstreamBody::Json)
        } else {
            UpstreamBody::Raw(body)
        };
        Self { status, body }
    }
}

impl IntoResponse for UpstreamResponse {
    fn into_response(self) -> Response {
        match self.body {
            UpstreamBody::Json(value) => (self.status, axum::Json(value)).into_response(),
            UpstreamBody::Raw(bytes) => (
                self.status,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                bytes,
            )
                .into_response(),
        }
    }
}

/// Forwards catalog requests to the upstream Iceberg REST Catalog.
#[derive(Debug, Clone)]
pub struct CatalogProxy {
    client: reqwest::Client,
    base_uri: Url,
    timeout: Duration,
}

impl CatalogProxy {
    #[must_use]
    pub fn new(client: reqwest::Client, base_uri: Url) -> Self {
        Self {
            client,
            base_uri,
            timeout: DEFAULT_UPSTREAM_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn upstream_url(&self, endpoint: CatalogEndpoint, path: &CatalogPath) -> String {
        format!(
            "{}{}",
            self.base_uri.as_str().trim_end_matches('/'),
            endpoint.upstream_path(path)
        )
    }

    /// Serve one catalog request: validate the query, acquire a token and
    /// relay the upstream response. Always yields a response.
    pub async fn handle<T: TokenProvider + ?Sized>(
        &self,
        tokens: &T,
        endpoint: CatalogEndpoint,
        query: &HashMap<String, String>,
    ) -> Response {
        match self.proxy(tokens, endpoint, query).await {
            Ok(response) => response.into_response(),
            Err(e) => e.into_response(),
        }
    }

    /// # Errors
    /// - [`ProxyError::Validation`] if a required parameter is missing
    /// - [`ProxyError::Configuration`] if the service principal is incomplete
    /// - [`ProxyError::TokenMissing`] if no token could be acquired
    /// - [`ProxyError::UpstreamTransport`] if the catalog could not be reached
    pub async fn proxy<T: TokenProvider + ?Sized>(
        &self,
        tokens: &T,
        endpoint: CatalogEndpoint,
        query: &HashMap<String, String>,
    ) -> Result<UpstreamResponse, ProxyError> {
        let path = CatalogPath::from_query(endpoint, query)?;
        let url = self.upstream_url(endpoint, &path);

        let token = match tokens.acquire_token().await {
            Ok(token) => Some(token),
            Err(TokenError::Auth(e)) => {
                tracing::warn!(%endpoint, "Could not acquire OneLake token: {e}");
                None
            }
            Err(TokenError::Configuration(e)) => {
                tracing::error!(%endpoint, "Service principal is not configured: {e}");
                return Err(e.into());
            }
        };

        let Some(token) = token else {
            tracing::error!(%endpoint, "Token required for OneLake catalog call but not available");
            return Err(ProxyError::TokenMissing);
        };

        self.forward(&url, &token).await
    }

    /// Issue the upstream GET.
    ///
    /// # Errors
    /// Fails with [`ProxyError::UpstreamTransport`] if no response could be read.
    pub async fn forward(
        &self,
        url: &str,
        token: &AccessToken,
    ) -> Result<UpstreamResponse, ProxyError> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .bearer_auth(token.secret())
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::error!(%url, "OneLake catalog request failed: {e}");
                ProxyError::UpstreamTransport(e)
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            tracing::error!(%url, %status, "Failed to read OneLake catalog response: {e}");
            ProxyError::UpstreamTransport(e)
        })?;

        if status.is_success() {
            tracing::debug!(%url, %status, "OneLake catalog request succeeded");
        } else {
            tracing::error!(%url, %status, "OneLake catalog request failed");
        }

        Ok(UpstreamResponse::from_upstream(status, body))
    }
}
