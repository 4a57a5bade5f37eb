use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use azure_core::auth::TokenCredential;
use azure_core::HttpClient;
use azure_identity::ClientSecretCredential;
use chrono::{DateTime, Utc};
use url::Url;
use veil::Redact;

use crate::config::{ConfigurationError, ServicePrincipal, STORAGE_SCOPE};

pub const DEFAULT_TOKEN_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Bearer token for the catalog. Never cached, one per request.
#[derive(Clone, PartialEq, Redact)]
pub struct AccessToken {
    #[redact]
    token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    #[must_use]
    pub fn new(token: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    #[must_use]
    pub fn secret(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Failed to acquire token from Entra ID: {0}")]
    Credential(#[source] azure_core::Error),
    #[error("Token request did not complete within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

#[async_trait::async_trait]
pub trait TokenProvider: Debug + Send + Sync + 'static {
    /// Acquire a fresh access token for the catalog.
    ///
    /// Missing credentials must be reported as [`TokenError::Configuration`]
    /// without contacting the identity provider.
    async fn acquire_token(&self) -> Result<AccessToken, TokenError>;
}

/// Acquires tokens from Microsoft Entra ID with the client-credentials grant
/// of the configured service principal.
#[derive(Debug, Clone)]
pub struct ClientCredentialsTokenProvider {
    http_client: Arc<dyn HttpClient>,
    authority_host: Url,
    principal: ServicePrincipal,
    timeout: Duration,
}

impl ClientCredentialsTokenProvider {
    #[must_use]
    pub fn new(authority_host: Url, principal: ServicePrincipal) -> Self {
        Self {
            http_client: azure_core::new_http_client(),
            authority_host,
            principal,
            timeout: DEFAULT_TOKEN_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait::async_trait]
impl TokenProvider for ClientCredentialsTokenProvider {
    async fn acquire_token(&self) -> Result<AccessToken, TokenError> {
        let credentials = self.principal.credentials()?;
        // A new credential per call, the credential would otherwise cache tokens.
        let credential = ClientSecretCredential::new(
            self.http_client.clone(),
            self.authority_host.clone(),
            credentials.tenant_id.to_string(),
            credentials.client_id.to_string(),
            credentials.client_secret.to_string(),
        );

        let token = tokio::time::timeout(self.timeout, credential.get_token(&[STORAGE_SCOPE]))
            .await
            .map_err(|_| {
                tracing::error!(timeout = ?self.timeout, "Token acquisition timed out");
                AuthError::Timeout(self.timeout)
            })?
            .map_err(|e| {
                tracing::error!("Token acquisition failed: {e}");
                AuthError::Credential(e)
            })?;

        let expires_at = DateTime::from_timestamp(token.expires_on.unix_timestamp(), 0);
        tracing::debug!(?expires_at, "Acquired OneLake token");
        Ok(AccessToken::new(token.token.secret(), expires_at))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::Ordering;

    use axum::extract::{Path, State};
    use axum::routing::post;
    use axum::{Form, Json, Router};
    use http::StatusCode;

    use super::*;
    use crate::test_util::{serve_stub, unreachable_url, CallCounter};

    fn principal() -> ServicePrincipal {
        ServicePrincipal {
            tenant_id: Some("my-tenant".to_string()),
            client_id: Some("my-client".to_string()),
            client_secret: Some("my-secret".to_string()),
        }
    }

    async fn identity_provider(
        State(calls): State<CallCounter>,
        Path(tenant): Path<String>,
        Form(form): Form<HashMap<String, String>>,
    ) -> (StatusCode, Json<serde_json::Value>) {
        calls.fetch_add(1, Ordering::SeqCst);
        let expected = [
            ("grant_type", "client_credentials"),
            ("client_id", "my-client"),
            ("client_secret", "my-secret"),
            ("scope", STORAGE_SCOPE),
        ];
        let valid = tenant == "my-tenant"
            && expected
                .iter()
                .all(|(k, v)| form.get(*k).map(String::as_str) == Some(*v));

        if valid {
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "token_type": "Bearer",
                    "expires_in": 3599,
                    "ext_expires_in": 3599,
                    "access_token": "issued-token"
                })),
            )
        } else {
            (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({
                    "error": "invalid_client",
                    "error_description": "AADSTS7000215: Invalid client secret provided."
                })),
            )
        }
    }

    async fn spawn_identity_provider() -> (Url, CallCounter) {
        let calls = CallCounter::default();
        let router = Router::new()
            .route("/:tenant/oauth2/v2.0/token", post(identity_provider))
            .with_state(calls.clone());
        (serve_stub(router).await, calls)
    }

    #[test]
    fn token_is_redacted() {
        let token = AccessToken::new("very-secret-token", None);
        assert!(!format!("{token:?}").contains("very-secret-token"));
        assert_eq!(token.secret(), "very-secret-token");
    }

    #[tokio::test]
    async fn acquires_token_with_storage_scope() {
        let (authority_host, calls) = spawn_identity_provider().await;
        let provider = ClientCredentialsTokenProvider::new(authority_host, principal());

        let token = provider.acquire_token().await.unwrap();
        assert_eq!(token.secret(), "issued-token");
        assert!(token.expires_at().unwrap() > Utc::now());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn every_call_requests_a_new_token() {
        let (authority_host, calls) = spawn_identity_provider().await;
        let provider = ClientCredentialsTokenProvider::new(authority_host, principal());

        provider.acquire_token().await.unwrap();
        provider.acquire_token().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn rejected_credentials_are_an_auth_error() {
        let (authority_host, calls) = spawn_identity_provider().await;
        let provider = ClientCredentialsTokenProvider::new(
            authority_host,
            ServicePrincipal {
                client_secret: Some("wrong-secret".to_string()),
                ..principal()
            },
        );

        let err = provider.acquire_token().await.unwrap_err();
        assert!(matches!(err, TokenError::Auth(AuthError::Credential(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_any_request() {
        let (authority_host, calls) = spawn_identity_provider().await;
        let provider = ClientCredentialsTokenProvider::new(
            authority_host,
            ServicePrincipal {
                tenant_id: None,
                ..principal()
            },
        );

        let err = provider.acquire_token().await.unwrap_err();
        assert!(matches!(
            err,
            TokenError::Configuration(ConfigurationError::MissingCredentials(_))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unreachable_identity_provider_is_an_auth_error() {
        let provider = ClientCredentialsTokenProvider::new(unreachable_url().await, principal());

        let err = provider.acquire_token().await.unwrap_err();
        assert!(matches!(err, TokenError::Auth(AuthError::Credential(_))));
    }

    #[tokio::test]
    async fn slow_identity_provider_times_out() {
        let router = Router::new().route(
            "/:tenant/oauth2/v2.0/token",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                StatusCode::OK
            }),
        );
        let provider = ClientCredentialsTokenProvider::new(serve_stub(router).await, principal())
            .with_timeout(Duration::from_millis(200));

        let err = provider.acquire_token().await.unwrap_err();
        assert!(matches!(err, TokenError::Auth(AuthError::Timeout(_))));
    }

    use needs_env_var::needs_env_var;

    #[needs_env_var(TEST_AZURE = 1)]
    mod azure_tests {
        use crate::service::token::{
            ClientCredentialsTokenProvider, TokenProvider, DEFAULT_AUTHORITY_HOST,
        };
        use crate::ServicePrincipal;

        #[tokio::test]
        async fn test_can_acquire_token() {
            let principal = ServicePrincipal {
                tenant_id: Some(std::env::var("AZURE_TENANT_ID").unwrap()),
                client_id: Some(std::env::var("AZURE_CLIENT_ID").unwrap()),
                client_secret: Some(std::env::var("AZURE_CLIENT_SECRET").unwrap()),
            };
            let provider = ClientCredentialsTokenProvider::new(
                DEFAULT_AUTHORITY_HOST.parse().unwrap(),
                principal,
            );

            let token = provider
                .acquire_token()
                .await
                .expect("failed to acquire token");
            assert!(!token.secret().is_empty());
        }
    }
}
