//! Contains Configuration of the proxy service
use std::collections::BTreeMap;
use std::time::Duration;

use figment::providers::{Env, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};
use url::Url;
use veil::Redact;

use crate::service::token::DEFAULT_AUTHORITY_HOST;

/// Scope the client-credentials token request is issued for.
///
/// `ONELAKE_SCOPE` is read into [`ProxyConfig::onelake_scope`] but token
/// requests always use this constant.
pub const STORAGE_SCOPE: &str = "https://storage.azure.com/.default";

const DEFAULT_CATALOG_BASE_URI: &str = "https://onelake.dfs.fabric.microsoft.com";

const SERVICE_ENV_PREFIX: &str = "ONELAKE_PROXY__";
const CREDENTIAL_KEYS: [&str; 3] = ["tenant_id", "client_id", "client_secret"];
const UNPREFIXED_KEYS: [&str; 5] = [
    "tenant_id",
    "client_id",
    "client_secret",
    "onelake_scope",
    "onelake_test_endpoint",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("{} must be set in the environment.", .0.join(", "))]
    MissingCredentials(Vec<&'static str>),
    #[error("Invalid configuration: {0}")]
    Invalid(Box<figment::Error>),
}

impl From<figment::Error> for ConfigurationError {
    fn from(value: figment::Error) -> Self {
        Self::Invalid(Box::new(value))
    }
}

#[derive(Clone, Deserialize, Serialize, PartialEq, Redact)]
/// Configuration of the proxy
pub struct ProxyConfig {
    /// Port to listen on.
    pub listen_port: u16,
    /// Port under which we serve metrics. Metrics are disabled if unset.
    pub metrics_port: Option<u16>,
    /// Path under which the catalog routes are mounted, `/api` by default.
    route_prefix: String,
    /// Base URL of the upstream Iceberg REST Catalog.
    pub catalog_base_uri: Url,
    /// Identity provider host, the tenant is appended to form the authority.
    pub authority_host: Url,
    pub upstream_timeout_seconds: u64,
    /// Upper bound for a whole inbound request including token acquisition.
    pub request_timeout_seconds: u64,

    // ------------- SERVICE PRINCIPAL -------------
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    #[redact]
    pub client_secret: Option<String>,
    /// Declared scope. Not used for token requests, see [`STORAGE_SCOPE`].
    pub onelake_scope: String,
    /// Declared, never called.
    pub onelake_test_endpoint: Option<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen_port: 8080,
            metrics_port: None,
            route_prefix: "/api".to_string(),
            catalog_base_uri: DEFAULT_CATALOG_BASE_URI.parse().expect("Valid URL"),
            authority_host: DEFAULT_AUTHORITY_HOST.parse().expect("Valid URL"),
            upstream_timeout_seconds: 30,
            request_timeout_seconds: 90,
            tenant_id: None,
            client_id: None,
            client_secret: None,
            onelake_scope: STORAGE_SCOPE.to_string(),
            onelake_test_endpoint: None,
        }
    }
}

impl ProxyConfig {
    /// Layered configuration sources, later sources win:
    /// defaults, `AZURE_*` credentials, unprefixed credentials and
    /// `ONELAKE_*` variables, then `ONELAKE_PROXY__*` service settings.
    #[must_use]
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(ProxyConfig::default()))
            .merge(verbatim(&Env::prefixed("AZURE_").only(&CREDENTIAL_KEYS)))
            .merge(verbatim(&Env::raw().only(&UNPREFIXED_KEYS)))
            .merge(Env::prefixed(SERVICE_ENV_PREFIX).split("__"))
    }

    /// Load the configuration from the process environment.
    ///
    /// # Errors
    /// Fails if a variable cannot be parsed into its setting, e.g. a malformed URL.
    pub fn load() -> Result<Self, ConfigurationError> {
        Ok(Self::figment().extract()?)
    }

    #[must_use]
    pub fn service_principal(&self) -> ServicePrincipal {
        ServicePrincipal {
            tenant_id: self.tenant_id.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
        }
    }

    /// The configured scope if it differs from the scope tokens are requested for.
    #[must_use]
    pub fn ignored_scope(&self) -> Option<&str> {
        (self.onelake_scope != STORAGE_SCOPE).then_some(self.onelake_scope.as_str())
    }

    /// Route prefix with a single leading slash and no trailing slash.
    /// Empty if the routes are mounted at the root.
    #[must_use]
    pub fn route_prefix(&self) -> String {
        let trimmed = self.route_prefix.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        }
    }

    #[must_use]
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_seconds)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Variables of `env` as plain strings. `Env` would turn values such as
/// `1234` or `true` into numbers and booleans.
fn verbatim(env: &Env) -> Serialized<BTreeMap<String, String>> {
    Serialized::defaults(
        env.iter()
            .map(|(key, value)| (key.as_str().to_ascii_lowercase(), value))
            .collect(),
    )
}

/// Client credentials of the service principal as found in the configuration.
#[derive(Clone, Default, PartialEq, Redact)]
pub struct ServicePrincipal {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    #[redact]
    pub client_secret: Option<String>,
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

pub(crate) struct Credentials<'a> {
    pub(crate) tenant_id: &'a str,
    pub(crate) client_id: &'a str,
    pub(crate) client_secret: &'a str,
}

impl ServicePrincipal {
    /// Check that tenant, client id and client secret are set and non-empty.
    ///
    /// # Errors
    /// Returns [`ConfigurationError::MissingCredentials`] naming every missing setting.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.credentials().map(|_| ())
    }

    pub(crate) fn credentials(&self) -> Result<Credentials<'_>, ConfigurationError> {
        match (
            present(self.tenant_id.as_deref()),
            present(self.client_id.as_deref()),
            present(self.client_secret.as_deref()),
        ) {
            (Some(tenant_id), Some(client_id), Some(client_secret)) => Ok(Credentials {
                tenant_id,
                client_id,
                client_secret,
            }),
            (tenant_id, client_id, client_secret) => {
                let missing = [
                    ("TENANT_ID", tenant_id.is_none()),
                    ("CLIENT_ID", client_id.is_none()),
                    ("CLIENT_SECRET", client_secret.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, missing)| missing.then_some(name))
                .collect();
                Err(ConfigurationError::MissingCredentials(missing))
            }
        }
    }
}
