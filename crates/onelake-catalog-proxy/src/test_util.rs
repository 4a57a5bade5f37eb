use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Request, State};
use axum::Router;
use http::header::{HeaderName, ACCEPT, AUTHORIZATION};
use http::StatusCode;
use url::Url;

use crate::config::ConfigurationError;
use crate::service::token::{AccessToken, AuthError, TokenError, TokenProvider};

pub(crate) type CallCounter = Arc<AtomicUsize>;

/// Serve `router` on an ephemeral local port and return its base URL.
pub(crate) async fn serve_stub(router: Router) -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}").parse().unwrap()
}

/// Base URL of a local port nothing listens on.
pub(crate) async fn unreachable_url() -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}").parse().unwrap()
}

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub(crate) uri: String,
    pub(crate) authorization: Option<String>,
    pub(crate) accept: Option<String>,
}

/// Catalog stand-in answering every request with a fixed response.
#[derive(Debug, Clone)]
pub(crate) struct RecordingUpstream {
    status: StatusCode,
    body: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl RecordingUpstream {
    pub(crate) fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            requests: Arc::default(),
        }
    }

    pub(crate) fn router(&self) -> Router {
        Router::new().fallback(record).with_state(self.clone())
    }

    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn record(
    State(upstream): State<RecordingUpstream>,
    request: Request,
) -> (StatusCode, String) {
    let header = |name: HeaderName| {
        request
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };
    let recorded = RecordedRequest {
        uri: request.uri().to_string(),
        authorization: header(AUTHORIZATION),
        accept: header(ACCEPT),
    };
    upstream.requests.lock().unwrap().push(recorded);
    (upstream.status, upstream.body.clone())
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum TokenOutcome {
    Issue(&'static str),
    Reject,
    Unconfigured,
}

#[derive(Debug)]
pub(crate) struct StubTokenProvider {
    outcome: TokenOutcome,
    calls: CallCounter,
}

impl StubTokenProvider {
    pub(crate) fn new(outcome: TokenOutcome) -> Self {
        Self {
            outcome,
            calls: CallCounter::default(),
        }
    }

    pub(crate) fn calls(&self) -> CallCounter {
        self.calls.clone()
    }
}

#[async_trait::async_trait]
impl TokenProvider for StubTokenProvider {
    async fn acquire_token(&self) -> Result<AccessToken, TokenError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.outcome {
            TokenOutcome::Issue(token) => Ok(AccessToken::new(token, None)),
            TokenOutcome::Reject => Err(AuthError::Credential(azure_core::Error::message(
                azure_core::error::ErrorKind::Credential,
                "AADSTS7000215: Invalid client secret provided.",
            ))
            .into()),
            TokenOutcome::Unconfigured => {
                Err(ConfigurationError::MissingCredentials(vec!["TENANT_ID"]).into())
            }
        }
    }
}
