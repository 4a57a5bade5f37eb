use http::{HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use tower_http::trace::MakeSpan;
use tracing::{Level, Span};
use uuid::Uuid;

/// Generates a `UUIDv7` `x-request-id` for requests that don't carry one.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct MakeRequestUuid7;

impl MakeRequestId for MakeRequestUuid7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let request_id = HeaderValue::from_str(&Uuid::now_v7().to_string()).ok()?;
        Some(RequestId::new(request_id))
    }
}

/// Span for every inbound request carrying method, uri and request id.
#[derive(Clone, Debug)]
pub(crate) struct RestMakeSpan {
    level: Level,
}

impl RestMakeSpan {
    pub(crate) fn new(level: Level) -> Self {
        Self { level }
    }
}

impl<B> MakeSpan<B> for RestMakeSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("MISSING-REQUEST-ID");

        macro_rules! make_span {
            ($level:expr) => {
                tracing::span!(
                    $level,
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                    request_id = %request_id,
                )
            };
        }

        match self.level {
            Level::ERROR => make_span!(Level::ERROR),
            Level::WARN => make_span!(Level::WARN),
            Level::INFO => make_span!(Level::INFO),
            Level::DEBUG => make_span!(Level::DEBUG),
            _ => make_span!(Level::TRACE),
        }
    }
}
