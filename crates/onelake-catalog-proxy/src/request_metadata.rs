use axum::middleware::Next;
use axum::response::Response;
use http::HeaderMap;
use uuid::Uuid;

/// A struct to hold metadata about a request.
#[derive(Debug, Clone)]
pub(crate) struct RequestMetadata {
    /// The `x-request-id` as received, it is not required to be a UUID.
    pub(crate) request_id: String,
}

pub(crate) async fn create_request_metadata_with_trace_id_fn(
    headers: HeaderMap,
    mut request: axum::extract::Request,
    next: Next,
) -> Response {
    let request_id = headers
        .get("x-request-id")
        .and_then(|hv| hv.to_str().ok())
        .map_or_else(|| Uuid::now_v7().to_string(), ToString::to_string);
    request
        .extensions_mut()
        .insert(RequestMetadata { request_id });
    next.run(request).await
}
