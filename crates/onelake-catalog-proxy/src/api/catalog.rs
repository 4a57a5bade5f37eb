use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::response::Response;
use axum::routing::get;
use axum::{Extension, Router};
use strum::IntoEnumIterator;

use super::{ApiContext, ProxyState};
use crate::request_metadata::RequestMetadata;
use crate::service::{CatalogEndpoint, TokenProvider};

/// One GET route per [`CatalogEndpoint`], all served by the same handler.
pub fn router<T: TokenProvider>() -> Router<ApiContext<ProxyState<T>>> {
    CatalogEndpoint::iter().fold(Router::new(), |router, endpoint| {
        router.route(
            &format!("/{}", endpoint.route()),
            get(
                move |state: State<ApiContext<ProxyState<T>>>,
                      metadata: Extension<RequestMetadata>,
                      query: Query<HashMap<String, String>>| {
                    proxy_catalog_request(endpoint, state, metadata, query)
                },
            ),
        )
    })
}

async fn proxy_catalog_request<T: TokenProvider>(
    endpoint: CatalogEndpoint,
    State(context): State<ApiContext<ProxyState<T>>>,
    Extension(metadata): Extension<RequestMetadata>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    tracing::info!(
        %endpoint,
        request_id = %metadata.request_id,
        "Processing OneLake catalog request"
    );
    let ProxyState { tokens, proxy } = context.v1_state;
    proxy.handle(tokens.as_ref(), endpoint, &query).await
}
