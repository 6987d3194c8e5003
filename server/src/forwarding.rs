use crate::error::RelayError;
use crate::models::{PassThroughHeaders, QueryParams, RelayMethod, TargetUrl};
use crate::AppState;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Method, Uri};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

#[axum::debug_handler]
pub async fn relay_handler(
    State(app_state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    relay(
        &app_state,
        method,
        uri.query().unwrap_or_default(),
        headers,
        body,
    )
    .await
}

/// Relays one inbound request to the URL named by its `externalApiUrl` query
/// parameter and mirrors the upstream answer back.
///
/// Always answers: 400 for a bad target, the upstream status on success, 500
/// on any transport failure.
pub async fn relay(
    app_state: &AppState,
    method: Method,
    query: &str,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let params = QueryParams::parse(query);
    let target = match TargetUrl::from_query(&params) {
        Ok(target) => target,
        Err(e) => {
            debug!(reason = %e, "Rejecting request without a usable target");
            return e.into_response();
        }
    };

    let request_id = Uuid::new_v4();
    let span = info_span!("relay", %request_id, %method, %target);

    async move {
        match forward_to_upstream(app_state, target, RelayMethod::from(&method), headers, body)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Exception occurred while relaying request");
                e.into_response()
            }
        }
    }
    .instrument(span)
    .await
}

async fn forward_to_upstream(
    app_state: &AppState,
    target: TargetUrl,
    method: RelayMethod,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, RelayError> {
    // Scoped to this call; dropped with its connections on every return path.
    let http_client = app_state.http_client().map_err(RelayError::Client)?;

    let outbound_headers = PassThroughHeaders::from_inbound(&headers);
    info!(
        "Forwarding {:?} request with {} headers and {} body bytes",
        method,
        outbound_headers.len(),
        if method == RelayMethod::Post { body.len() } else { 0 }
    );

    let mut request_builder = http_client
        .request(method.into(), target.into_url())
        .headers(outbound_headers.into_inner());

    if method == RelayMethod::Post {
        request_builder = request_builder.body(body);
    }

    let upstream = request_builder.send().await?;
    let status = upstream.status();
    let relayed_headers = PassThroughHeaders::from_upstream(upstream.headers());
    let upstream_body = upstream.bytes().await?;

    info!(
        "Received upstream response. Status: {}, {} body bytes",
        status,
        upstream_body.len()
    );

    let mut response = Response::new(Body::from(upstream_body));
    *response.status_mut() = status;
    *response.headers_mut() = relayed_headers.into_inner();
    Ok(response)
}
