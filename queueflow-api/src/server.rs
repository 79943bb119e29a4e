//! axum host for the messaging API

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use bytes::Bytes;
use queueflow_core::{ApiResponse, CONTENT_TYPE_JSON};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::router::{ApiRequest, DispatchError, MessagingApi};

/// Create the HTTP router.
///
/// Every method and path goes to the messaging API, which matches on the
/// path suffix, so the service can sit behind any prefix or stage name.
pub fn create_router(api: Arc<MessagingApi>) -> Router {
    Router::new()
        .fallback(handle_any)
        .layer(TraceLayer::new_for_http())
        .with_state(api)
}

async fn handle_any(
    State(api): State<Arc<MessagingApi>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Result<Response, DispatchError> {
    let body = (!body.is_empty()).then_some(body);
    let request = ApiRequest::with_raw_body(method, uri.path(), body);

    let response = api.handle(&request).await?;
    Ok(json_response(&response))
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        error!(error = %self, "Request failed");
        json_response(&self.to_response())
    }
}

fn json_response(response: &ApiResponse) -> Response {
    let mut http_response = Response::new(Body::from(response.body()));
    *http_response.status_mut() =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    http_response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(CONTENT_TYPE_JSON),
    );
    http_response
}
