//! AWS Lambda host for the messaging API
//!
//! Implements the client side of the Lambda Runtime API: fetch the next
//! invocation, route the API Gateway HTTP API (payload format 2.0) event
//! through [`MessagingApi`], and post the proxy response back. A failed send
//! or publish is reported as an invocation error, which API Gateway turns
//! into a 500.

use axum::http::Method;
use base64::Engine;
use bytes::Bytes;
use queueflow_core::{ApiResponse, CONTENT_TYPE_JSON};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::router::{ApiRequest, MessagingApi};

const REQUEST_ID_HEADER: &str = "Lambda-Runtime-Aws-Request-Id";
const ERROR_TYPE_HEADER: &str = "Lambda-Runtime-Function-Error-Type";

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Runtime API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invocation is missing the Lambda-Runtime-Aws-Request-Id header")]
    MissingRequestId,
}

/// Reasons an invocation event could not be turned into an [`ApiRequest`]
#[derive(Debug, Error)]
pub enum EventError {
    #[error("Invalid event: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("Invalid base64 body: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// API Gateway HTTP API proxy event (payload format 2.0), reduced to the
/// fields the router reads
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGatewayV2Request {
    #[serde(default)]
    pub raw_path: Option<String>,
    #[serde(default)]
    pub request_context: Option<RequestContext>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct RequestContext {
    #[serde(default)]
    pub http: Option<HttpDescription>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HttpDescription {
    #[serde(default)]
    pub method: Option<String>,
}

impl ApiGatewayV2Request {
    /// Missing path defaults to `/`, missing method to `GET`
    pub fn into_api_request(self) -> Result<ApiRequest, EventError> {
        let method = self
            .request_context
            .and_then(|ctx| ctx.http)
            .and_then(|http| http.method)
            .unwrap_or_else(|| "GET".to_string());
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| EventError::InvalidMethod(method.clone()))?;

        let body = match self.body {
            Some(encoded) if self.is_base64_encoded => Some(Bytes::from(
                base64::engine::general_purpose::STANDARD.decode(encoded)?,
            )),
            body => body.map(Bytes::from),
        };

        let path = self.raw_path.unwrap_or_else(|| "/".to_string());
        Ok(ApiRequest::with_raw_body(method, path, body))
    }
}

/// API Gateway proxy response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGatewayV2Response {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
    pub is_base64_encoded: bool,
}

impl From<&ApiResponse> for ApiGatewayV2Response {
    fn from(response: &ApiResponse) -> Self {
        Self {
            status_code: response.status,
            headers: HashMap::from([(
                "content-type".to_string(),
                CONTENT_TYPE_JSON.to_string(),
            )]),
            body: response.body(),
            is_base64_encoded: false,
        }
    }
}

/// Lambda error response format
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LambdaErrorResponse {
    pub error_message: String,
    pub error_type: String,
}

impl LambdaErrorResponse {
    fn new(error_type: &str, error: &impl std::fmt::Display) -> Self {
        Self {
            error_message: error.to_string(),
            error_type: error_type.to_string(),
        }
    }
}

/// Route one raw invocation payload.
///
/// `Err` is what the function reports to the runtime as an invocation error.
pub async fn invoke(
    api: &MessagingApi,
    payload: &[u8],
) -> Result<ApiGatewayV2Response, LambdaErrorResponse> {
    let request = serde_json::from_slice::<ApiGatewayV2Request>(payload)
        .map_err(EventError::from)
        .and_then(ApiGatewayV2Request::into_api_request)
        .map_err(|e| LambdaErrorResponse::new("Runtime.InvalidEvent", &e))?;

    match api.handle(&request).await {
        Ok(response) => Ok(ApiGatewayV2Response::from(&response)),
        Err(e) => Err(LambdaErrorResponse::new("Runtime.UnhandledError", &e)),
    }
}

struct Invocation {
    request_id: String,
    payload: Bytes,
}

/// Client for the Lambda Runtime API
pub struct LambdaRuntime {
    client: reqwest::Client,
    base_url: String,
}

impl LambdaRuntime {
    /// `runtime_api` is the `host:port` from `AWS_LAMBDA_RUNTIME_API`
    pub fn new(runtime_api: &str) -> Self {
        // The Runtime API is local to the sandbox, never behind a proxy
        let client = reqwest::Client::builder()
            .no_proxy()
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: format!("http://{runtime_api}/2018-06-01/runtime"),
        }
    }

    /// Serve invocations until `shutdown` is cancelled.
    ///
    /// Cancellation is only observed while waiting for the next invocation;
    /// an invocation in progress is always answered.
    pub async fn run(
        &self,
        api: &MessagingApi,
        shutdown: CancellationToken,
    ) -> Result<(), RuntimeError> {
        info!(endpoint = %self.base_url, "Lambda runtime started");

        loop {
            let invocation = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                next = self.next_invocation() => next?,
            };

            debug!(request_id = %invocation.request_id, "Handling invocation");
            match invoke(api, &invocation.payload).await {
                Ok(response) => self.post_response(&invocation.request_id, &response).await?,
                Err(failure) => {
                    error!(
                        request_id = %invocation.request_id,
                        error_type = %failure.error_type,
                        error = %failure.error_message,
                        "Invocation failed"
                    );
                    self.post_error(&invocation.request_id, &failure).await?;
                }
            }
        }

        info!("Lambda runtime stopped");
        Ok(())
    }

    async fn next_invocation(&self) -> Result<Invocation, RuntimeError> {
        let response = self
            .client
            .get(format!("{}/invocation/next", self.base_url))
            .send()
            .await?
            .error_for_status()?;

        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(RuntimeError::MissingRequestId)?;
        let payload = response.bytes().await?;

        Ok(Invocation {
            request_id,
            payload,
        })
    }

    async fn post_response(
        &self,
        request_id: &str,
        response: &ApiGatewayV2Response,
    ) -> Result<(), RuntimeError> {
        self.client
            .post(format!("{}/invocation/{request_id}/response", self.base_url))
            .json(response)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn post_error(
        &self,
        request_id: &str,
        failure: &LambdaErrorResponse,
    ) -> Result<(), RuntimeError> {
        self.client
            .post(format!("{}/invocation/{request_id}/error", self.base_url))
            .header(ERROR_TYPE_HEADER, failure.error_type.as_str())
            .json(failure)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Uri};
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::Router;
    use queueflow_core::MessagingConfig;
    use queueflow_sns::InMemoryTopic;
    use queueflow_sqs::InMemoryQueue;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;

    fn api_with_queue() -> (MessagingApi, Arc<InMemoryQueue>, String) {
        let sqs = Arc::new(InMemoryQueue::new());
        let url = sqs.create_queue("orders").url;
        let api = MessagingApi::new(
            MessagingConfig::new().with_queue_url(&url),
            sqs.clone(),
            Arc::new(InMemoryTopic::new()),
        );
        (api, sqs, url)
    }

    fn event(method: &str, path: &str, body: Option<&str>) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "version": "2.0",
            "rawPath": path,
            "requestContext": {"http": {"method": method, "path": path}},
            "body": body,
            "isBase64Encoded": false,
        }))
        .unwrap()
    }

    #[test]
    fn test_event_defaults() {
        let request = ApiGatewayV2Request::default().into_api_request().unwrap();
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.path, "/");
        assert_eq!(request.body, None);
    }

    #[test]
    fn test_base64_body_is_decoded() {
        let event = ApiGatewayV2Request {
            raw_path: Some("/enqueue".to_string()),
            body: Some(base64::engine::general_purpose::STANDARD.encode(r#"{"message":"hi"}"#)),
            is_base64_encoded: true,
            ..ApiGatewayV2Request::default()
        };

        let request = event.into_api_request().unwrap();
        assert_eq!(request.body.as_deref(), Some(br#"{"message":"hi"}"#.as_slice()));
    }

    #[tokio::test]
    async fn test_invoke_rejects_non_utf8_base64_body() {
        let (api, sqs, url) = api_with_queue();
        let payload = serde_json::to_vec(&json!({
            "rawPath": "/enqueue",
            "requestContext": {"http": {"method": "POST"}},
            "body": base64::engine::general_purpose::STANDARD.encode(b"{\"message\":\"caf\xff\"}"),
            "isBase64Encoded": true,
        }))
        .unwrap();

        let response = invoke(&api, &payload).await.unwrap();
        assert_eq!(response.status_code, 400);
        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["error"], r#"Invalid JSON. Example: {"message":"hello"}"#);
        assert!(sqs.is_empty(&url));
    }

    #[tokio::test]
    async fn test_invoke_enqueue() {
        let (api, sqs, url) = api_with_queue();

        let response = invoke(&api, &event("POST", "/prod/enqueue", Some(r#"{"message":"hi"}"#)))
            .await
            .unwrap();

        assert_eq!(response.status_code, 200);
        assert_eq!(response.headers["content-type"], "application/json");
        assert!(!response.is_base64_encoded);
        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["ok"], true);
        assert!(body["messageId"].as_str().is_some_and(|id| !id.is_empty()));
        assert_eq!(sqs.len(&url), 1);
    }

    #[tokio::test]
    async fn test_invoke_status() {
        let (api, _, _) = api_with_queue();
        let response = invoke(&api, &event("GET", "/status", None)).await.unwrap();

        assert_eq!(response.status_code, 200);
        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body["service"], "queueflow-messaging-api");
    }

    #[tokio::test]
    async fn test_invoke_rejects_invalid_event() {
        let (api, _, _) = api_with_queue();
        let failure = invoke(&api, b"not an event").await.unwrap_err();
        assert_eq!(failure.error_type, "Runtime.InvalidEvent");
    }

    #[tokio::test]
    async fn test_invoke_reports_send_failure() {
        let api = MessagingApi::new(
            MessagingConfig::new().with_queue_url("http://localhost:4566/000000000000/gone"),
            Arc::new(InMemoryQueue::new()),
            Arc::new(InMemoryTopic::new()),
        );

        let failure = invoke(&api, &event("POST", "/enqueue", Some(r#"{"message":"x"}"#)))
            .await
            .unwrap_err();
        assert_eq!(failure.error_type, "Runtime.UnhandledError");
        assert!(failure.error_message.contains("gone"));
    }

    /// A request the function posted back to the runtime
    #[derive(Debug)]
    struct Posted {
        path: String,
        error_type: Option<String>,
        body: Value,
    }

    /// Runtime API stand-in: hands out queued events, then blocks on `next`
    #[derive(Clone)]
    struct MockRuntime {
        events: Arc<Mutex<VecDeque<(Option<String>, Vec<u8>)>>>,
        posted: mpsc::UnboundedSender<Posted>,
    }

    async fn next_event(State(runtime): State<MockRuntime>) -> Response {
        let next = runtime.events.lock().unwrap().pop_front();
        let Some((request_id, payload)) = next else {
            return std::future::pending().await;
        };

        let mut response = payload.into_response();
        if let Some(id) = request_id {
            response.headers_mut().insert(
                HeaderName::from_bytes(REQUEST_ID_HEADER.as_bytes()).unwrap(),
                HeaderValue::from_str(&id).unwrap(),
            );
        }
        response
    }

    async fn record_post(
        State(runtime): State<MockRuntime>,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
    ) -> StatusCode {
        let _ = runtime.posted.send(Posted {
            path: uri.path().to_string(),
            error_type: headers
                .get(ERROR_TYPE_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            body: serde_json::from_slice(&body).unwrap_or(Value::Null),
        });
        StatusCode::ACCEPTED
    }

    async fn serve_runtime(
        events: Vec<(Option<&str>, Vec<u8>)>,
    ) -> (String, mpsc::UnboundedReceiver<Posted>, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let runtime = MockRuntime {
            events: Arc::new(Mutex::new(
                events
                    .into_iter()
                    .map(|(id, payload)| (id.map(str::to_string), payload))
                    .collect(),
            )),
            posted: tx,
        };

        let app = Router::new()
            .route("/2018-06-01/runtime/invocation/next", get(next_event))
            .fallback(record_post)
            .with_state(runtime);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (addr.to_string(), rx, server)
    }

    async fn next_post(posted: &mut mpsc::UnboundedReceiver<Posted>) -> Posted {
        tokio::time::timeout(Duration::from_secs(5), posted.recv())
            .await
            .expect("runtime should receive a post")
            .expect("mock runtime still running")
    }

    #[tokio::test]
    async fn test_runtime_posts_response_and_error() {
        let sqs = Arc::new(InMemoryQueue::new());
        let queue_url = sqs.create_queue("orders").url;
        let config = MessagingConfig::new()
            .with_queue_url(&queue_url)
            .with_topic_arn("arn:aws:sns:us-east-1:000000000000:missing");
        let api = Arc::new(MessagingApi::new(
            config,
            sqs.clone(),
            Arc::new(InMemoryTopic::new()),
        ));

        let (runtime_api, mut posted, server) = serve_runtime(vec![
            (Some("req-1"), event("POST", "/enqueue", Some(r#"{"message":"hi"}"#))),
            (Some("req-2"), event("POST", "/publish", Some(r#"{"message":"hi"}"#))),
        ])
        .await;

        let shutdown = CancellationToken::new();
        let handle = {
            let api = api.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { LambdaRuntime::new(&runtime_api).run(&api, shutdown).await })
        };

        let first = next_post(&mut posted).await;
        assert_eq!(first.path, "/2018-06-01/runtime/invocation/req-1/response");
        assert_eq!(first.error_type, None);
        assert_eq!(first.body["statusCode"], 200);
        assert_eq!(first.body["headers"]["content-type"], "application/json");
        assert_eq!(first.body["isBase64Encoded"], false);
        let envelope: Value = serde_json::from_str(first.body["body"].as_str().unwrap()).unwrap();
        assert_eq!(envelope["ok"], true);
        assert_eq!(sqs.len(&queue_url), 1);

        let second = next_post(&mut posted).await;
        assert_eq!(second.path, "/2018-06-01/runtime/invocation/req-2/error");
        assert_eq!(second.error_type.as_deref(), Some("Runtime.UnhandledError"));
        assert_eq!(second.body["errorType"], "Runtime.UnhandledError");
        assert!(second.body["errorMessage"]
            .as_str()
            .is_some_and(|msg| msg.contains("missing")));

        // Now parked on the next invocation
        shutdown.cancel();
        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("runtime should stop once cancelled")
            .unwrap();
        assert!(result.is_ok());

        server.abort();
    }

    #[tokio::test]
    async fn test_runtime_requires_request_id() {
        let (api, _, _) = api_with_queue();
        let (runtime_api, _posted, server) =
            serve_runtime(vec![(None, event("GET", "/status", None))]).await;

        let result = LambdaRuntime::new(&runtime_api)
            .run(&api, CancellationToken::new())
            .await;
        assert!(matches!(result, Err(RuntimeError::MissingRequestId)));

        server.abort();
    }
}
