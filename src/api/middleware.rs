//! API Middleware
//!
//! Request context and request logging.

use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::domain::OperationContext;

/// Header set by `SetRequestIdLayer`
pub const REQUEST_ID_HEADER: &str = "x-request-id";

// =========================================================================
// Request context
// =========================================================================

/// Build the operation context from the request id.
///
/// A missing or non-UUID `x-request-id` is replaced by a fresh UUID on both
/// the request and the response, so the id the client sees is the one in the
/// logs.
pub async fn context_middleware(mut request: Request<Body>, next: Next) -> Response {
    let client_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok());

    let mut context = OperationContext::new();
    if let Some(id) = client_id {
        context = context.with_correlation_id(id);
    }
    let correlation_id = context.ensure_correlation_id();

    let replacement = match client_id {
        Some(_) => None,
        None => HeaderValue::from_str(&correlation_id.to_string()).ok(),
    };

    if let Some(value) = &replacement {
        if let Some(original) = request.headers().get(REQUEST_ID_HEADER) {
            tracing::debug!(
                original = ?original,
                correlation_id = %correlation_id,
                "Replacing non-UUID request id"
            );
        }
        request.headers_mut().insert(REQUEST_ID_HEADER, value.clone());
    }

    request.extensions_mut().insert(context);

    let mut response = next.run(request).await;
    if let Some(value) = replacement {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

// =========================================================================
// Header masking
// =========================================================================

/// Headers that should be masked in logs
const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "proxy-authorization",
    "cookie",
    "set-cookie",
];

/// Mask sensitive headers for logging
pub fn mask_headers_for_logging(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let name_lower = name.as_str().to_lowercase();
            let masked_value = if SENSITIVE_HEADERS.contains(&name_lower.as_str()) {
                "[REDACTED]".to_string()
            } else {
                value.to_str().unwrap_or("[invalid utf8]").to_string()
            };
            (name.to_string(), masked_value)
        })
        .collect()
}

// =========================================================================
// Request logging
// =========================================================================

/// Request logging middleware
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let headers = mask_headers_for_logging(request.headers());
    let correlation_id = request
        .extensions()
        .get::<OperationContext>()
        .and_then(|ctx| ctx.correlation_id);

    let start = std::time::Instant::now();

    tracing::info!(
        method = %method,
        uri = %uri,
        correlation_id = ?correlation_id,
        headers = ?headers,
        "Incoming request"
    );

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        duration_ms = %start.elapsed().as_millis(),
        correlation_id = ?correlation_id,
        "Request completed"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::to_bytes, extract::Extension, routing::get, Router};
    use tower::util::ServiceExt;
    use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

    async fn echo_correlation_id(Extension(context): Extension<OperationContext>) -> String {
        context.correlation_id.map(|id| id.to_string()).unwrap_or_default()
    }

    fn app() -> Router {
        Router::new()
            .route("/", get(echo_correlation_id))
            .layer(axum::middleware::from_fn(context_middleware))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    async fn call(request_id: Option<&str>) -> (String, String) {
        let mut builder = Request::builder().uri("/");
        if let Some(id) = request_id {
            builder = builder.header(REQUEST_ID_HEADER, id);
        }
        let response = app().oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();

        let header = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (header, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_uuid_request_id_becomes_correlation_id() {
        let id = Uuid::new_v4().to_string();
        let (header, correlation_id) = call(Some(&id)).await;
        assert_eq!(header, id);
        assert_eq!(correlation_id, id);
    }

    #[tokio::test]
    async fn test_non_uuid_request_id_is_replaced_consistently() {
        let (header, correlation_id) = call(Some("client-trace-42")).await;
        assert_ne!(header, "client-trace-42");
        assert_eq!(header, correlation_id);
        assert!(Uuid::parse_str(&correlation_id).is_ok());
    }

    #[tokio::test]
    async fn test_missing_request_id_is_generated() {
        let (header, correlation_id) = call(None).await;
        assert_eq!(header, correlation_id);
        assert!(Uuid::parse_str(&correlation_id).is_ok());
    }

    #[test]
    fn test_mask_headers_for_logging() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", "application/json".parse().unwrap());
        headers.insert("authorization", "Bearer secret".parse().unwrap());
        headers.insert("x-request-id", "abc".parse().unwrap());

        let masked = mask_headers_for_logging(&headers);

        let auth = masked.iter().find(|(k, _)| k == "authorization");
        let content_type = masked.iter().find(|(k, _)| k == "content-type");
        let request_id = masked.iter().find(|(k, _)| k == "x-request-id");

        assert_eq!(auth.unwrap().1, "[REDACTED]");
        assert_eq!(content_type.unwrap().1, "application/json");
        assert_eq!(request_id.unwrap().1, "abc");
    }

    #[test]
    fn test_sensitive_headers_list() {
        assert!(SENSITIVE_HEADERS.contains(&"authorization"));
        assert!(SENSITIVE_HEADERS.contains(&"cookie"));
        assert!(!SENSITIVE_HEADERS.contains(&"content-type"));
    }
}
