//! Request correlation IDs.
//!
//! Each request carries a [`RequestId`]: the upstream `x-request-id` when it is
//! usable, a fresh UUID v4 otherwise. Handlers can read it from the request
//! extensions. It is also tagged on the span and Sentry scope and echoed back
//! in the response.

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest upstream ID that is reused as-is.
const MAX_UPSTREAM_LEN: usize = 128;

/// Correlation ID of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(String);

impl RequestId {
    /// Reuse a well-formed upstream ID or mint a new one.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(REQUEST_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .filter(|id| is_usable(id))
            .map_or_else(|| Self(Uuid::new_v4().to_string()), |id| Self(id.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_usable(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_UPSTREAM_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b':'))
}

/// Middleware that attaches a [`RequestId`] to every request and response.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = RequestId::from_headers(request.headers());

    Span::current().record("request_id", request_id.as_str());
    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", request_id.as_str());
    });
    request.extensions_mut().insert(request_id.clone());

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_upstream_id_is_reused() {
        let id = RequestId::from_headers(&headers("cf-ray:8a1b2c3d"));
        assert_eq!(id.as_str(), "cf-ray:8a1b2c3d");
    }

    #[test]
    fn test_unusable_upstream_id_is_replaced() {
        let long = "x".repeat(MAX_UPSTREAM_LEN + 1);
        for bad in ["", "has space", long.as_str()] {
            let id = RequestId::from_headers(&headers(bad));
            assert!(Uuid::parse_str(id.as_str()).is_ok(), "kept {bad:?}");
        }
    }

    #[test]
    fn test_missing_header_mints_uuid() {
        let id = RequestId::from_headers(&HeaderMap::new());
        assert!(Uuid::parse_str(id.as_str()).is_ok());
    }
}
