//! Request-scoped context
//!
//! Everything a handler needs to know about who is calling and in which
//! language, extracted per request instead of held in process-wide state.

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use std::convert::Infallible;
use storage::Language;
use uuid::Uuid;

/// Request id header, echoed on every response
pub const REQUEST_ID_HEADER: &str = "x-request-id";
/// Authenticated caller uid, set by the identity proxy in front of the API
pub const CALLER_UID_HEADER: &str = "x-user-uid";

/// Per-request caller information
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    pub request_id: String,
    pub language: Language,
    pub caller_uid: Option<String>,
}

impl RequestContext {
    /// Build from request headers
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let request_id = header(REQUEST_ID_HEADER)
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let language = header("accept-language")
            .and_then(|value| {
                value
                    .split(',')
                    .filter_map(|tag| Language::from_tag(tag.split(';').next().unwrap_or(tag)))
                    .next()
            })
            .unwrap_or_default();

        Self {
            request_id,
            language,
            caller_uid: header(CALLER_UID_HEADER).map(str::to_string),
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// Give every request an id and echo it on the response
pub async fn propagate_request_id(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .cloned()
        .or_else(|| HeaderValue::from_str(&Uuid::new_v4().to_string()).ok());

    if let Some(id) = &id {
        request.headers_mut().insert(REQUEST_ID_HEADER, id.clone());
    }

    let mut response = next.run(request).await;
    if let Some(id) = id {
        response.headers_mut().insert(REQUEST_ID_HEADER, id);
    }
    response
}
