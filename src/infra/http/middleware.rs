use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use metrics::{counter, histogram};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
const MAX_REQUEST_ID_LEN: usize = 64;

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

/// Adopt the caller's `x-request-id` when it is a plain token, otherwise mint
/// one, and echo it on the response so browser errors can be matched to logs.
pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = inbound_request_id(request.headers())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    request.extensions_mut().insert(RequestContext {
        request_id: request_id.clone(),
    });

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

fn inbound_request_id(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(REQUEST_ID_HEADER)?.to_str().ok()?;
    let plain = !value.is_empty()
        && value.len() <= MAX_REQUEST_ID_LEN
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'));
    plain.then(|| value.to_string())
}

/// Count every API response and log failures with the report their handler
/// attached.
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();
    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();
    let elapsed = start.elapsed();

    if path.starts_with("/api/") {
        let class = match status.as_u16() {
            500.. => "5xx",
            400..=499 => "4xx",
            _ => "2xx",
        };
        counter!("tcm_http_responses_total", "class" => class).increment(1);
        histogram!("tcm_http_response_seconds").record(elapsed.as_secs_f64());
    }

    if !(status.is_client_error() || status.is_server_error()) {
        debug!(
            target = "tcm_webui::http::response",
            status = status.as_u16(),
            method = %method,
            path = %path,
            elapsed_ms = elapsed.as_millis(),
            request_id = %request_id,
            "request served",
        );
        return response;
    }

    let (source, chain) = match response.extensions_mut().remove::<ErrorReport>() {
        Some(report) => (report.source, report.messages),
        None => ("unknown", Vec::new()),
    };
    let detail = chain.first().map(String::as_str).unwrap_or("no diagnostic available");

    if status.is_server_error() {
        error!(
            target = "tcm_webui::http::response",
            status = status.as_u16(),
            method = %method,
            path = %path,
            elapsed_ms = elapsed.as_millis(),
            source,
            detail,
            chain = ?chain,
            request_id = %request_id,
            "request failed",
        );
    } else {
        warn!(
            target = "tcm_webui::http::response",
            status = status.as_u16(),
            method = %method,
            path = %path,
            source,
            detail,
            request_id = %request_id,
            "request rejected",
        );
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_str(value).expect("header"));
        headers
    }

    #[test]
    fn plain_request_ids_are_adopted() {
        assert_eq!(
            inbound_request_id(&headers("preview-42.a_b")).as_deref(),
            Some("preview-42.a_b")
        );
    }

    #[test]
    fn unusable_request_ids_are_ignored() {
        assert_eq!(inbound_request_id(&HeaderMap::new()), None);
        assert_eq!(inbound_request_id(&headers("")), None);
        assert_eq!(inbound_request_id(&headers("has space")), None);
        assert_eq!(inbound_request_id(&headers(&"x".repeat(65))), None);
    }
}
