// src/logging_middleware.rs
//! Middleware for logging request and response bodies in debug mode.
//! Generated thumbnails travel as multi-hundred-kilobyte data URLs, so
//! string values are shortened before logging.

use axum::body::to_bytes;
use axum::{
    body::Body,
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::common::helpers::truncate_data_url;

const MAX_LOGGED_BODY: usize = 64 * 1024;

/// Shorten every string leaf so a data-URL payload cannot flood the log.
fn compact_json(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::String(s) => serde_json::Value::String(truncate_data_url(s)),
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(compact_json).collect())
        }
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), compact_json(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn render_body(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() || bytes.len() > MAX_LOGGED_BODY {
        return None;
    }
    let body_str = std::str::from_utf8(bytes).ok()?;
    match serde_json::from_str::<serde_json::Value>(body_str) {
        Ok(json) => serde_json::to_string(&compact_json(&json)).ok(),
        Err(_) => Some(body_str.to_string()),
    }
}

/// Middleware to log request and response bodies in debug mode
pub async fn log_request_response(request: Request, next: Next) -> Result<Response, StatusCode> {
    let (parts, body) = request.into_parts();

    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if let Some(rendered) = render_body(&bytes) {
        debug!(
            method = %parts.method,
            uri = %parts.uri,
            request_body = %rendered,
            "Request"
        );
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();

    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if let Some(rendered) = render_body(&bytes) {
        debug!(
            status = %parts.status,
            response_body = %rendered,
            "Response"
        );
    }

    Ok(Response::from_parts(parts, Body::from(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_json_truncates_data_urls() {
        let payload = serde_json::json!({
            "imageUrl": format!("data:image/png;base64,{}", "A".repeat(10_000)),
            "title": "short title",
            "nested": [{"thumb": format!("data:image/png;base64,{}", "B".repeat(10_000))}],
        });

        let compacted = compact_json(&payload);
        let rendered = serde_json::to_string(&compacted).unwrap();
        assert!(rendered.len() < 1_000);
        assert!(rendered.contains("short title"));
    }

    #[test]
    fn render_body_skips_oversized_payloads() {
        let huge = vec![b'a'; MAX_LOGGED_BODY + 1];
        assert!(render_body(&huge).is_none());
        assert!(render_body(b"").is_none());
        assert_eq!(render_body(b"plain text").as_deref(), Some("plain text"));
    }
}
