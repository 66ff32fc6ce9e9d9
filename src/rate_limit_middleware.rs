// rate_limit_middleware.rs
//! Per-request rate limiting, keyed by authenticated user id (falling back
//! to client IP) with a quota class chosen from the request path.

use axum::{
    extract::{ConnectInfo, Extension, Request},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::auth::models::Claims;
use crate::common::{ApiError, AppState};
use crate::services::rate_limit::{quotas, RateLimitQuota};

/// Pick the quota class for a path. Configuration only; every class runs
/// through the same limiter.
fn quota_for_path(path: &str) -> RateLimitQuota {
    if path.starts_with("/api/generate-")
        || path == "/api/analyze-prompt"
        || path.starts_with("/api/studio/")
    {
        quotas::AI_GENERATION
    } else if matches!(
        path,
        "/api/create-checkout-session" | "/api/verify-payment" | "/api/select-plan"
    ) {
        quotas::PAYMENT
    } else if path.starts_with("/api/webhooks/") {
        quotas::WEBHOOK
    } else {
        quotas::GENERAL
    }
}

/// Extract the client IP address from proxy headers or the socket.
fn extract_ip_address(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            if let Some(first_ip) = forwarded_str.split(',').next() {
                return Some(first_ip.trim().to_string());
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return Some(ip_str.to_string());
        }
    }

    connect_info.map(|info| info.0.ip().to_string())
}

/// Decode the Bearer token to get the user id. Signature-checked with the
/// shared secret; the DB lookup stays in the auth extractor.
fn extract_user_id(headers: &HeaderMap, jwt_secret: &str) -> Option<String> {
    let auth = headers.get("authorization")?.to_str().ok()?;
    let token = auth.strip_prefix("Bearer ").unwrap_or(auth);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .ok()
    .map(|data| data.claims.sub)
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let (rate_limiter, jwt_secret) = {
        let state = state_lock.read().await;
        (state.rate_limiter.clone(), state.jwt_secret.clone())
    };

    let headers = request.headers().clone();
    let path = request.uri().path().to_string();
    let quota = quota_for_path(&path);

    let ip_address = extract_ip_address(&headers, connect_info.as_ref());
    let identifier = extract_user_id(&headers, &jwt_secret)
        .or_else(|| ip_address.clone().map(|ip| format!("anon:{}", ip)))
        .unwrap_or_else(|| "unknown".to_string());

    let decision = rate_limiter.check(&identifier, quota).await;

    if !decision.allowed {
        warn!(
            identifier = %identifier,
            path = %path,
            quota = quota.name,
            retry_after = decision.retry_after_secs,
            "Request blocked by rate limiter"
        );

        let mut response = ApiError::RateLimited {
            retry_after: decision.retry_after_secs,
        }
        .into_response();

        if let Ok(retry_header) = HeaderValue::from_str(&decision.retry_after_secs.to_string()) {
            response.headers_mut().insert("retry-after", retry_header);
        }
        apply_rate_headers(&mut response, decision.remaining, decision.reset_at_ms);

        return response;
    }

    debug!(
        identifier = %identifier,
        path = %path,
        quota = quota.name,
        remaining = decision.remaining,
        "Request allowed by rate limiter"
    );

    let mut response = next.run(request).await;
    apply_rate_headers(&mut response, decision.remaining, decision.reset_at_ms);
    response
}

fn apply_rate_headers(response: &mut Response, remaining: u32, reset_at_ms: u64) {
    if let Ok(value) = HeaderValue::from_str(&remaining.to_string()) {
        response.headers_mut().insert("x-ratelimit-remaining", value);
    }
    // Reset reported in unix seconds.
    if let Ok(value) = HeaderValue::from_str(&(reset_at_ms / 1000).to_string()) {
        response.headers_mut().insert("x-ratelimit-reset", value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    #[test]
    fn classifies_paths_into_quotas() {
        assert_eq!(quota_for_path("/api/generate-thumbnail").name, "ai_generation");
        assert_eq!(quota_for_path("/api/generate-content").name, "ai_generation");
        assert_eq!(quota_for_path("/api/analyze-prompt").name, "ai_generation");
        assert_eq!(quota_for_path("/api/studio/generate").name, "ai_generation");
        assert_eq!(quota_for_path("/api/verify-payment").name, "payment");
        assert_eq!(quota_for_path("/api/select-plan").name, "payment");
        assert_eq!(quota_for_path("/api/webhooks/stripe").name, "webhook");
        assert_eq!(quota_for_path("/api/projects").name, "general");
        assert_eq!(quota_for_path("/api/health").name, "general");
    }

    #[test]
    fn extracts_ip_from_forwarded_chain() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            "203.0.113.1, 198.51.100.1".parse().unwrap(),
        );
        assert_eq!(
            extract_ip_address(&headers, None),
            Some("203.0.113.1".to_string())
        );
    }

    #[test]
    fn extracts_ip_from_x_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "203.0.113.9".parse().unwrap());
        assert_eq!(
            extract_ip_address(&headers, None),
            Some("203.0.113.9".to_string())
        );
    }

    #[test]
    fn extracts_user_id_from_valid_token() {
        let secret = "shared-secret";
        let claims = Claims {
            sub: "user-42".to_string(),
            email: "u@example.com".to_string(),
            name: None,
            exp: 9999999999,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            format!("Bearer {}", token).parse().unwrap(),
        );

        assert_eq!(
            extract_user_id(&headers, secret),
            Some("user-42".to_string())
        );
    }

    #[test]
    fn forged_token_yields_no_user_id() {
        let claims = Claims {
            sub: "user-42".to_string(),
            email: "u@example.com".to_string(),
            name: None,
            exp: 9999999999,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"other-secret"),
        )
        .unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            format!("Bearer {}", token).parse().unwrap(),
        );

        assert_eq!(extract_user_id(&headers, "shared-secret"), None);
    }
}
