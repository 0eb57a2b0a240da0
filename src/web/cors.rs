//! Origin-scoped CORS for the host chat client.
//!
//! Only the host's own origins and its sandboxed widget frames
//! (`*.oaiusercontent.com` hosts containing `chatgpt-com`) get a reflected
//! `Access-Control-Allow-Origin`. The allowed methods and headers are
//! advertised on every response, and preflight `OPTIONS` requests are
//! answered here without reaching a handler.

use axum::extract::Request;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// Origins allowed verbatim.
pub const ALLOWED_ORIGINS: &[&str] = &["https://chatgpt.com", "https://chat.openai.com"];

/// Value of `Access-Control-Allow-Methods`.
pub const ALLOW_METHODS: &str = "GET, POST, OPTIONS";

/// Value of `Access-Control-Allow-Headers`.
pub const ALLOW_HEADERS: &str = "Content-Type";

/// Returns `true` if `origin` may read responses from this server.
#[must_use]
pub fn is_allowed_origin(origin: &str) -> bool {
    ALLOWED_ORIGINS.contains(&origin)
        || (origin.contains("chatgpt-com") && origin.contains("oaiusercontent.com"))
}

/// Middleware applying the CORS policy.
pub async fn cors(req: Request, next: Next) -> Response {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .filter(|v| v.to_str().is_ok_and(is_allowed_origin))
        .cloned();

    let mut response = if req.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(req).await
    };

    let headers = response.headers_mut();
    if let Some(origin) = origin {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        headers.append(header::VARY, HeaderValue::from_static("Origin"));
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_origins_allowed() {
        assert!(is_allowed_origin("https://chatgpt.com"));
        assert!(is_allowed_origin("https://chat.openai.com"));
    }

    #[test]
    fn sandbox_origins_allowed() {
        assert!(is_allowed_origin(
            "https://todo-app--chatgpt-com.web-sandbox.oaiusercontent.com"
        ));
    }

    #[test]
    fn other_origins_rejected() {
        assert!(!is_allowed_origin("https://chatgpt.com.evil.example"));
        assert!(!is_allowed_origin("https://example.com"));
        assert!(!is_allowed_origin("https://files.oaiusercontent.com"));
        assert!(!is_allowed_origin("http://chatgpt.com"));
    }
}
