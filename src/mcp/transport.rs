//! Stateless streamable-HTTP transport for the MCP server.
//!
//! Each `POST /mcp` gets its own [`HttpTransport`]:
//!
//! - the body is exactly one UTF-8 JSON-RPC message (no batches)
//! - a request is answered with `200` and an `application/json` body
//! - a notification is acknowledged with `202` and no body
//! - a malformed message is answered with `400` and a JSON-RPC error
//!
//! A transport produces at most one response. Internal faults become
//! `500 {"error":"Internal server error"}` only while nothing has been
//! produced yet. The transport is released when it is dropped, on every
//! exit path.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;

use crate::error::TransportError;
use crate::mcp::protocol::{parse_message, ErrorCode, JsonRpcError};
use crate::mcp::server::McpServer;

static NEXT_TRANSPORT_ID: AtomicU64 = AtomicU64::new(1);

/// A single-request MCP transport.
#[derive(Debug)]
pub struct HttpTransport {
    /// Identifier for log correlation.
    id: u64,
    /// The response, once one has been produced.
    response: Option<Response>,
}

impl HttpTransport {
    /// Creates a new transport.
    #[must_use]
    pub fn new() -> Self {
        let id = NEXT_TRANSPORT_ID.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(transport = id, "Transport opened");
        Self { id, response: None }
    }

    /// Returns `true` once a response has been produced.
    #[must_use]
    pub const fn headers_sent(&self) -> bool {
        self.response.is_some()
    }

    /// Processes one HTTP request body against `server`.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON-RPC reply cannot be serialised.
    pub fn handle(&mut self, server: &McpServer, body: &[u8]) -> Result<(), TransportError> {
        let Ok(text) = std::str::from_utf8(body) else {
            return self.send_json(StatusCode::BAD_REQUEST, &JsonRpcError::parse_error());
        };

        let msg = match parse_message(text) {
            Ok(msg) => msg,
            Err(error) => {
                tracing::debug!(transport = self.id, code = error.error.code, "Rejected message");
                return self.send_json(StatusCode::BAD_REQUEST, &error);
            }
        };

        match server.handle_message(msg) {
            None => {
                self.send(StatusCode::ACCEPTED.into_response());
                Ok(())
            }
            Some(Ok(response)) => self.send_json(StatusCode::OK, &response),
            Some(Err(error)) => self.send_json(StatusCode::OK, &error),
        }
    }

    /// Produces the 500 fallback unless a response already exists.
    pub fn send_internal_error(&mut self) {
        if self.headers_sent() {
            tracing::warn!(
                transport = self.id,
                "Internal error after response was produced; keeping original response"
            );
            return;
        }
        self.send(internal_error_response());
    }

    /// Consumes the transport and returns its response.
    #[must_use]
    pub fn finish(mut self) -> Response {
        self.response
            .take()
            .unwrap_or_else(internal_error_response)
    }

    fn send_json<T: Serialize>(&mut self, status: StatusCode, body: &T) -> Result<(), TransportError> {
        let bytes = serde_json::to_vec(body)?;
        self.send((status, [(header::CONTENT_TYPE, "application/json")], bytes).into_response());
        Ok(())
    }

    fn send(&mut self, response: Response) {
        if self.headers_sent() {
            tracing::warn!(transport = self.id, "Dropping duplicate response");
            return;
        }
        self.response = Some(response);
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for HttpTransport {
    fn drop(&mut self) {
        tracing::trace!(
            transport = self.id,
            responded = self.response.is_some(),
            "Transport closed"
        );
    }
}

/// The `500` body used when processing fails before a response exists.
#[must_use]
pub fn internal_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        axum::Json(json!({ "error": "Internal server error" })),
    )
        .into_response()
}

/// Answer for `GET`/`DELETE /mcp`: there are no sessions or streams.
#[must_use]
pub fn method_not_allowed_response() -> Response {
    let error = JsonRpcError::new(None, ErrorCode::ServerError, "Method not allowed.");
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST")],
        axum::Json(error),
    )
        .into_response()
}

/// Handles one `POST /mcp` body with a fresh transport.
///
/// Processing runs in its own task so that a panic is contained to this
/// request and reported as a `500`.
pub async fn serve_request(server: Arc<McpServer>, body: Bytes) -> Response {
    let task = tokio::spawn(async move {
        let mut transport = HttpTransport::new();
        if let Err(e) = transport.handle(&server, &body) {
            tracing::error!(error = %e, "Error handling MCP request");
            transport.send_internal_error();
        }
        transport.finish()
    });

    match task.await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "MCP request task failed");
            internal_error_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::resources::WidgetTemplate;
    use crate::todo::TodoStore;

    fn server() -> McpServer {
        McpServer::new(Arc::new(TodoStore::new()), WidgetTemplate::new(None))
    }

    #[test]
    fn request_gets_ok_json() {
        let mut transport = HttpTransport::new();
        transport
            .handle(&server(), br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#)
            .unwrap();
        assert!(transport.headers_sent());

        let response = transport.finish();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
    }

    #[test]
    fn notification_gets_accepted() {
        let mut transport = HttpTransport::new();
        transport
            .handle(
                &server(),
                br#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            )
            .unwrap();
        assert_eq!(transport.finish().status(), StatusCode::ACCEPTED);
    }

    #[test]
    fn malformed_body_gets_bad_request() {
        let mut transport = HttpTransport::new();
        transport.handle(&server(), b"{not json").unwrap();
        assert_eq!(transport.finish().status(), StatusCode::BAD_REQUEST);

        let mut transport = HttpTransport::new();
        transport.handle(&server(), &[0xff, 0xfe]).unwrap();
        assert_eq!(transport.finish().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_error_does_not_replace_sent_response() {
        let mut transport = HttpTransport::new();
        transport
            .handle(&server(), br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#)
            .unwrap();
        transport.send_internal_error();
        assert_eq!(transport.finish().status(), StatusCode::OK);
    }

    #[test]
    fn internal_error_before_response() {
        let mut transport = HttpTransport::new();
        transport.send_internal_error();
        assert_eq!(
            transport.finish().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unfinished_transport_yields_internal_error() {
        let transport = HttpTransport::new();
        assert_eq!(
            transport.finish().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn method_not_allowed_advertises_post() {
        let response = method_not_allowed_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "POST");
    }

    #[tokio::test]
    async fn serve_request_round_trip() {
        let response = serve_request(
            Arc::new(server()),
            Bytes::from_static(br#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
