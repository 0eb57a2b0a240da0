//! HTTP surface.
//!
//! | Path           | Method        | Handler                         |
//! |----------------|---------------|---------------------------------|
//! | `/mcp`         | `POST`        | stateless MCP endpoint          |
//! | `/mcp`         | `GET, DELETE` | `405`, no sessions              |
//! | `/health`      | `GET`         | `{"status":"ok"}`               |
//! | `/widget.js`   | `GET`         | proxied widget script           |
//! | `/widget.css`  | `GET`         | proxied widget stylesheet       |
//!
//! Every route, including the `404` fallback, sits behind the [`cors`]
//! middleware.

pub mod cors;

use std::future::Future;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::mcp::server::McpServer;
use crate::mcp::transport;
use crate::widget::{AssetKind, WidgetAssetResolver};

/// Shared state for every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The MCP server (owns the todo store and the widget template).
    pub server: Arc<McpServer>,
    /// Widget asset proxy.
    pub widget: Arc<WidgetAssetResolver>,
}

impl AppState {
    /// Bundles the server and resolver.
    #[must_use]
    pub fn new(server: McpServer, widget: WidgetAssetResolver) -> Self {
        Self {
            server: Arc::new(server),
            widget: Arc::new(widget),
        }
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/mcp",
            post(mcp_endpoint)
                .get(mcp_not_allowed)
                .delete(mcp_not_allowed),
        )
        .route("/health", get(health))
        .route("/widget.js", get(widget_js))
        .route("/widget.css", get(widget_css))
        .fallback(not_found)
        .layer(middleware::from_fn(cors::cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the application until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the server fails while accepting connections.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn mcp_endpoint(State(state): State<AppState>, body: Bytes) -> Response {
    transport::serve_request(Arc::clone(&state.server), body).await
}

async fn mcp_not_allowed() -> Response {
    transport::method_not_allowed_response()
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn widget_js(State(state): State<AppState>) -> Response {
    state.widget.serve(AssetKind::Js).await
}

async fn widget_css(State(state): State<AppState>) -> Response {
    state.widget.serve(AssetKind::Css).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_check_reports_ok() {
        let Json(body) = health().await;
        assert_eq!(body, json!({ "status": "ok" }));
    }
}
