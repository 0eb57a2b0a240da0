//! MCP server implementation for the todo list.
//!
//! The server is shared by every request and holds no per-client state:
//! in stateless mode each HTTP request carries exactly one message and is
//! processed by a fresh transport. `initialize` is still answered so that
//! clients can negotiate a version, but `tools/*` and `resources/*` are
//! served whether or not it was sent first.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::mcp::protocol::{
    negotiate_version, IncomingMessage, JsonRpcError, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, SERVER_NAME,
};
use crate::mcp::resources::{WidgetTemplate, WIDGET_TEMPLATE_URI};
use crate::mcp::tools::{tool_definitions, TodoTool, ToolCallResult};
use crate::todo::TodoStore;

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ListCapabilities>,
    /// Resource-related capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ListCapabilities>,
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        Self {
            tools: Some(ListCapabilities::default()),
            resources: Some(ListCapabilities::default()),
        }
    }
}

/// Capabilities of a listable primitive.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListCapabilities {
    /// Whether the list can change during the session.
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// Server information for initialisation response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Client information received during initialisation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Parameters for the initialize request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by client.
    pub protocol_version: String,
    /// Client capabilities.
    #[serde(default)]
    pub capabilities: Value,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// Parameters for tools/call request.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool.
    #[serde(default)]
    pub arguments: Value,
}

/// Parameters for resources/read request.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceReadParams {
    /// URI of the resource to read.
    pub uri: String,
}

/// The MCP server for the todo list.
#[derive(Debug)]
pub struct McpServer {
    /// Shared todo store.
    store: Arc<TodoStore>,
    /// Widget template resource.
    widget: WidgetTemplate,
}

impl McpServer {
    /// Creates a server over `store`, serving `widget` as its template.
    #[must_use]
    pub const fn new(store: Arc<TodoStore>, widget: WidgetTemplate) -> Self {
        Self { store, widget }
    }

    /// Returns the shared store.
    #[must_use]
    pub fn store(&self) -> &TodoStore {
        &self.store
    }

    /// Handles a parsed incoming message.
    ///
    /// Returns `None` for notifications, which never get a response.
    pub fn handle_message(
        &self,
        msg: IncomingMessage,
    ) -> Option<Result<JsonRpcResponse, JsonRpcError>> {
        match msg {
            IncomingMessage::Request(req) => Some(self.handle_request(&req)),
            IncomingMessage::Notification(ref notif) => {
                Self::handle_notification(notif);
                None
            }
        }
    }

    /// Handles an incoming request.
    ///
    /// # Errors
    ///
    /// Returns a JSON-RPC error for unknown methods or malformed params.
    pub fn handle_request(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        tracing::debug!(id = %req.id, method = %req.method, "Handling request");

        match req.method.as_str() {
            "initialize" => Self::handle_initialize(req),
            "ping" => Ok(JsonRpcResponse::success(req.id.clone(), json!({}))),
            "tools/list" => Ok(Self::handle_tools_list(req)),
            "tools/call" => self.handle_tools_call(req),
            "resources/list" => Ok(self.handle_resources_list(req)),
            "resources/templates/list" => Ok(JsonRpcResponse::success(
                req.id.clone(),
                json!({ "resourceTemplates": [] }),
            )),
            "resources/read" => self.handle_resources_read(req),
            _ => Err(JsonRpcError::method_not_found(req.id.clone(), &req.method)),
        }
    }

    /// Handles an incoming notification.
    fn handle_notification(notif: &JsonRpcNotification) {
        tracing::debug!(method = %notif.method, "Received notification");
    }

    /// Handles the initialize request.
    fn handle_initialize(req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        let params: InitializeParams = req.params_as("initialize")?;

        let negotiated_version = negotiate_version(&params.protocol_version);
        if let Some(client) = &params.client_info {
            tracing::info!(
                client = %client.name,
                client_version = client.version.as_deref().unwrap_or("unknown"),
                requested = %params.protocol_version,
                negotiated = negotiated_version,
                "Client initialised"
            );
        }

        let result = json!({
            "protocolVersion": negotiated_version,
            "capabilities": ServerCapabilities::default(),
            "serverInfo": ServerInfo::default(),
        });

        Ok(JsonRpcResponse::success(req.id.clone(), result))
    }

    /// Handles the tools/list request.
    fn handle_tools_list(req: &JsonRpcRequest) -> JsonRpcResponse {
        JsonRpcResponse::success(req.id.clone(), json!({ "tools": tool_definitions() }))
    }

    /// Handles the tools/call request.
    fn handle_tools_call(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        let params: ToolCallParams = req.params_as("tool call")?;

        let result = match TodoTool::parse(&params.name, params.arguments) {
            Ok(tool) => tool.call(&self.store),
            Err(message) => {
                tracing::debug!(tool = %params.name, %message, "Rejected tool arguments");
                ToolCallResult::error(message)
            }
        };

        let result_value = serde_json::to_value(&result).map_err(|e| {
            tracing::error!(error = %e, "Failed to serialise tool call result");
            JsonRpcError::internal_error(
                req.id.clone(),
                "Internal error: failed to serialise result",
            )
        })?;

        Ok(JsonRpcResponse::success(req.id.clone(), result_value))
    }

    /// Handles the resources/list request.
    fn handle_resources_list(&self, req: &JsonRpcRequest) -> JsonRpcResponse {
        JsonRpcResponse::success(
            req.id.clone(),
            json!({ "resources": [self.widget.definition()] }),
        )
    }

    /// Handles the resources/read request.
    fn handle_resources_read(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        let params: ResourceReadParams = req.params_as("resources/read")?;

        if params.uri != WIDGET_TEMPLATE_URI {
            return Err(JsonRpcError::invalid_params(
                req.id.clone(),
                format!("Unknown resource: {}", params.uri),
            ));
        }

        Ok(JsonRpcResponse::success(
            req.id.clone(),
            self.widget.contents(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::{parse_message, ErrorCode};

    fn server() -> McpServer {
        McpServer::new(
            Arc::new(TodoStore::new()),
            WidgetTemplate::new(Some("https://todo.example.com")),
        )
    }

    fn request(server: &McpServer, json: &str) -> Result<JsonRpcResponse, JsonRpcError> {
        server
            .handle_message(parse_message(json).unwrap())
            .expect("request must get a response")
    }

    #[test]
    fn initialize_negotiates_version() {
        let response = request(
            &server(),
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{
                "protocolVersion":"2024-11-05","capabilities":{},
                "clientInfo":{"name":"test","version":"1.0"}}}"#,
        )
        .unwrap();

        assert_eq!(response.result["protocolVersion"], "2024-11-05");
        assert_eq!(response.result["serverInfo"]["name"], SERVER_NAME);
        assert!(response.result["capabilities"]["tools"].is_object());
        assert!(response.result["capabilities"]["resources"].is_object());
    }

    #[test]
    fn initialize_without_params_is_invalid() {
        let err = request(&server(), r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#)
            .unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidParams.code());
    }

    #[test]
    fn tools_served_without_initialize() {
        let response =
            request(&server(), r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#).unwrap();
        assert_eq!(response.result["tools"].as_array().unwrap().len(), 5);
    }

    #[test]
    fn tools_call_mutates_shared_store() {
        let server = server();
        let response = request(
            &server,
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call",
                "params":{"name":"add_todo","arguments":{"title":"Buy milk"}}}"#,
        )
        .unwrap();

        assert_eq!(response.result["structuredContent"]["addedTodo"]["id"], "1");
        assert_eq!(server.store().list().len(), 1);
    }

    #[test]
    fn unknown_tool_is_error_result() {
        let response = request(
            &server(),
            r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"nope"}}"#,
        )
        .unwrap();
        assert_eq!(response.result["isError"], true);
    }

    #[test]
    fn resources_read_returns_widget() {
        let server = server();
        let list = request(&server, r#"{"jsonrpc":"2.0","id":5,"method":"resources/list"}"#)
            .unwrap();
        assert_eq!(list.result["resources"][0]["uri"], WIDGET_TEMPLATE_URI);

        let read = request(
            &server,
            r#"{"jsonrpc":"2.0","id":6,"method":"resources/read",
                "params":{"uri":"ui://widget/todo.html"}}"#,
        )
        .unwrap();
        let text = read.result["contents"][0]["text"].as_str().unwrap();
        assert!(text.contains("/widget.js"));
    }

    #[test]
    fn resources_read_unknown_uri() {
        let err = request(
            &server(),
            r#"{"jsonrpc":"2.0","id":7,"method":"resources/read","params":{"uri":"ui://nope"}}"#,
        )
        .unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidParams.code());
    }

    #[test]
    fn unknown_method() {
        let err = request(&server(), r#"{"jsonrpc":"2.0","id":8,"method":"prompts/list"}"#)
            .unwrap_err();
        assert_eq!(err.error.code, ErrorCode::MethodNotFound.code());
    }

    #[test]
    fn notifications_get_no_response() {
        let msg = parse_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .unwrap();
        assert!(server().handle_message(msg).is_none());
    }
}
