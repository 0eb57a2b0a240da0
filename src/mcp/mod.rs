//! MCP endpoint: protocol framing, dispatch, tools and the widget resource.
//!
//! A request travels one way through this module:
//!
//! ```text
//!   POST /mcp body
//!        │
//!        ▼
//!   transport ── parse ──▶ protocol::IncomingMessage
//!        │                        │
//!        │                        ▼
//!        │                 server::McpServer ──▶ tools::TodoTool ──▶ TodoStore
//!        │                        │
//!        │                        └──────────▶ resources::WidgetTemplate
//!        ▼
//!   one HTTP response (200 / 202 / 400 / 500)
//! ```
//!
//! The transport is created per request and dropped afterwards; the server
//! and the store it holds are shared for the life of the process.
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2025-06-18 and also
//! accepts 2025-03-26 and 2024-11-05.

pub mod protocol;
pub mod resources;
pub mod server;
pub mod tools;
pub mod transport;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
pub use resources::WidgetTemplate;
pub use server::McpServer;
pub use tools::{TodoTool, ToolCallResult};
pub use transport::HttpTransport;
