//! todo-widget-mcp: MCP server exposing a todo list to a host chat client
//!
//! The server offers five todo tools over stateless streamable HTTP and a
//! widget template that the host renders with each tool's structured output.
//!
//! # Architecture
//!
//! - **Todo Store**: a mutex-guarded, in-memory ordered list of todos
//! - **Tools**: `get_todos`, `add_todo`, `toggle_todo`, `delete_todo`,
//!   `clear_completed`, each answering with a status line, a bounded
//!   preview and the full data
//! - **Widget proxy**: discovers the hashed bundle filenames on the widget
//!   origin and relays them as `/widget.js` and `/widget.css`
//!
//! Nothing is persisted; the list lives as long as the process.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading and validation
//! - [`error`]: Error types
//! - [`mcp`]: MCP protocol implementation
//! - [`todo`]: The todo store
//! - [`web`]: HTTP routes and CORS
//! - [`widget`]: Widget asset discovery and relay

pub mod config;
pub mod error;
pub mod mcp;
pub mod todo;
pub mod web;
pub mod widget;
