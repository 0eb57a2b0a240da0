//! Error types for todo-widget-mcp.
//!
//! Every error here is request-scoped or startup-scoped. None of them
//! terminates a running server.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors raised by the todo store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TodoError {
    /// No todo with the given identifier exists.
    #[error("Todo with id \"{id}\" not found")]
    NotFound {
        /// The identifier that was looked up.
        id: String,
    },
}

/// Errors raised while resolving or relaying widget assets.
#[derive(Error, Debug)]
pub enum AssetError {
    /// No filename has ever been discovered for the requested asset.
    #[error("widget {kind} asset has not been discovered")]
    NotDiscovered {
        /// Asset class ("js" or "css").
        kind: &'static str,
    },

    /// The request to the widget origin failed.
    #[error("request to {url} failed")]
    Upstream {
        /// The URL that was fetched.
        url: String,
        /// The underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },

    /// The widget origin answered with a non-success status.
    #[error("request to {url} returned status {status}")]
    UpstreamStatus {
        /// The URL that was fetched.
        url: String,
        /// The HTTP status returned.
        status: u16,
    },
}

/// Errors raised by the per-request protocol transport.
#[derive(Error, Debug)]
pub enum TransportError {
    /// A JSON-RPC message could not be serialised.
    #[error("failed to serialise JSON-RPC message")]
    Serialise(#[from] serde_json::Error),
}
