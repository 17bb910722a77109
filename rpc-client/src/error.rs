//! Error types for the JSON-RPC client

use thiserror::Error;

/// Errors that can occur during JSON-RPC communication
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    /// The server could not be reached
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with an error status and no JSON-RPC body
    #[error("HTTP status {0}")]
    Http(u16),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Parse(String),

    /// Error object returned by the server
    #[error("RPC fault {code}: {message}")]
    Fault { code: i64, message: String },
}

impl RpcError {
    /// JSON-RPC code for a method the server does not expose
    pub const METHOD_NOT_FOUND: i64 = -32601;

    /// Whether this error means the server could not be reached
    pub fn is_network(&self) -> bool {
        matches!(self, RpcError::Network(_))
    }
}
