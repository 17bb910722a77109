use rpc_client::RpcError;
use thiserror::Error;

/// High-level API errors for Mopidy operations
///
/// This enum abstracts away the underlying JSON-RPC details and lets callers
/// tell connectivity problems apart from everything else.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network communication error
    ///
    /// The server could not be reached: connection refused, timeouts, DNS
    /// failures and so on.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Response parsing error
    ///
    /// The server answered but the payload did not have the expected shape.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Error object returned by the server
    #[error("RPC fault {code}: {message}")]
    RpcFault { code: i64, message: String },

    /// The backend does not expose this capability
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl ApiError {
    /// Whether this error means the server is unreachable
    pub fn is_connectivity(&self) -> bool {
        matches!(self, ApiError::NetworkError(_))
    }
}

/// Type alias for results that can return an ApiError
pub type Result<T> = std::result::Result<T, ApiError>;

/// Convert from RpcError to ApiError
impl From<RpcError> for ApiError {
    fn from(error: RpcError) -> Self {
        match error {
            RpcError::Network(msg) => ApiError::NetworkError(msg),
            RpcError::Http(status) => ApiError::ParseError(format!("HTTP status {}", status)),
            RpcError::Parse(msg) => ApiError::ParseError(msg),
            RpcError::Fault { code, message } if code == RpcError::METHOD_NOT_FOUND => {
                ApiError::Unsupported(message)
            }
            RpcError::Fault { code, message } => ApiError::RpcFault { code, message },
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        ApiError::ParseError(error.to_string())
    }
}
