//! Error types for mopidy-state

use mopidy_api::ApiError;
use thiserror::Error;

/// Result type for mopidy-state operations
pub type Result<T> = std::result::Result<T, StateError>;

/// Errors surfaced by speaker commands
#[derive(Debug, Error)]
pub enum StateError {
    /// The server could not be reached
    #[error("Connectivity error: {0}")]
    Connectivity(ApiError),

    /// The command was rejected before anything was sent
    #[error("{0}")]
    Validation(String),

    /// The backend does not implement the requested capability
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// The server answered with an error
    #[error("API error: {0}")]
    Api(ApiError),
}

impl StateError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        StateError::Validation(message.into())
    }

    /// Whether this error means the server is unreachable
    pub fn is_connectivity(&self) -> bool {
        matches!(self, StateError::Connectivity(_))
    }
}

impl From<ApiError> for StateError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unsupported(message) => StateError::Unsupported(message),
            err if err.is_connectivity() => StateError::Connectivity(err),
            err => StateError::Api(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_classification() {
        let err: StateError = ApiError::NetworkError("refused".to_string()).into();
        assert!(err.is_connectivity());

        let err: StateError = ApiError::Unsupported("core.playlists.create".to_string()).into();
        assert!(matches!(err, StateError::Unsupported(_)));

        let err: StateError = ApiError::ParseError("bad".to_string()).into();
        assert!(matches!(err, StateError::Api(ApiError::ParseError(_))));
    }

    #[test]
    fn test_validation_display_is_bare_message() {
        let err = StateError::validation("Queue is empty");
        assert_eq!(err.to_string(), "Queue is empty");
    }
}
