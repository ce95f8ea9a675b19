//! Fetch error types
//!
//! Every way a data fetch can fail collapses into one of three kinds, each
//! with a displayable message.

use thiserror::Error;

/// Errors produced while fetching a widget's document
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// The request could not be sent or no response arrived
    #[error("Failed to fetch data: {0}")]
    Transport(String),

    /// The endpoint answered with a non-2xx status
    #[error("HTTP error! status: {0}")]
    Status(u16),

    /// The response body is not valid JSON
    #[error("Invalid JSON response: {0}")]
    Parse(String),
}

/// Discriminant of a [`FetchError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Transport,
    Status,
    Parse,
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Transport(_) => FetchErrorKind::Transport,
            FetchError::Status(_) => FetchErrorKind::Status,
            FetchError::Parse(_) => FetchErrorKind::Parse,
        }
    }

    /// HTTP status code, for status errors
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status(code) => Some(*code),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(err.to_string())
    }
}

/// Result type alias for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FetchError::Status(500);
        assert_eq!(err.to_string(), "HTTP error! status: 500");
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.kind(), FetchErrorKind::Status);

        let err = FetchError::Transport("connection refused".into());
        assert_eq!(err.to_string(), "Failed to fetch data: connection refused");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: FetchError = json_err.into();
        assert_eq!(err.kind(), FetchErrorKind::Parse);
    }
}
