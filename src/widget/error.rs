//! Widget store error types

use thiserror::Error;

/// Reasons a widget configuration cannot be saved
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("Widget id must not be empty")]
    MissingId,

    #[error("Widget name must not be empty")]
    MissingName,

    #[error("API URL must not be empty")]
    MissingUrl,

    #[error("Refresh interval {secs}s is below the minimum of {min}s")]
    IntervalTooShort { secs: u64, min: u64 },

    #[error("Select at least one field")]
    NoFields,

    #[error("Field selected more than once: {0}")]
    DuplicateField(String),
}

/// Errors that can occur when mutating the widget store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A widget with this id already exists
    #[error("Duplicate widget id: {0}")]
    DuplicateId(String),

    /// No widget with this id
    #[error("Widget not found: {0}")]
    NotFound(String),

    /// Position outside the widget list
    #[error("Position {index} out of range for {len} widgets")]
    OutOfRange { index: usize, len: usize },

    /// Configuration rejected
    #[error("Invalid widget config: {0}")]
    Invalid(#[from] ConfigValidationError),
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::NotFound("w1".to_string());
        assert_eq!(err.to_string(), "Widget not found: w1");

        let err: StoreError = ConfigValidationError::NoFields.into();
        assert_eq!(err.to_string(), "Invalid widget config: Select at least one field");
    }
}
