//! Error types for formkit

use thiserror::Error;

/// formkit error type
///
/// Every variant signals caller misuse or an environment problem. User input
/// problems are reported as `ValidationResult::Invalid`, never through here.
#[derive(Error, Debug)]
pub enum FormkitError {
    /// Operation not supported by this field kind
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Validator or field constructed with an unusable configuration
    #[error("misconfigured {component}: {reason}")]
    Misconfigured {
        /// Component that rejected its configuration
        component: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// Field has been disposed and accepts no further mutations
    #[error("field disposed: {0}")]
    Disposed(String),

    /// No file with this id is held by the field
    #[error("unknown file: {0}")]
    UnknownFile(String),

    /// File status change not allowed from the current status
    #[error("invalid transition for {file}: {from} -> {to}")]
    InvalidTransition {
        /// File id
        file: String,
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// Record could not be materialized from field values
    #[error("extraction failed for {target}: {reason}")]
    Extraction {
        /// Target record type
        target: &'static str,
        /// Underlying cause
        reason: String,
    },

    /// Configuration could not be parsed
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FormkitError {
    /// Shorthand for a [`FormkitError::Misconfigured`]
    pub fn misconfigured(component: &'static str, reason: impl Into<String>) -> Self {
        Self::Misconfigured {
            component,
            reason: reason.into(),
        }
    }
}

/// Result type for formkit
pub type FormkitResult<T> = Result<T, FormkitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_misconfigured_display() {
        let err = FormkitError::misconfigured("NumberRangeValidator", "no bounds");
        assert_eq!(err.to_string(), "misconfigured NumberRangeValidator: no bounds");
    }

    #[test]
    fn test_transition_display() {
        let err = FormkitError::InvalidTransition {
            file: "a.pdf".into(),
            from: "pending".into(),
            to: "pending".into(),
        };
        assert!(err.to_string().contains("a.pdf"));
    }
}
