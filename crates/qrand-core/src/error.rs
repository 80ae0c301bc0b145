use thiserror::Error;

/// Validation and contract errors exposed by `qrand-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("count argument is missing")]
    MissingCount,
    #[error("count must be a base-10 integer: '{value}'")]
    CountNotNumeric { value: String },
    #[error("count must be greater than zero, got {value}")]
    CountNotPositive { value: i64 },
    #[error("count {value} exceeds max {max}")]
    CountTooLarge { value: i64, max: u32 },

    #[error("source name cannot be empty")]
    EmptySourceName,
    #[error("source '{name}' appears more than once in the catalog")]
    DuplicateSource { name: String },
    #[error("source '{name}' endpoint template must contain '{{count}}'")]
    MissingCountPlaceholder { name: String },
    #[error("source '{name}' field path cannot be empty")]
    EmptyFieldPath { name: String },
    #[error("unknown source '{name}'")]
    UnknownSource { name: String },

    #[error("max attempts must be at least 1")]
    ZeroAttempts,
    #[error("connect timeout ({connect_ms}ms) must be shorter than read timeout ({read_ms}ms)")]
    TimeoutOrder { connect_ms: u64, read_ms: u64 },
}

/// Error surfaced by an [`AuditSink`](crate::audit::AuditSink) implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("audit sink error: {message}")]
pub struct AuditError {
    message: String,
}

impl AuditError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
