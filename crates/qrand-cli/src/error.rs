use qrand_audit::AuditLogError;
use qrand_core::{ExhaustedFailure, ValidationError};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Exhausted(#[from] ExhaustedFailure),

    #[error("audit store error: {0}")]
    Audit(#[from] AuditLogError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 1,
            Self::Exhausted(_) => 1,
            Self::Audit(_) => 3,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}
