//! Per-source outcome types.
//!
//! Retry-versus-terminal decisions are carried as data on [`FailureKind`]
//! rather than inferred from which error type happened to be raised.

use std::fmt::{Display, Formatter};
use std::time::Duration;

use serde::Serialize;

use crate::RequestedCount;

/// Classification of a failed attempt against one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Timeout, DNS failure, refused connection.
    TransientNetworkError,
    /// Non-2xx status.
    HttpError,
    /// Body is not JSON.
    MalformedResponse,
    /// The source reported failure in its payload.
    ApiReportedFailure,
    /// Success was signalled but the payload is not a usable integer array.
    UnexpectedPayloadShape,
}

impl FailureKind {
    /// Whether another attempt against the same source may help.
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::TransientNetworkError | Self::HttpError)
    }

    pub const fn code(self) -> &'static str {
        match self {
            Self::TransientNetworkError => "network.transient",
            Self::HttpError => "http.status",
            Self::MalformedResponse => "response.malformed",
            Self::ApiReportedFailure => "api.reported_failure",
            Self::UnexpectedPayloadShape => "payload.unexpected_shape",
        }
    }
}

impl Display for FailureKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A classified failure with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl AttemptFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(FailureKind::TransientNetworkError, message)
    }

    pub fn http_status(status: u16) -> Self {
        Self::new(
            FailureKind::HttpError,
            format!("upstream returned status {status}"),
        )
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(FailureKind::MalformedResponse, message)
    }

    pub fn api_reported(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ApiReportedFailure, message)
    }

    pub fn unexpected_shape(message: impl Into<String>) -> Self {
        Self::new(FailureKind::UnexpectedPayloadShape, message)
    }

    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl Display for AttemptFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.kind.code())
    }
}

/// Outcome of one source invocation (its whole retry loop).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchAttemptResult {
    source_name: String,
    requested_count: RequestedCount,
    outcome: Result<Vec<i64>, AttemptFailure>,
    attempts: u32,
    elapsed: Duration,
}

impl FetchAttemptResult {
    /// Successful result. An empty `numbers` sequence is not a success and is
    /// recorded as an unexpected payload instead.
    pub fn success(
        source_name: impl Into<String>,
        requested_count: RequestedCount,
        numbers: Vec<i64>,
        attempts: u32,
        elapsed: Duration,
    ) -> Self {
        let outcome = if numbers.is_empty() {
            Err(AttemptFailure::unexpected_shape("source returned no numbers"))
        } else {
            Ok(numbers)
        };

        Self {
            source_name: source_name.into(),
            requested_count,
            outcome,
            attempts,
            elapsed,
        }
    }

    pub fn failure(
        source_name: impl Into<String>,
        requested_count: RequestedCount,
        failure: AttemptFailure,
        attempts: u32,
        elapsed: Duration,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            requested_count,
            outcome: Err(failure),
            attempts,
            elapsed,
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub const fn requested_count(&self) -> RequestedCount {
        self.requested_count
    }

    pub fn numbers(&self) -> Option<&[i64]> {
        self.outcome.as_ref().ok().map(Vec::as_slice)
    }

    pub fn failure_reason(&self) -> Option<&AttemptFailure> {
        self.outcome.as_ref().err()
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Network round-trips actually made.
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn into_outcome(self) -> Result<Vec<i64>, AttemptFailure> {
        self.outcome
    }
}
