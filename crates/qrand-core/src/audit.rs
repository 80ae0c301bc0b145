//! Audit sink contract: one record per source invocation.

use std::sync::Mutex;

use serde::Serialize;

use crate::attempt::FetchAttemptResult;
use crate::{AuditError, RequestedCount};

/// Outcome of one source invocation as handed to an [`AuditSink`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    pub source_name: String,
    pub requested_count: RequestedCount,
    pub numbers: Option<Vec<i64>>,
    pub error_message: Option<String>,
}

impl AuditRecord {
    pub fn success(&self) -> bool {
        self.numbers.is_some()
    }
}

impl From<&FetchAttemptResult> for AuditRecord {
    fn from(result: &FetchAttemptResult) -> Self {
        Self {
            source_name: result.source_name().to_owned(),
            requested_count: result.requested_count(),
            numbers: result.numbers().map(<[i64]>::to_vec),
            error_message: result.failure_reason().map(ToString::to_string),
        }
    }
}

/// Append-only destination for audit records.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: &AuditRecord) -> Result<(), AuditError>;
}

/// Sink that drops every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _record: &AuditRecord) -> Result<(), AuditError> {
        Ok(())
    }
}

/// In-memory sink for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .expect("memory audit sink lock is not poisoned")
            .clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, record: &AuditRecord) -> Result<(), AuditError> {
        self.records
            .lock()
            .expect("memory audit sink lock is not poisoned")
            .push(record.clone());
        Ok(())
    }
}
