//! Cross-source failover.
//!
//! Sources are tried one at a time in catalog order. The first success ends
//! the run; a failed source is audited and the controller moves on.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::attempt::AttemptFailure;
use crate::audit::{AuditRecord, AuditSink};
use crate::fetcher::SourceFetcher;
use crate::health::SourceHealth;
use crate::source::SourceCatalog;
use crate::RequestedCount;

/// Controller state while walking the active catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "index", rename_all = "snake_case")]
pub enum FailoverState {
    Pending,
    TryingSource(usize),
    Success,
    ExhaustedFailure,
}

/// A source that failed during a run, with its classified reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    pub source: String,
    pub failure: AttemptFailure,
}

/// Numbers obtained from the first source that succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailoverSuccess {
    pub numbers: Vec<i64>,
    pub source_name: String,
    pub sources_tried: Vec<String>,
    pub failures: Vec<SourceFailure>,
    pub latency_ms: u64,
}

/// No source in the active catalog produced a usable result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExhaustedFailure {
    pub sources_tried: Vec<String>,
    pub failures: Vec<SourceFailure>,
    /// Enabled sources skipped because their circuit was open.
    pub quarantined: Vec<String>,
    pub latency_ms: u64,
}

impl std::fmt::Display for ExhaustedFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.sources_tried.len(), self.quarantined.len()) {
            (0, 0) => f.write_str("no active sources available"),
            (0, quarantined) => write!(
                f,
                "all {quarantined} enabled source(s) are quarantined after repeated failures; \
                 rerun with --no-quarantine to try them anyway"
            ),
            (tried, 0) => write!(f, "all {tried} active source(s) failed"),
            (tried, quarantined) => write!(
                f,
                "all {tried} active source(s) failed, {quarantined} more quarantined"
            ),
        }
    }
}

impl std::error::Error for ExhaustedFailure {}

pub type FailoverResult = Result<FailoverSuccess, ExhaustedFailure>;

/// Walks the active catalog until one source yields numbers.
pub struct FailoverController {
    fetcher: SourceFetcher,
    health: Arc<SourceHealth>,
    audit: Arc<dyn AuditSink>,
    transitions: std::sync::Mutex<Vec<FailoverState>>,
}

impl FailoverController {
    pub fn new(
        fetcher: SourceFetcher,
        health: Arc<SourceHealth>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            fetcher,
            health,
            audit,
            transitions: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// States visited by the most recent [`obtain`](Self::obtain) call.
    pub fn transitions(&self) -> Vec<FailoverState> {
        self.transitions
            .lock()
            .expect("failover transition lock is not poisoned")
            .clone()
    }

    pub async fn obtain(
        &self,
        requested_count: RequestedCount,
        catalog: &SourceCatalog,
    ) -> FailoverResult {
        let started = Instant::now();
        self.reset_transitions();

        let active = catalog.active(&self.health);
        let quarantined = catalog
            .sources()
            .iter()
            .filter(|source| source.enabled())
            .filter(|source| !active.iter().any(|candidate| candidate.name() == source.name()))
            .map(|source| source.name().to_owned())
            .collect::<Vec<_>>();
        if !quarantined.is_empty() {
            info!(?quarantined, "skipping quarantined sources");
        }
        let mut sources_tried = Vec::with_capacity(active.len());
        let mut failures = Vec::new();

        for (index, descriptor) in active.into_iter().enumerate() {
            self.transition(FailoverState::TryingSource(index));
            sources_tried.push(descriptor.name().to_owned());

            let result = self.fetcher.fetch(descriptor, requested_count).await;
            self.emit(&AuditRecord::from(&result));

            match result.into_outcome() {
                Ok(numbers) => {
                    self.health.record_success(descriptor.name());
                    self.transition(FailoverState::Success);
                    info!(
                        source = descriptor.name(),
                        count = numbers.len(),
                        failed_before = failures.len(),
                        "obtained random numbers"
                    );
                    return Ok(FailoverSuccess {
                        numbers,
                        source_name: descriptor.name().to_owned(),
                        sources_tried,
                        failures,
                        latency_ms: elapsed_ms(started),
                    });
                }
                Err(failure) => {
                    self.health.record_failure(descriptor.name());
                    warn!(
                        source = descriptor.name(),
                        kind = failure.kind.code(),
                        reason = %failure.message,
                        "source failed, moving to next source"
                    );
                    failures.push(SourceFailure {
                        source: descriptor.name().to_owned(),
                        failure,
                    });
                }
            }
        }

        self.transition(FailoverState::ExhaustedFailure);
        warn!(
            tried = sources_tried.len(),
            quarantined = quarantined.len(),
            "every active source failed"
        );
        Err(ExhaustedFailure {
            sources_tried,
            failures,
            quarantined,
            latency_ms: elapsed_ms(started),
        })
    }

    fn emit(&self, record: &AuditRecord) {
        if let Err(error) = self.audit.record(record) {
            warn!(source = %record.source_name, %error, "failed to write audit record");
        }
    }

    fn reset_transitions(&self) {
        let mut transitions = self
            .transitions
            .lock()
            .expect("failover transition lock is not poisoned");
        transitions.clear();
        transitions.push(FailoverState::Pending);
    }

    fn transition(&self, state: FailoverState) {
        self.transitions
            .lock()
            .expect("failover transition lock is not poisoned")
            .push(state);
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::attempt::FailureKind;
    use crate::audit::MemoryAuditSink;
    use crate::circuit_breaker::CircuitBreakerConfig;
    use crate::http_client::{HttpClient, HttpResponse, ScriptedHttpClient, Timeouts};
    use crate::retry::{RecordingSleeper, RetryPolicy};
    use crate::source::{SourceDescriptor, SuccessPredicate};

    fn source(name: &str) -> SourceDescriptor {
        SourceDescriptor::new(
            name,
            format!("https://{name}.test/?n={{count}}"),
            "data",
            SuccessPredicate::truthy("success"),
        )
        .expect("valid descriptor")
    }

    fn controller(
        client: Arc<dyn HttpClient>,
        health: Arc<SourceHealth>,
        audit: Arc<MemoryAuditSink>,
    ) -> FailoverController {
        let fetcher = SourceFetcher::new(client, RetryPolicy::single_attempt(), Timeouts::default())
            .with_sleeper(Arc::new(RecordingSleeper::default()));
        FailoverController::new(fetcher, health, audit)
    }

    fn count() -> RequestedCount {
        RequestedCount::new(2).expect("valid count")
    }

    #[tokio::test]
    async fn empty_active_catalog_exhausts_without_requests() {
        let client = Arc::new(ScriptedHttpClient::json(r#"{"data":[1,2]}"#));
        let audit = Arc::new(MemoryAuditSink::default());
        let catalog = SourceCatalog::new(1, vec![source("a").with_enabled(false)])
            .expect("valid catalog");

        let failure = controller(client.clone(), Arc::default(), audit.clone())
            .obtain(count(), &catalog)
            .await
            .expect_err("nothing to try");

        assert!(failure.sources_tried.is_empty());
        assert!(failure.quarantined.is_empty());
        assert_eq!(failure.to_string(), "no active sources available");
        assert_eq!(client.request_count(), 0);
        assert!(audit.records().is_empty());
    }

    #[tokio::test]
    async fn trace_walks_sources_until_success() {
        let client = Arc::new(ScriptedHttpClient::new([
            Ok(HttpResponse::new(503, "")),
            Ok(HttpResponse::ok_json(r#"{"data":[8,9],"success":true}"#)),
        ]));
        let audit = Arc::new(MemoryAuditSink::default());
        let catalog =
            SourceCatalog::new(1, vec![source("a"), source("b")]).expect("valid catalog");
        let controller = controller(client, Arc::default(), audit.clone());

        let success = controller.obtain(count(), &catalog).await.expect("success");

        assert_eq!(success.numbers, vec![8, 9]);
        assert_eq!(success.source_name, "b");
        assert_eq!(success.sources_tried, vec!["a", "b"]);
        assert_eq!(success.failures.len(), 1);
        assert_eq!(success.failures[0].failure.kind, FailureKind::HttpError);
        assert_eq!(
            controller.transitions(),
            vec![
                FailoverState::Pending,
                FailoverState::TryingSource(0),
                FailoverState::TryingSource(1),
                FailoverState::Success,
            ]
        );
        let successes = audit
            .records()
            .iter()
            .map(AuditRecord::success)
            .collect::<Vec<_>>();
        assert_eq!(successes, vec![false, true]);
    }

    #[tokio::test]
    async fn failures_feed_source_health() {
        let client = Arc::new(ScriptedHttpClient::status(500));
        let health = Arc::new(SourceHealth::new(CircuitBreakerConfig {
            failure_threshold: 1,
            open_timeout: Duration::from_secs(60),
        }));
        let audit = Arc::new(MemoryAuditSink::default());
        let catalog = SourceCatalog::new(1, vec![source("a")]).expect("valid catalog");
        let controller = controller(client.clone(), health.clone(), audit);

        controller
            .obtain(count(), &catalog)
            .await
            .expect_err("source fails");
        assert!(health.is_quarantined("a"));

        let second = controller
            .obtain(count(), &catalog)
            .await
            .expect_err("source is quarantined");
        assert!(second.sources_tried.is_empty());
        assert_eq!(second.quarantined, vec!["a"]);
        assert!(second.to_string().contains("--no-quarantine"));
        assert_eq!(client.request_count(), 1);
        assert_eq!(
            controller.transitions(),
            vec![FailoverState::Pending, FailoverState::ExhaustedFailure]
        );
    }
}
