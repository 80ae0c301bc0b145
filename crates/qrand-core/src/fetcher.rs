//! Bounded retry loop against a single source.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, warn};

use crate::attempt::{AttemptFailure, FetchAttemptResult};
use crate::http_client::{HttpClient, HttpErrorKind, HttpRequest, Timeouts};
use crate::normalize::ResponseNormalizer;
use crate::retry::{RetryPolicy, Sleeper, TokioSleeper};
use crate::source::SourceDescriptor;
use crate::RequestedCount;

/// Executes requests against one source at a time.
#[derive(Clone)]
pub struct SourceFetcher {
    http_client: Arc<dyn HttpClient>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
    timeouts: Timeouts,
    normalizer: ResponseNormalizer,
}

impl SourceFetcher {
    pub fn new(http_client: Arc<dyn HttpClient>, policy: RetryPolicy, timeouts: Timeouts) -> Self {
        Self {
            http_client,
            sleeper: Arc::new(TokioSleeper),
            policy,
            timeouts,
            normalizer: ResponseNormalizer,
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Run the attempt loop for `descriptor`.
    ///
    /// Transport and status failures are retried until the attempt budget is
    /// spent; every other failure ends the loop for this source immediately.
    pub async fn fetch(
        &self,
        descriptor: &SourceDescriptor,
        requested_count: RequestedCount,
    ) -> FetchAttemptResult {
        let started = Instant::now();
        let url = descriptor.endpoint(requested_count);
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_failure = None;
        let mut attempts = 0;

        for attempt in 1..=max_attempts {
            if let Some(delay) = self.policy.delay_before(attempt) {
                debug!(source = descriptor.name(), ?delay, "waiting before next attempt");
                self.sleeper.sleep(delay).await;
            }

            attempts = attempt;
            debug!(source = descriptor.name(), attempt, max_attempts, %url, "requesting numbers");

            match self.attempt_once(descriptor, &url).await {
                Ok(numbers) => {
                    debug!(
                        source = descriptor.name(),
                        attempt,
                        received = numbers.len(),
                        "source returned numbers"
                    );
                    return FetchAttemptResult::success(
                        descriptor.name(),
                        requested_count,
                        numbers,
                        attempts,
                        started.elapsed(),
                    );
                }
                Err(failure) => {
                    warn!(
                        source = descriptor.name(),
                        attempt,
                        max_attempts,
                        kind = failure.kind.code(),
                        reason = %failure.message,
                        "attempt failed"
                    );
                    let retryable = failure.is_retryable();
                    last_failure = Some(failure);
                    if !retryable {
                        break;
                    }
                }
            }
        }

        let failure = last_failure
            .unwrap_or_else(|| AttemptFailure::transient("no attempt was made against the source"));
        FetchAttemptResult::failure(
            descriptor.name(),
            requested_count,
            failure,
            attempts,
            started.elapsed(),
        )
    }

    async fn attempt_once(
        &self,
        descriptor: &SourceDescriptor,
        url: &str,
    ) -> Result<Vec<i64>, AttemptFailure> {
        let request = HttpRequest::get(url)
            .with_header("accept", "application/json")
            .with_timeout(self.timeouts.request_deadline());

        let response = self.http_client.execute(request).await.map_err(|error| {
            let label = match error.kind() {
                HttpErrorKind::Timeout => "timed out",
                HttpErrorKind::Connect => "connection failed",
                HttpErrorKind::Other => "transport error",
            };
            AttemptFailure::transient(format!("{label}: {}", error.message()))
        })?;

        if !response.is_success() {
            return Err(AttemptFailure::http_status(response.status));
        }

        let body: Value = serde_json::from_str(&response.body).map_err(|error| {
            AttemptFailure::malformed(format!("response body is not valid JSON: {error}"))
        })?;

        self.normalizer.normalize(&body, descriptor)
    }
}
