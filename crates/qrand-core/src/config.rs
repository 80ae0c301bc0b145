use std::time::Duration;

use crate::http_client::Timeouts;
use crate::retry::{Backoff, RetryPolicy};
use crate::ValidationError;

/// Retry policy and timeouts applied to every source in a run.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FetchConfig {
    pub retry: RetryPolicy,
    pub timeouts: Timeouts,
}

impl FetchConfig {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.retry.max_attempts = max_attempts;
        self
    }

    pub fn with_fixed_delay(mut self, delay: Duration) -> Self {
        self.retry.backoff = Backoff::Fixed { delay };
        self
    }

    pub fn with_connect_timeout(mut self, connect: Duration) -> Self {
        self.timeouts.connect = connect;
        self
    }

    pub fn with_read_timeout(mut self, read: Duration) -> Self {
        self.timeouts.read = read;
        self
    }

    pub fn validate(self) -> Result<Self, ValidationError> {
        if self.retry.max_attempts == 0 {
            return Err(ValidationError::ZeroAttempts);
        }
        if self.timeouts.connect >= self.timeouts.read {
            return Err(ValidationError::TimeoutOrder {
                connect_ms: duration_ms(self.timeouts.connect),
                read_ms: duration_ms(self.timeouts.read),
            });
        }
        Ok(self)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
