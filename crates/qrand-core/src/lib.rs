//! # qrand Core
//!
//! Multi-source fetch-with-fallback engine for quantum random numbers.
//!
//! ## Overview
//!
//! - **Source catalog** with per-source request templates and success predicates
//! - **Response normalization** of heterogeneous JSON payloads into integers
//! - **Retry loop** per source with a pluggable backoff policy
//! - **Failover** across the ordered catalog, first success wins
//! - **Derived quarantine** of repeatedly failing sources via circuit breakers
//! - **Audit sink** contract, one record per source invocation
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`attempt`] | Per-source outcome and failure taxonomy |
//! | [`audit`] | Audit sink contract and in-memory sinks |
//! | [`circuit_breaker`] | Circuit breaker backing source health |
//! | [`config`] | Retry policy and timeouts for a run |
//! | [`domain`] | Validated requested count |
//! | [`error`] | Validation and audit errors |
//! | [`failover`] | Cross-source failover controller |
//! | [`fetcher`] | Bounded retry loop against one source |
//! | [`health`] | Per-source health ledger |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`normalize`] | Payload normalization |
//! | [`retry`] | Backoff, retry policy and sleepers |
//! | [`source`] | Source descriptors and the catalog |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────┐     ┌──────────────────┐
//! │ FailoverController  │────▶│ SourceHealth     │
//! └──────────┬──────────┘     └──────────────────┘
//!            │        └──────▶ AuditSink
//!            ▼
//! ┌─────────────────────┐     ┌──────────────────┐
//! │ SourceFetcher       │────▶│ HttpClient       │
//! └──────────┬──────────┘     └──────────────────┘
//!            ▼
//! ┌─────────────────────┐
//! │ ResponseNormalizer  │
//! └─────────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Per-attempt failures are data, not errors. Only total exhaustion of the
//! active catalog surfaces as `Err`:
//!
//! ```rust
//! use qrand_core::{ExhaustedFailure, FailureKind};
//!
//! fn report(failure: &ExhaustedFailure) {
//!     for entry in &failure.failures {
//!         match entry.failure.kind {
//!             FailureKind::TransientNetworkError | FailureKind::HttpError => {
//!                 // Upstream unavailable
//!             }
//!             _ => {
//!                 // Contract mismatch
//!             }
//!         }
//!     }
//! }
//! ```

pub mod attempt;
pub mod audit;
pub mod circuit_breaker;
pub mod config;
pub mod domain;
pub mod error;
pub mod failover;
pub mod fetcher;
pub mod health;
pub mod http_client;
pub mod normalize;
pub mod retry;
pub mod source;

// Outcomes
pub use attempt::{AttemptFailure, FailureKind, FetchAttemptResult};

// Audit
pub use audit::{AuditRecord, AuditSink, MemoryAuditSink, NoopAuditSink};

// Circuit breaker and health
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use health::{HealthSnapshot, SourceHealth};

// Configuration
pub use config::FetchConfig;

// Domain
pub use domain::{RequestedCount, MAX_REQUESTED_COUNT};

// Error types
pub use error::{AuditError, ValidationError};

// Failover and fetching
pub use failover::{
    ExhaustedFailure, FailoverController, FailoverResult, FailoverState, FailoverSuccess,
    SourceFailure,
};
pub use fetcher::SourceFetcher;
pub use normalize::ResponseNormalizer;

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpErrorKind, HttpRequest, HttpResponse, ReqwestHttpClient,
    ScriptedHttpClient, Timeouts,
};

// Retry logic
pub use retry::{Backoff, RecordingSleeper, RetryPolicy, Sleeper, TokioSleeper};

// Sources
pub use source::{SourceCatalog, SourceDescriptor, SuccessPredicate, COUNT_PLACEHOLDER};
