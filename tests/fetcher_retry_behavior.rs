//! Behavior-driven tests for the per-source retry loop.

use std::sync::Arc;
use std::time::Duration;

use qrand_core::{
    Backoff, FailureKind, FetchConfig, HttpError, HttpResponse, RecordingSleeper, RequestedCount,
    RetryPolicy, ScriptedHttpClient, SourceDescriptor, SourceFetcher, SuccessPredicate, Timeouts,
};

fn source() -> SourceDescriptor {
    SourceDescriptor::new(
        "retry.test",
        "https://retry.test/random?length={count}",
        "data",
        SuccessPredicate::truthy("success"),
    )
    .expect("valid descriptor")
}

fn count() -> RequestedCount {
    RequestedCount::new(3).expect("valid count")
}

fn fetcher(
    client: &Arc<ScriptedHttpClient>,
    sleeper: &Arc<RecordingSleeper>,
    policy: RetryPolicy,
) -> SourceFetcher {
    SourceFetcher::new(client.clone(), policy, Timeouts::default()).with_sleeper(sleeper.clone())
}

// =============================================================================
// Retry budget
// =============================================================================

#[tokio::test]
async fn persistent_network_failure_uses_exactly_five_attempts() {
    // Given: a source whose connection always times out
    let client = Arc::new(ScriptedHttpClient::always(Err(HttpError::timeout(
        "operation timed out",
    ))));
    let sleeper = Arc::new(RecordingSleeper::default());

    // When: it is fetched with the default policy
    let result = fetcher(&client, &sleeper, RetryPolicy::default())
        .fetch(&source(), count())
        .await;

    // Then: five attempts were made, separated by four fixed delays
    assert_eq!(client.request_count(), 5);
    assert_eq!(result.attempts(), 5);
    assert_eq!(sleeper.delays(), vec![Duration::from_secs(5); 4]);

    // And: the last reason is carried as a transient network failure
    let failure = result.failure_reason().expect("failure");
    assert_eq!(failure.kind, FailureKind::TransientNetworkError);
    assert!(failure.message.contains("timed out"));
}

#[tokio::test]
async fn recovery_stops_the_loop_without_a_trailing_delay() {
    // Given: two refused connections followed by a valid answer
    let client = Arc::new(ScriptedHttpClient::new([
        Err(HttpError::connect("connection refused")),
        Err(HttpError::connect("connection refused")),
        Ok(HttpResponse::ok_json(r#"{"data":[7,8,9],"success":true}"#)),
    ]));
    let sleeper = Arc::new(RecordingSleeper::default());

    // When: it is fetched
    let result = fetcher(&client, &sleeper, RetryPolicy::default())
        .fetch(&source(), count())
        .await;

    // Then: the numbers arrive on the third attempt with two delays
    assert_eq!(result.numbers(), Some(&[7, 8, 9][..]));
    assert_eq!(client.request_count(), 3);
    assert_eq!(sleeper.delays().len(), 2);
}

#[tokio::test]
async fn terminal_classifications_are_not_retried() {
    for (body, kind) in [
        ("not json at all", FailureKind::MalformedResponse),
        (
            r#"{"success":false,"error":"bad length"}"#,
            FailureKind::ApiReportedFailure,
        ),
        (
            r#"{"success":true,"data":[1,"x"]}"#,
            FailureKind::UnexpectedPayloadShape,
        ),
        (r#"{"success":true}"#, FailureKind::UnexpectedPayloadShape),
    ] {
        // Given: a source answering 200 with a terminal payload
        let client = Arc::new(ScriptedHttpClient::json(body));
        let sleeper = Arc::new(RecordingSleeper::default());

        // When: it is fetched
        let result = fetcher(&client, &sleeper, RetryPolicy::default())
            .fetch(&source(), count())
            .await;

        // Then: one attempt, no delay, classified as expected
        assert_eq!(client.request_count(), 1, "body: {body}");
        assert!(sleeper.delays().is_empty(), "body: {body}");
        assert_eq!(
            result.failure_reason().map(|failure| failure.kind),
            Some(kind),
            "body: {body}"
        );
    }
}

#[tokio::test]
async fn status_errors_are_retried_then_reported() {
    // Given: a source that answers 429 and then 503 forever
    let client = Arc::new(ScriptedHttpClient::new([
        Ok(HttpResponse::new(429, "slow down")),
        Ok(HttpResponse::new(503, "")),
    ]));
    let sleeper = Arc::new(RecordingSleeper::default());

    // When: it is fetched with a three-attempt budget
    let result = fetcher(
        &client,
        &sleeper,
        RetryPolicy::fixed(Duration::from_millis(250), 3),
    )
    .fetch(&source(), count())
    .await;

    // Then: the last status is what gets reported
    assert_eq!(client.request_count(), 3);
    assert_eq!(sleeper.delays(), vec![Duration::from_millis(250); 2]);
    let failure = result.failure_reason().expect("failure");
    assert_eq!(failure.kind, FailureKind::HttpError);
    assert!(failure.message.contains("503"));
}

// =============================================================================
// Policy configuration
// =============================================================================

#[tokio::test]
async fn exponential_backoff_grows_and_stays_capped() {
    // Given: an exponential policy without jitter
    let policy = RetryPolicy {
        max_attempts: 6,
        backoff: Backoff::Exponential {
            base: Duration::from_millis(100),
            factor: 2.0,
            max: Duration::from_millis(500),
            jitter: false,
        },
    };
    let client = Arc::new(ScriptedHttpClient::status(502));
    let sleeper = Arc::new(RecordingSleeper::default());

    // When: every attempt fails
    fetcher(&client, &sleeper, policy)
        .fetch(&source(), count())
        .await;

    // Then: delays double until the cap
    assert_eq!(
        sleeper.delays(),
        vec![
            Duration::from_millis(100),
            Duration::from_millis(200),
            Duration::from_millis(400),
            Duration::from_millis(500),
            Duration::from_millis(500),
        ]
    );
}

#[tokio::test]
async fn configured_timeouts_travel_with_each_request() {
    // Given: a run configured with a two-second read timeout
    let config = FetchConfig::default()
        .with_connect_timeout(Duration::from_secs(1))
        .with_read_timeout(Duration::from_secs(2))
        .validate()
        .expect("valid config");
    let client = Arc::new(ScriptedHttpClient::json(r#"{"data":[1],"success":true}"#));

    // When: a source is fetched
    SourceFetcher::new(client.clone(), config.retry, config.timeouts)
        .with_sleeper(Arc::new(RecordingSleeper::default()))
        .fetch(&source(), count())
        .await;

    // Then: the request deadline spans connect plus read, with the rendered count
    let requests = client.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].timeout, Duration::from_secs(3));
    assert_eq!(requests[0].url, "https://retry.test/random?length=3");
}
