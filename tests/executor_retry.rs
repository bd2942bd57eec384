//! Executor behavior under failure: retry envelope, terminal classification,
//! cancellation, and export-stream semantics.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;

use common::{Fault, ScriptedTransport, StreamStep};
use conjure_rs::exec::{cancel_pair, CancelToken, RequestExecutor, RetryPolicy};
use conjure_rs::op::{Operation, OperationKind};
use conjure_rs::Classification;

fn fast_policy() -> RetryPolicy {
    RetryPolicy::new(4, Duration::from_millis(5), Duration::from_millis(40))
}

fn create_op() -> Operation {
    Operation::new(OperationKind::Create, "create_box")
        .param("width", 10.0)
        .param("height", 10.0)
        .param("depth", 10.0)
}

#[tokio::test]
async fn transient_failures_are_retried_until_success() {
    let transport = Arc::new(ScriptedTransport::with_faults([
        Fault::Connect,
        Fault::Status(503),
    ]));
    let executor = RequestExecutor::new(transport.clone(), fast_policy());

    let resp = executor
        .execute(&create_op(), &CancelToken::never())
        .await
        .unwrap();
    assert!(resp.success);
    assert_eq!(transport.send_count("create_box"), 3);
}

#[tokio::test]
async fn exhausted_retries_surface_the_original_classification() {
    let transport = Arc::new(ScriptedTransport::with_faults([
        Fault::Status(503),
        Fault::Status(503),
        Fault::Status(503),
        Fault::Status(503),
    ]));
    let policy = RetryPolicy::new(2, Duration::from_millis(5), Duration::from_millis(20));
    let executor = RequestExecutor::new(transport.clone(), policy);

    let err = executor
        .execute(&create_op(), &CancelToken::never())
        .await
        .unwrap_err();
    // The terminal error carries the transient classification, not some
    // synthetic retries-exhausted kind.
    assert_eq!(err.classification(), Some(Classification::Transient));
    assert_eq!(transport.send_count("create_box"), 2);
}

#[tokio::test]
async fn non_retryable_failures_are_not_retried() {
    let transport = Arc::new(ScriptedTransport::with_faults([Fault::Status(422)]));
    let executor = RequestExecutor::new(transport.clone(), fast_policy());

    let err = executor
        .execute(&create_op(), &CancelToken::never())
        .await
        .unwrap_err();
    assert_eq!(err.classification(), Some(Classification::Validation));
    assert_eq!(transport.send_count("create_box"), 1);
}

#[tokio::test]
async fn rate_limited_retries_after_server_hint() {
    let transport = Arc::new(ScriptedTransport::with_faults([Fault::StatusRetryAfter(
        429, 0,
    )]));
    let executor = RequestExecutor::new(transport.clone(), fast_policy());

    let resp = executor
        .execute(&create_op(), &CancelToken::never())
        .await
        .unwrap();
    assert!(resp.success);
    assert_eq!(transport.send_count("create_box"), 2);
}

#[tokio::test]
async fn cancelling_mid_backoff_aborts_immediately() {
    let transport = Arc::new(ScriptedTransport::with_faults([
        Fault::Connect,
        Fault::Connect,
        Fault::Connect,
    ]));
    // Backoff long enough that only cancellation can end the wait promptly.
    let policy = RetryPolicy::new(4, Duration::from_secs(30), Duration::from_secs(60));
    let executor = RequestExecutor::new(transport.clone(), policy);

    let (handle, token) = cancel_pair();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();
    });

    let started = Instant::now();
    let err = executor.execute(&create_op(), &token).await.unwrap_err();
    assert_eq!(err.classification(), Some(Classification::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(5));
    // No further attempt after the cancelled wait.
    assert_eq!(transport.send_count("create_box"), 1);
}

#[tokio::test]
async fn export_retries_until_first_byte() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_stream_step(StreamStep::Fail(Fault::Connect));
    transport.push_stream_step(StreamStep::Fail(Fault::Status(502)));
    transport.push_stream_step(StreamStep::Deliver(vec![b"solid ", b"part\n"]));
    let executor = RequestExecutor::new(transport.clone(), fast_policy());

    let op = Operation::new(OperationKind::Export, "export_stl");
    let mut stream = executor
        .execute_stream(&op, &CancelToken::never())
        .await
        .unwrap();

    let mut bytes = Vec::new();
    while let Some(chunk) = stream.next().await {
        bytes.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(bytes, b"solid part\n");
    assert_eq!(transport.send_count("export_stl"), 3);
}

#[tokio::test]
async fn broken_stream_is_not_retried_after_first_byte() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_stream_step(StreamStep::DeliverThenBreak(vec![b"solid "]));
    let executor = RequestExecutor::new(transport.clone(), fast_policy());

    let op = Operation::new(OperationKind::Export, "export_stl");
    let mut stream = executor
        .execute_stream(&op, &CancelToken::never())
        .await
        .unwrap();

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(&first[..], b"solid ");

    let err = stream.next().await.unwrap().unwrap_err();
    assert_eq!(
        err.classification(),
        Some(Classification::StreamInterrupted)
    );
    // One stream call only: partial delivery is never replayed.
    assert_eq!(transport.send_count("export_stl"), 1);
}
