//! Reliable operation execution.
//!
//! `RequestExecutor` is the sole path by which any operation reaches the
//! network: attempt, classify on failure, consult the retry policy, wait,
//! repeat. Export streams share the same retry envelope until the first
//! body chunk; after that a failure is surfaced as `StreamInterrupted` and
//! never retried.

use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use futures::{stream, Stream, StreamExt};
use tracing::{debug, warn};

use crate::error::{Classification, Error, ErrorHint};
use crate::exec::cancel::CancelToken;
use crate::exec::classify::classify;
use crate::exec::policy::{Decision, RetryPolicy, RetryState};
use crate::op::{OpResponse, Operation};
use crate::transport::{AttemptFailure, Transport};
use crate::Result;

/// Byte stream handed to export callers once delivery has committed.
pub type ExportByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send + 'static>>;

/// Orchestrates transport, classifier, and retry policy.
///
/// Dispatch is at-least-once: a retried operation may have been applied
/// server-side before the response was lost. The executor does not
/// deduplicate; callers relying on exactly-once must not retry-sensitive
/// scripts across failures.
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute one operation, retrying per policy. Terminal outcomes carry
    /// the classification of the final failed attempt, never a synthetic
    /// timeout.
    pub async fn execute(&self, op: &Operation, cancel: &CancelToken) -> Result<OpResponse> {
        let mut state = RetryState::first();
        loop {
            let outcome = tokio::select! {
                _ = cancel.cancelled() => Err(AttemptFailure::Cancelled),
                res = self.transport.send(op) => res,
            };

            let failure = match outcome {
                Ok(resp) => {
                    debug!(
                        op = op.wire_name(),
                        kind = op.kind().as_str(),
                        attempt = state.attempt,
                        "operation completed"
                    );
                    return Ok(resp);
                }
                Err(failure) => failure,
            };

            state = self.after_failure(op, &failure, state, cancel).await?;
        }
    }

    /// Start an export. The retry envelope covers everything up to the first
    /// received byte; once a chunk has been delivered a failure is final.
    pub async fn execute_stream(
        &self,
        op: &Operation,
        cancel: &CancelToken,
    ) -> Result<ExportByteStream> {
        let mut state = RetryState::first();
        loop {
            let outcome = tokio::select! {
                _ = cancel.cancelled() => Err(AttemptFailure::Cancelled),
                res = self.transport.stream(op) => res,
            };

            let failure = match outcome {
                Ok(mut raw) => {
                    // Peek the first chunk: an error before any byte is still
                    // inside the retry envelope; a delivered chunk commits us.
                    let first = tokio::select! {
                        _ = cancel.cancelled() => Some(Err(AttemptFailure::Cancelled)),
                        item = raw.next() => item,
                    };
                    match first {
                        None => return Ok(Box::pin(stream::empty())),
                        Some(Ok(chunk)) => {
                            debug!(
                                op = op.wire_name(),
                                attempt = state.attempt,
                                "export stream committed"
                            );
                            let rest = raw.map(|item| {
                                item.map_err(|f| {
                                    Error::api(
                                        Classification::StreamInterrupted,
                                        f.message(),
                                        ErrorHint::new(),
                                    )
                                })
                            });
                            let head = stream::iter([Ok::<Bytes, Error>(chunk)]);
                            return Ok(Box::pin(head.chain(rest)));
                        }
                        Some(Err(failure)) => failure,
                    }
                }
                Err(failure) => failure,
            };

            state = self.after_failure(op, &failure, state, cancel).await?;
        }
    }

    /// Classify a failed attempt, consult the policy, and either wait out the
    /// backoff (returning the advanced retry state) or surface the error.
    async fn after_failure(
        &self,
        op: &Operation,
        failure: &AttemptFailure,
        state: RetryState,
        cancel: &CancelToken,
    ) -> Result<RetryState> {
        let classification = classify(failure);
        let retry_after = failure.retry_after();

        match self.policy.decide(classification, &state, retry_after) {
            Decision::Retry { after } => {
                debug!(
                    op = op.wire_name(),
                    class = classification.as_str(),
                    attempt = state.attempt,
                    wait_ms = after.as_millis() as u64,
                    "attempt failed, backing off"
                );
                tokio::select! {
                    _ = cancel.cancelled() => {
                        return Err(Error::api(
                            Classification::Cancelled,
                            AttemptFailure::Cancelled.message(),
                            ErrorHint::new(),
                        ));
                    }
                    _ = tokio::time::sleep(after) => {}
                }
                Ok(state.next(after))
            }
            Decision::GiveUp => {
                warn!(
                    op = op.wire_name(),
                    class = classification.as_str(),
                    attempts = state.attempt,
                    waited_ms = state.waited.as_millis() as u64,
                    "operation failed terminally"
                );
                let mut hint = ErrorHint::new();
                if let Some(after) = retry_after {
                    hint = hint.with_retry_after(after);
                }
                Err(Error::api(classification, failure.message(), hint))
            }
        }
    }
}
