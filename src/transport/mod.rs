//! Transport seam between the executor and the wire.
//!
//! A transport performs exactly one exchange per call and reports failures
//! as [`AttemptFailure`] values, leaving classification and retry decisions
//! to the layers above it.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::op::{OpResponse, Operation};

pub mod http;

pub use http::HttpTransport;

/// Outcome stream for export operations. Items after the first may fail with
/// [`AttemptFailure::StreamBroken`]; the executor surfaces those as
/// `StreamInterrupted` without retrying.
pub type RawByteStream =
    Pin<Box<dyn Stream<Item = std::result::Result<Bytes, AttemptFailure>> + Send + 'static>>;

/// Everything that can go wrong in a single exchange, described factually.
/// The classifier maps each variant to exactly one taxonomy member.
#[derive(Debug, Clone)]
pub enum AttemptFailure {
    /// TCP/TLS connection could not be established. The operation cannot
    /// have been applied remotely.
    Connect { message: String },
    /// The exchange timed out. The remote side may or may not have applied
    /// the operation.
    Timeout { message: String },
    /// A non-success HTTP status with whatever detail the server provided.
    Status {
        status: u16,
        detail: String,
        retry_after: Option<Duration>,
    },
    /// The response arrived but could not be decoded as the wire envelope.
    Decode { message: String },
    /// The caller's cancellation signal fired while the call was in flight.
    Cancelled,
    /// An export stream failed after delivery had begun.
    StreamBroken { message: String },
}

impl AttemptFailure {
    pub fn message(&self) -> String {
        match self {
            AttemptFailure::Connect { message } => format!("connection failed: {message}"),
            AttemptFailure::Timeout { message } => format!("request timed out: {message}"),
            AttemptFailure::Status { status, detail, .. } => {
                format!("server returned {status}: {detail}")
            }
            AttemptFailure::Decode { message } => format!("unreadable response: {message}"),
            AttemptFailure::Cancelled => "cancelled by caller".to_string(),
            AttemptFailure::StreamBroken { message } => {
                format!("export stream broke: {message}")
            }
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            AttemptFailure::Status { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// One request/response exchange against the remote service.
///
/// Implementations own connection-level concerns: timeouts, TLS, header
/// injection. They never retry; the executor does.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Dispatch one operation and return the decoded reply envelope.
    async fn send(&self, op: &Operation) -> std::result::Result<OpResponse, AttemptFailure>;

    /// Start an export and return the response byte stream. Returning `Ok`
    /// means the response headers arrived; body chunks may still fail.
    async fn stream(&self, op: &Operation) -> std::result::Result<RawByteStream, AttemptFailure>;
}
