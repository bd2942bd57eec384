use std::time::Duration;
use thiserror::Error;

/// Failure taxonomy assigned by the classifier.
///
/// Every failed exchange maps to exactly one member. The classification
/// drives both the retry decision and the user-visible error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Malformed or out-of-range parameters rejected before remote processing.
    Validation,
    /// Missing or invalid credentials.
    Authentication,
    /// Referenced identity is stale or unknown.
    ObjectNotFound,
    /// Remote throttling; honor the provided retry-after.
    RateLimited,
    /// Network or server transient failure.
    Transient,
    /// Export stream broke after partial delivery.
    StreamInterrupted,
    /// Caller-initiated cancellation.
    Cancelled,
    /// Unclassifiable failure. Conservative default: not retried.
    Unknown,
}

impl Classification {
    /// Whether the retry policy may retry this class at all.
    pub fn is_retryable(self) -> bool {
        matches!(self, Classification::RateLimited | Classification::Transient)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Validation => "validation",
            Classification::Authentication => "authentication",
            Classification::ObjectNotFound => "object_not_found",
            Classification::RateLimited => "rate_limited",
            Classification::Transient => "transient",
            Classification::StreamInterrupted => "stream_interrupted",
            Classification::Cancelled => "cancelled",
            Classification::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured hint attached to an API error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorHint {
    /// Server-provided wait before the request may be repeated.
    pub retry_after: Option<Duration>,
    /// Offending parameter or field name, when the server names one.
    pub field: Option<String>,
}

impl ErrorHint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retry_after(mut self, after: Duration) -> Self {
        self.retry_after = Some(after);
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

/// Unified error type for the SDK.
#[derive(Debug, Error)]
pub enum Error {
    /// A remote operation failed terminally (retries, if any, exhausted).
    /// Carries the classification assigned to the final attempt.
    #[error("{classification} error: {message}{}", format_hint(.hint))]
    Api {
        classification: Classification,
        message: String,
        hint: ErrorHint,
    },

    /// Credential or endpoint resolution failed before any session existed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Operation issued on a session that has already been closed.
    #[error("session is closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn format_hint(hint: &ErrorHint) -> String {
    let mut parts = Vec::new();
    if let Some(after) = hint.retry_after {
        parts.push(format!("retry after {}s", after.as_secs()));
    }
    if let Some(ref field) = hint.field {
        parts.push(format!("field: {}", field));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    pub(crate) fn api(
        classification: Classification,
        message: impl Into<String>,
        hint: ErrorHint,
    ) -> Self {
        Error::Api {
            classification,
            message: message.into(),
            hint,
        }
    }

    /// The classification for API errors; `None` for local errors.
    pub fn classification(&self) -> Option<Classification> {
        match self {
            Error::Api { classification, .. } => Some(*classification),
            _ => None,
        }
    }

    /// Server-provided retry-after hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::Api { hint, .. } => hint.retry_after,
            _ => None,
        }
    }
}
