//! Failure classification.
//!
//! Pure and total: every possible transport failure maps to exactly one
//! taxonomy member. No retries happen here; the policy layer consumes the
//! classification.

use crate::error::Classification;
use crate::transport::AttemptFailure;

/// Map a failed exchange onto the taxonomy.
///
/// Status mapping follows the service's documented codes: 400/422 are
/// parameter rejections, 401/403 credential problems, 404 stale or unknown
/// identities, 429 throttling, 408 and 5xx transient. Anything else falls
/// through to `Unknown`, which the retry policy treats as non-retryable.
pub fn classify(failure: &AttemptFailure) -> Classification {
    match failure {
        AttemptFailure::Connect { .. } => Classification::Transient,
        AttemptFailure::Timeout { .. } => Classification::Transient,
        AttemptFailure::Status { status, .. } => match status {
            400 | 422 => Classification::Validation,
            401 | 403 => Classification::Authentication,
            404 => Classification::ObjectNotFound,
            408 => Classification::Transient,
            429 => Classification::RateLimited,
            500..=599 => Classification::Transient,
            _ => Classification::Unknown,
        },
        AttemptFailure::Decode { .. } => Classification::Unknown,
        AttemptFailure::Cancelled => Classification::Cancelled,
        AttemptFailure::StreamBroken { .. } => Classification::StreamInterrupted,
    }
}
