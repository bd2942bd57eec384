//! Request execution engine: classification, retry policy, cancellation,
//! and the executor that ties them to the transport.

pub mod cancel;
pub mod classify;
pub mod executor;
pub mod policy;

pub use cancel::{cancel_pair, CancelHandle, CancelToken};
pub use classify::classify;
pub use executor::{ExportByteStream, RequestExecutor};
pub use policy::{Decision, RetryPolicy, RetryState};
