//! # conjure-rs
//!
//! Rust client SDK for the Conjure remote CAD geometry service.
//!
//! All geometry computation (booleans, fillets, meshing, export) happens
//! server-side. This crate represents a script as a sequence of remote
//! operations, dispatches them reliably, tracks the resulting object
//! identities, and exposes two equivalent surfaces over one core:
//!
//! - an imperative client ([`ConjureClient`], plus [`blocking::ConjureClient`])
//! - a fluent builder ([`Part`] / [`ObjectRef`], plus blocking counterparts)
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use conjure_rs::{Part, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     Part::scope("Holder", |p| async move {
//!         let mut base = p.cuboid(100.0, 50.0, 30.0).await?;
//!         let hole = p.hole(10.0, 40.0, [50.0, 25.0, 0.0]).await?;
//!         base.cut(&hole).await?.fillet(&["top"], 2.0).await?;
//!         p.export_stl(&[&base]).await?.save("holder.stl").await?;
//!         Ok(())
//!     })
//!     .await
//! }
//! ```
//!
//! ## Reliability model
//!
//! Every operation runs through one executor: failures are classified into a
//! fixed taxonomy ([`Classification`]), retryable classes back off
//! exponentially with jitter (server retry-after honored verbatim), and
//! terminal outcomes surface as typed errors. Dispatch is at-least-once: a
//! retried operation may have been applied server-side before its response
//! was lost. Exports retry only until the first byte; a broken stream after
//! that surfaces as `StreamInterrupted`.
//!
//! ## Module organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Imperative session client and construction |
//! | [`part`] | Fluent builder surface (`Part`, `ObjectRef`) |
//! | [`blocking`] | Synchronous facades over the same core |
//! | [`exec`] | Executor, retry policy, classification, cancellation |
//! | [`transport`] | Transport trait and the HTTP implementation |
//! | [`graph`] | Per-session object identity registry |
//! | [`export`] | Export byte-stream delivery |
//! | [`materials`] | Engineering-materials library client |

pub mod blocking;
pub mod client;
pub mod config;
pub mod exec;
pub mod export;
pub mod graph;
pub mod materials;
pub mod op;
pub mod part;
pub mod transport;

mod error;

pub use client::{
    Axis, BoundingBox, ClientBuilder, ConjureClient, Measurement, Mutation, ObjectOpts,
    RemoteObject, ScaleFactor,
};
pub use error::{Classification, Error, ErrorHint};
pub use exec::{cancel_pair, CancelHandle, CancelToken, RetryPolicy};
pub use export::{ExportFormat, ExportStream};
pub use graph::{ObjectGraph, ObjectId, ObjectRecord, ObjectState};
pub use materials::EngineeringMaterial;
pub use op::{Operation, OperationKind};
pub use part::{ObjectRef, Part};
pub use transport::Transport;

/// Result type alias for the SDK.
pub type Result<T> = std::result::Result<T, Error>;
