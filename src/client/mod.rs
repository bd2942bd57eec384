//! Imperative client surface.
//!
//! Implementation is split across submodules: construction in `builder`,
//! the session core in `core`, typed parameters and results in `types`,
//! and the materials extension in the crate-level `materials` module.

pub mod builder;
pub mod core;
pub mod types;

pub use builder::ClientBuilder;
pub use core::ConjureClient;
pub use types::{
    Axis, BoundingBox, Measurement, Mutation, ObjectOpts, RemoteObject, ScaleFactor,
};
