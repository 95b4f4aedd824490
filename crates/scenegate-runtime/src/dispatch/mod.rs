//! Dispatch module exports.
//!
//! Re-exports the pipeline so downstream consumers can depend on this
//! module directly.

pub mod pipeline;

pub use pipeline::DispatchPipeline;
