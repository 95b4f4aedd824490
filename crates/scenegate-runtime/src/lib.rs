//! scenegate routing runtime.
//!
//! This crate wires the handler registry, the scene-affinity scheduler, the
//! dispatch pipeline, and the transport seam into a cohesive routing core.
//! It is intended to be consumed by server binaries and by integration
//! tests; the socket listeners themselves live outside and only hand raw
//! bytes across the [`transport`] boundary.

pub mod config;
pub mod dispatch;
pub mod handler;
pub mod node;
pub mod registry;
pub mod scene;
pub mod transport;
