//! scenegate core: transport-agnostic wire protocol, message identity, and
//! error types.
//!
//! This crate defines the frame format and the contracts shared by the
//! routing runtime, gateway processes, and game-logic servers. It
//! intentionally carries no transport or runtime dependencies so it can be
//! reused in multiple contexts.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `SceneGateError`/`Result` so server
//! processes do not crash on malformed traffic.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod message;
pub mod protocol;

/// Shared result type.
pub use error::{Result, SceneGateError};
