//! Top-level facade crate for scenegate.
//!
//! Re-exports the core protocol types and the routing runtime so server
//! binaries can depend on a single crate.

pub mod core {
    pub use scenegate_core::*;
}

pub mod runtime {
    pub use scenegate_runtime::*;
}
