//! Developer Tooling: grid inspector, text rendering, invariant checks.
//!
//! # Invariants
//! - Tools are read-only over the world store.

pub mod inspector;

pub use inspector::{ClusterInfo, GridInspector, GridSummary, ValidationReport, Violation};

pub fn crate_info() -> &'static str {
    "skilltree-tools v0.1.0"
}
