//! Actions: the vocabulary a viewer translates its input into.
//!
//! # Invariants
//! - Actions carry addresses only, never references into the world store.
//! - Hit-testing and camera handling stay in the viewer.

pub mod action;

pub use action::{Action, ActionParseError};

pub fn crate_info() -> &'static str {
    "skilltree-input v0.1.0"
}
