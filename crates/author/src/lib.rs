//! Authoring: applies viewer actions to the world store, undo/redo for toggles.
//!
//! # Invariants
//! - Node toggles are reversible; reveals are one-way and never undone.
//! - Every change goes through `GridState`, so it lands in its event log.

pub mod editor;

pub use editor::{ActionOutcome, EditCommand, EditError, Editor};

pub fn crate_info() -> &'static str {
    "skilltree-author v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("author"));
    }
}
