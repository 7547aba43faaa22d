//! Shared tags and coordinates used across the skilltree workspace.
//!
//! # Invariants
//! - Tag sets are closed; every table keyed by them matches exhaustively.
//! - In-cluster coordinates are always within `0..CLUSTER_SIZE`.

mod types;

pub use types::{
    Affinity, CENTER, CLUSTER_SIZE, ClusterCoord, CommonError, Direction, GridPos, NodeType,
};

pub fn crate_info() -> &'static str {
    "skilltree-common v0.1.0"
}
