//! World Kernel: deterministic cluster generation and the lazily revealed
//! world store.
//!
//! # Invariants
//! - A cluster's content depends only on the world seed, its coordinate and
//!   its bias, never on the order clusters were visited.
//! - All state mutations flow through [`GridState`].
//! - Once a connector is assigned, the border node it lands on carries its
//!   affinity and type and is assigned.

pub mod cluster;
pub mod config;
pub mod error;
pub mod generator;
pub mod grid;
pub mod rng;

pub use cluster::{Cluster, Connector, Node};
pub use config::{ConfigError, DEFAULT_WORLD_SEED, GridConfig};
pub use error::GridError;
pub use generator::{ClusterGenerator, affinity_weights, node_type_weights};
pub use grid::{GridEvent, GridState};
pub use rng::{cluster_rng, cluster_seed, weighted_choice};

pub fn crate_info() -> &'static str {
    "skilltree-kernel v0.1.0"
}
