use skilltree_common::{ClusterCoord, CommonError, GridPos};

/// Errors from generation and world-store operations.
///
/// Every variant is a precondition violation reported immediately. Looking up
/// an absent cluster is not an error and is modelled with `Option` instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridError {
    #[error(transparent)]
    Common(#[from] CommonError),
    #[error("edge index {0} outside 0..5")]
    EdgeIndexOutOfRange(usize),
    #[error("weighted draw over an empty list")]
    EmptyWeights,
    #[error("weights must sum to a positive finite value, got {total}")]
    InvalidWeights { total: f64 },
    #[error("no cluster at {0}")]
    ClusterNotFound(ClusterCoord),
    #[error("cluster {coord} has no connector #{index}")]
    ConnectorNotFound { coord: ClusterCoord, index: usize },
    #[error("centre node {0} cannot be toggled")]
    CenterNodeLocked(GridPos),
    #[error("node {0} is stitched to an assigned connector and must stay assigned")]
    StitchedNodeLocked(GridPos),
}
