use serde::{Deserialize, Serialize};
use skilltree_common::{Affinity, CLUSTER_SIZE, ClusterCoord, Direction, GridPos, NodeType};
use std::collections::BTreeMap;

use crate::error::GridError;

/// One cell of a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub affinity: Affinity,
    pub node_type: NodeType,
    pub assigned: bool,
    pub is_center: bool,
    /// Opaque collaborator data. Never read by the core.
    pub payload: BTreeMap<String, String>,
}

impl Node {
    pub fn new(affinity: Affinity, node_type: NodeType) -> Self {
        Self {
            affinity,
            node_type,
            assigned: false,
            is_center: false,
            payload: BTreeMap::new(),
        }
    }
}

/// An unrevealed link from a cluster's border into the adjacent cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connector {
    pub direction: Direction,
    edge_index: usize,
    pub affinity: Affinity,
    pub node_type: NodeType,
    pub assigned: bool,
}

impl Connector {
    /// Create an unassigned connector. Fails if `edge_index` is off the border.
    pub fn new(
        direction: Direction,
        edge_index: usize,
        affinity: Affinity,
        node_type: NodeType,
    ) -> Result<Self, GridError> {
        if edge_index >= CLUSTER_SIZE {
            return Err(GridError::EdgeIndexOutOfRange(edge_index));
        }
        Ok(Self {
            direction,
            edge_index,
            affinity,
            node_type,
            assigned: false,
        })
    }

    /// Position along the border, `0..5`.
    pub fn edge_index(&self) -> usize {
        self.edge_index
    }

    /// Coordinate of the cluster this connector leads into.
    pub fn neighbor(&self, from: ClusterCoord) -> ClusterCoord {
        from.neighbor(self.direction)
    }

    /// In-cluster `(ix, iy)` of the border node it attaches to on the far side.
    ///
    /// A north-facing connector lands on the neighbour's southern row, and so on.
    pub fn landing_cell(&self) -> (usize, usize) {
        let last = CLUSTER_SIZE - 1;
        match self.direction {
            Direction::North => (self.edge_index, last),
            Direction::South => (self.edge_index, 0),
            Direction::East => (0, self.edge_index),
            Direction::West => (last, self.edge_index),
        }
    }

    /// Full address of the landing node for a connector leaving `from`.
    pub fn landing_pos(&self, from: ClusterCoord) -> Result<GridPos, GridError> {
        let (ix, iy) = self.landing_cell();
        Ok(GridPos::new(self.neighbor(from), ix, iy)?)
    }

    /// Whether this connector occupies the same border slot as `other`.
    pub fn same_slot(&self, other: &Connector) -> bool {
        self.direction == other.direction && self.edge_index == other.edge_index
    }
}

/// A 5×5 block of nodes anchored at a cluster coordinate, plus its connectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub coord: ClusterCoord,
    /// `None` means the neutral distribution.
    pub bias: Option<Affinity>,
    /// Row-major, indexed `[iy][ix]`.
    pub(crate) nodes: [[Node; CLUSTER_SIZE]; CLUSTER_SIZE],
    pub(crate) connectors: Vec<Connector>,
}

impl Cluster {
    pub fn get_node(&self, ix: usize, iy: usize) -> Option<&Node> {
        self.nodes.get(iy).and_then(|row| row.get(ix))
    }

    pub fn node_at(&self, pos: GridPos) -> &Node {
        &self.nodes[pos.iy()][pos.ix()]
    }

    pub fn rows(&self) -> &[[Node; CLUSTER_SIZE]; CLUSTER_SIZE] {
        &self.nodes
    }

    /// All nodes with their in-cluster `(ix, iy)`, row-major.
    pub fn nodes(&self) -> impl Iterator<Item = ((usize, usize), &Node)> {
        self.nodes.iter().enumerate().flat_map(|(iy, row)| {
            row.iter().enumerate().map(move |(ix, node)| ((ix, iy), node))
        })
    }

    pub fn connectors(&self) -> &[Connector] {
        &self.connectors
    }

    pub fn connector(&self, index: usize) -> Option<&Connector> {
        self.connectors.get(index)
    }

    pub(crate) fn node_mut(&mut self, ix: usize, iy: usize) -> &mut Node {
        &mut self.nodes[iy][ix]
    }
}
