use glam::IVec2;
use skilltree_common::{Affinity, CLUSTER_SIZE, ClusterCoord, Direction, GridPos};
use skilltree_kernel::{Cluster, Connector, GridState};
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

/// World inspector for developer tooling.
///
/// Provides read-only queries against the world store for debugging and
/// the CLI.
pub struct GridInspector;

impl GridInspector {
    /// Produce a summary of the world store.
    pub fn summary(grid: &GridState) -> GridSummary {
        let mut summary = GridSummary {
            world_seed: grid.world_seed(),
            cluster_count: grid.cluster_count(),
            pending_events: grid.events().len(),
            ..GridSummary::default()
        };
        for cluster in grid.visible_clusters() {
            summary.assigned_nodes += cluster.nodes().filter(|(_, n)| n.assigned).count();
            for conn in cluster.connectors() {
                if conn.assigned {
                    summary.assigned_connectors += 1;
                } else {
                    summary.open_connectors += 1;
                }
            }
        }
        summary
    }

    pub fn inspect_cluster(grid: &GridState, coord: ClusterCoord) -> Option<ClusterInfo> {
        grid.cluster(coord).map(|cluster| {
            let size = CLUSTER_SIZE as i32;
            let global_min = GridPos::center(coord).global() - IVec2::splat(2);
            let mut affinity_counts = BTreeMap::new();
            for (_, node) in cluster.nodes() {
                *affinity_counts.entry(node.affinity).or_insert(0) += 1;
            }
            ClusterInfo {
                coord,
                bias: cluster.bias,
                global_min,
                global_max: global_min + IVec2::splat(size - 1),
                affinity_counts,
                connectors: cluster.connectors().len(),
            }
        })
    }

    /// Text rendering of one cluster.
    ///
    /// Each node is its affinity letter and type letter; `*` marks an
    /// assigned node and `@` the centre.
    pub fn render_cluster(cluster: &Cluster) -> String {
        let mut out = String::new();
        let bias = cluster
            .bias
            .map_or_else(|| "none".to_string(), |b| format!("{b:?}"));
        let _ = writeln!(out, "cluster {} bias={bias}", cluster.coord);
        for row in cluster.rows() {
            out.push(' ');
            for node in row {
                let mark = if node.is_center {
                    '@'
                } else if node.assigned {
                    '*'
                } else {
                    ' '
                };
                let _ = write!(
                    out,
                    " {}{}{mark}",
                    node.affinity.letter(),
                    node.node_type.letter()
                );
            }
            out.push('\n');
        }
        for (i, conn) in cluster.connectors().iter().enumerate() {
            let _ = writeln!(
                out,
                "  #{i} {}{} {}{} {}",
                conn.direction.letter(),
                conn.edge_index(),
                conn.affinity.letter(),
                conn.node_type.letter(),
                if conn.assigned { "revealed" } else { "open" }
            );
        }
        out
    }

    /// Check the world-store invariants.
    pub fn validate(grid: &GridState) -> ValidationReport {
        Self::validate_clusters(grid.visible_clusters())
    }

    /// Check invariants over any set of clusters.
    ///
    /// A border node claimed by two assigned connectors from different
    /// clusters (a shared corner) must match at least one of them; such
    /// nodes are counted as contested rather than reported.
    pub fn validate_clusters<'a>(
        clusters: impl IntoIterator<Item = &'a Cluster>,
    ) -> ValidationReport {
        let by_coord: BTreeMap<ClusterCoord, &Cluster> =
            clusters.into_iter().map(|c| (c.coord, c)).collect();
        let mut report = ValidationReport::default();

        if let Some(origin) = by_coord.get(&ClusterCoord::ORIGIN) {
            let center = GridPos::center(ClusterCoord::ORIGIN);
            let node = origin.node_at(center);
            if origin.bias.is_some() || !node.is_center || !node.assigned {
                report.violations.push(Violation::OriginRule);
            }
        }

        let mut claims: BTreeMap<GridPos, Vec<Connector>> = BTreeMap::new();
        for cluster in by_coord.values() {
            let conns = cluster.connectors();
            for (i, a) in conns.iter().enumerate() {
                if conns[i + 1..].iter().any(|b| a.same_slot(b)) {
                    report.violations.push(Violation::DuplicateSlot {
                        coord: cluster.coord,
                        direction: a.direction,
                        edge_index: a.edge_index(),
                    });
                }
                if !a.assigned {
                    continue;
                }
                match a.landing_pos(cluster.coord) {
                    Ok(pos) if by_coord.contains_key(&pos.cluster) => {
                        claims.entry(pos).or_default().push(*a);
                    }
                    _ => report.violations.push(Violation::MissingNeighbor {
                        source: cluster.coord,
                        connector: i,
                    }),
                }
            }
        }

        for (pos, claimants) in claims {
            let Some(node) = by_coord.get(&pos.cluster).map(|c| c.node_at(pos)) else {
                continue;
            };
            if !node.assigned {
                report.violations.push(Violation::UnassignedLanding(pos));
            }
            let matches = claimants
                .iter()
                .filter(|c| c.affinity == node.affinity && c.node_type == node.node_type)
                .count();
            if matches == 0 {
                report.violations.push(Violation::MismatchedLanding(pos));
            } else if matches < claimants.len() {
                report.contested += 1;
            }
            report.stitched += 1;
        }

        if !report.is_ok() {
            tracing::debug!(violations = report.violations.len(), "grid validation failed");
        }
        report
    }
}

/// Summary of the world store for the inspector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridSummary {
    pub world_seed: u64,
    pub cluster_count: usize,
    pub assigned_nodes: usize,
    pub open_connectors: usize,
    pub assigned_connectors: usize,
    pub pending_events: usize,
}

impl fmt::Display for GridSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Grid: seed={} clusters={} assigned_nodes={} connectors={}/{} revealed pending_events={}",
            self.world_seed,
            self.cluster_count,
            self.assigned_nodes,
            self.assigned_connectors,
            self.assigned_connectors + self.open_connectors,
            self.pending_events
        )
    }
}

/// Per-cluster details for the inspector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterInfo {
    pub coord: ClusterCoord,
    pub bias: Option<Affinity>,
    /// Global node coordinate of the cluster's `(0, 0)` cell.
    pub global_min: IVec2,
    /// Global node coordinate of the cluster's `(4, 4)` cell.
    pub global_max: IVec2,
    pub affinity_counts: BTreeMap<Affinity, usize>,
    pub connectors: usize,
}

/// A broken world-store invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Origin has a bias or its centre is not flagged centre + assigned.
    OriginRule,
    DuplicateSlot {
        coord: ClusterCoord,
        direction: Direction,
        edge_index: usize,
    },
    /// An assigned connector leads to a cluster that does not exist.
    MissingNeighbor { source: ClusterCoord, connector: usize },
    UnassignedLanding(GridPos),
    /// The landing node matches none of the connectors that claim it.
    MismatchedLanding(GridPos),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::OriginRule => write!(f, "origin centre rule broken"),
            Violation::DuplicateSlot {
                coord,
                direction,
                edge_index,
            } => write!(f, "{coord}: duplicate connector slot {direction:?}{edge_index}"),
            Violation::MissingNeighbor { source, connector } => {
                write!(f, "{source}: connector #{connector} assigned but neighbour missing")
            }
            Violation::UnassignedLanding(pos) => write!(f, "{pos}: stitched node not assigned"),
            Violation::MismatchedLanding(pos) => {
                write!(f, "{pos}: stitched node differs from its connector")
            }
        }
    }
}

/// Outcome of [`GridInspector::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
    /// Border nodes checked against at least one assigned connector.
    pub stitched: usize,
    /// Shared corners whose claimants disagree.
    pub contested: usize,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }
}
