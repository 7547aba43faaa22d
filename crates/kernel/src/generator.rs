//! Cluster content generation.
//!
//! One random stream per cluster, consumed in a fixed order: the 25 node
//! (affinity, type) pairs row-major, then the connector count, then each
//! connector's (side, edge index, affinity, type). Changing that order changes
//! every value after it.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use skilltree_common::{Affinity, CENTER, CLUSTER_SIZE, ClusterCoord, Direction, NodeType};

use crate::cluster::{Cluster, Connector, Node};
use crate::error::GridError;
use crate::rng::{cluster_seed, weighted_choice};

const PRIMARY_WEIGHT: f64 = 1.0;
const SECONDARY_WEIGHT: f64 = 0.8;

/// Extra weight given to the bias tag itself.
const BIAS_SELF_BOOST: f64 = 2.2;
/// Extra weight for the secondaries a primary bias takes part in.
const PRIMARY_BIAS_RELATED_BOOST: f64 = 1.8;
/// Extra weight for the two primaries a secondary bias is blended from.
const SECONDARY_BIAS_RELATED_BOOST: f64 = 1.6;

const MIN_CONNECTORS: usize = 2;
const MAX_CONNECTORS: usize = 6;

/// Affinity weights in draw order, with the bias boost applied.
pub fn affinity_weights(bias: Option<Affinity>) -> [(Affinity, f64); 6] {
    let mut weights = Affinity::ALL.map(|a| {
        let base = if a.is_primary() {
            PRIMARY_WEIGHT
        } else {
            SECONDARY_WEIGHT
        };
        (a, base)
    });
    if let Some(bias) = bias {
        let related_boost = if bias.is_primary() {
            PRIMARY_BIAS_RELATED_BOOST
        } else {
            SECONDARY_BIAS_RELATED_BOOST
        };
        let related = bias.related();
        for (a, w) in weights.iter_mut() {
            if *a == bias {
                *w += BIAS_SELF_BOOST;
            } else if related.contains(a) {
                *w += related_boost;
            }
        }
    }
    weights
}

/// Node-type weights for a given affinity, in draw order
/// (passive, skill, habit, empty).
pub fn node_type_weights(affinity: Affinity) -> [(NodeType, f64); 4] {
    let [passive, skill, habit, empty] = match affinity {
        Affinity::Red => [2.5, 1.5, 1.0, 0.6],
        Affinity::Blue => [2.2, 1.7, 1.1, 0.6],
        Affinity::Yellow => [2.3, 1.6, 1.1, 0.6],
        Affinity::Orange => [2.4, 1.6, 1.0, 0.7],
        Affinity::Green => [2.2, 1.6, 1.2, 0.7],
        Affinity::Violet => [2.2, 1.7, 1.0, 0.7],
    };
    [
        (NodeType::Passive, passive),
        (NodeType::Skill, skill),
        (NodeType::Habit, habit),
        (NodeType::Empty, empty),
    ]
}

fn pick_affinity<R: Rng + ?Sized>(
    rng: &mut R,
    bias: Option<Affinity>,
) -> Result<Affinity, GridError> {
    weighted_choice(rng, &affinity_weights(bias))
}

fn pick_node_type<R: Rng + ?Sized>(
    rng: &mut R,
    affinity: Affinity,
) -> Result<NodeType, GridError> {
    weighted_choice(rng, &node_type_weights(affinity))
}

fn pick_flavor<R: Rng + ?Sized>(
    rng: &mut R,
    bias: Option<Affinity>,
) -> Result<(Affinity, NodeType), GridError> {
    let affinity = pick_affinity(rng, bias)?;
    let node_type = pick_node_type(rng, affinity)?;
    Ok((affinity, node_type))
}

/// Sample 2..=6 border connectors, dropping any that repeat an accepted
/// `(direction, edge_index)` slot. Dropped draws are not retried, so the
/// result can be shorter than the sampled count.
fn make_connectors<R: Rng + ?Sized>(
    rng: &mut R,
    bias: Option<Affinity>,
) -> Result<Vec<Connector>, GridError> {
    let sides = Direction::ALL.map(|d| (d, 1.0));
    let count = rng.gen_range(MIN_CONNECTORS..=MAX_CONNECTORS);
    let mut connectors: Vec<Connector> = Vec::with_capacity(count);
    for _ in 0..count {
        let side = weighted_choice(rng, &sides)?;
        let edge_index = rng.gen_range(0..CLUSTER_SIZE);
        let (affinity, node_type) = pick_flavor(rng, bias)?;
        let candidate = Connector::new(side, edge_index, affinity, node_type)?;
        if connectors.iter().all(|c| !c.same_slot(&candidate)) {
            connectors.push(candidate);
        }
    }
    Ok(connectors)
}

/// Generate a full cluster from an explicit seed.
///
/// When `is_origin` is set the centre node is flagged `is_center` and
/// `assigned`; its sampled affinity and type are kept.
pub fn generate(
    coord: ClusterCoord,
    seed: u64,
    bias: Option<Affinity>,
    is_origin: bool,
) -> Result<Cluster, GridError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut flavors = [[(Affinity::Red, NodeType::Empty); CLUSTER_SIZE]; CLUSTER_SIZE];
    for row in flavors.iter_mut() {
        for cell in row.iter_mut() {
            *cell = pick_flavor(&mut rng, bias)?;
        }
    }
    let connectors = make_connectors(&mut rng, bias)?;

    let nodes = std::array::from_fn(|iy| {
        std::array::from_fn(|ix| {
            let (affinity, node_type) = flavors[iy][ix];
            let mut node = Node::new(affinity, node_type);
            if is_origin && ix == CENTER && iy == CENTER {
                node.is_center = true;
                node.assigned = true;
            }
            node
        })
    });

    Ok(Cluster {
        coord,
        bias,
        nodes,
        connectors,
    })
}

/// Generates clusters for one world seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterGenerator {
    world_seed: u64,
}

impl ClusterGenerator {
    pub fn new(world_seed: u64) -> Self {
        Self { world_seed }
    }

    pub fn world_seed(&self) -> u64 {
        self.world_seed
    }

    /// Generate the cluster at `coord` with its coordinate-derived seed.
    pub fn generate(
        &self,
        coord: ClusterCoord,
        bias: Option<Affinity>,
    ) -> Result<Cluster, GridError> {
        let seed = cluster_seed(self.world_seed, coord.x, coord.y);
        generate(coord, seed, bias, coord.is_origin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEEDS: [u64; 4] = [0, 1, 1337, (1 << 31) - 1];

    fn weight_of(weights: &[(Affinity, f64)], a: Affinity) -> f64 {
        weights.iter().find(|(x, _)| *x == a).map(|(_, w)| *w).unwrap()
    }

    #[test]
    fn neutral_weights_favor_primaries() {
        let w = affinity_weights(None);
        assert_eq!(w.map(|(a, _)| a), Affinity::ALL);
        for (a, weight) in w {
            let expected = if a.is_primary() { 1.0 } else { 0.8 };
            assert_eq!(weight, expected);
        }
    }

    #[test]
    fn primary_bias_boosts_its_secondaries() {
        let w = affinity_weights(Some(Affinity::Red));
        assert!((weight_of(&w, Affinity::Red) - 3.2).abs() < 1e-12);
        assert!((weight_of(&w, Affinity::Orange) - 2.6).abs() < 1e-12);
        assert!((weight_of(&w, Affinity::Violet) - 2.6).abs() < 1e-12);
        assert_eq!(weight_of(&w, Affinity::Blue), 1.0);
        assert_eq!(weight_of(&w, Affinity::Green), 0.8);
    }

    #[test]
    fn secondary_bias_boosts_its_components() {
        let w = affinity_weights(Some(Affinity::Green));
        assert!((weight_of(&w, Affinity::Green) - 3.0).abs() < 1e-12);
        assert!((weight_of(&w, Affinity::Blue) - 2.6).abs() < 1e-12);
        assert!((weight_of(&w, Affinity::Yellow) - 2.6).abs() < 1e-12);
        assert_eq!(weight_of(&w, Affinity::Red), 1.0);
        assert_eq!(weight_of(&w, Affinity::Violet), 0.8);
    }

    #[test]
    fn node_type_weights_are_ordered() {
        for a in Affinity::ALL {
            let w = node_type_weights(a);
            assert_eq!(w.map(|(t, _)| t), NodeType::ALL);
            assert!(w.windows(2).all(|pair| pair[0].1 > pair[1].1), "{a:?}");
        }
    }

    #[test]
    fn generation_is_deterministic() {
        let g = ClusterGenerator::new(1337);
        let coord = ClusterCoord::new(4, -7);
        for bias in [None, Some(Affinity::Violet)] {
            assert_eq!(g.generate(coord, bias).unwrap(), g.generate(coord, bias).unwrap());
        }
    }

    #[test]
    fn bias_changes_content() {
        let g = ClusterGenerator::new(1337);
        let coord = ClusterCoord::new(1, 0);
        let neutral = g.generate(coord, None).unwrap();
        let biased = g.generate(coord, Some(Affinity::Blue)).unwrap();
        assert_eq!(biased.bias, Some(Affinity::Blue));
        assert_ne!(neutral.rows(), biased.rows());
    }

    #[test]
    fn origin_center_invariant() {
        for seed in SEEDS {
            let origin = ClusterGenerator::new(seed)
                .generate(ClusterCoord::ORIGIN, None)
                .unwrap();
            assert_eq!(origin.bias, None);
            let center = origin.get_node(2, 2).unwrap();
            assert!(center.is_center, "seed {seed}");
            assert!(center.assigned, "seed {seed}");
            let flagged = origin.nodes().filter(|(_, n)| n.is_center || n.assigned).count();
            assert_eq!(flagged, 1, "seed {seed}");
        }
    }

    #[test]
    fn only_the_origin_has_a_center() {
        let g = ClusterGenerator::new(1);
        for coord in [ClusterCoord::new(1, 0), ClusterCoord::new(0, -1), ClusterCoord::new(9, 9)] {
            let c = g.generate(coord, None).unwrap();
            assert!(c.nodes().all(|(_, n)| !n.is_center && !n.assigned));
        }
    }

    #[test]
    fn explicit_origin_flag_controls_center() {
        let c = generate(ClusterCoord::new(5, 5), 99, None, true).unwrap();
        assert!(c.get_node(2, 2).unwrap().is_center);
        let plain = generate(ClusterCoord::new(5, 5), 99, None, false).unwrap();
        assert!(!plain.get_node(2, 2).unwrap().is_center);
        // Flags differ, sampled content does not.
        assert_eq!(
            c.get_node(2, 2).unwrap().affinity,
            plain.get_node(2, 2).unwrap().affinity
        );
        assert_eq!(c.connectors(), plain.connectors());
    }

    #[test]
    fn connectors_are_unique_and_bounded() {
        for seed in 0..200u64 {
            let c = generate(ClusterCoord::ORIGIN, seed, Some(Affinity::Orange), false).unwrap();
            let conns = c.connectors();
            assert!(!conns.is_empty() && conns.len() <= MAX_CONNECTORS);
            for (i, a) in conns.iter().enumerate() {
                assert!(a.edge_index() < CLUSTER_SIZE);
                assert!(!a.assigned);
                for b in &conns[i + 1..] {
                    assert!(!a.same_slot(b), "seed {seed}: duplicate slot {a:?}");
                }
            }
        }
    }

    #[test]
    fn bias_skews_node_affinities() {
        let mut on_bias = 0;
        let mut total = 0;
        for seed in 0..100u64 {
            let c = generate(ClusterCoord::ORIGIN, seed, Some(Affinity::Yellow), false).unwrap();
            for (_, n) in c.nodes() {
                total += 1;
                if n.affinity == Affinity::Yellow {
                    on_bias += 1;
                }
            }
        }
        // Yellow weight 3.2 of 11.2 total, so roughly 29%.
        let share = on_bias as f64 / total as f64;
        assert!((0.22..0.34).contains(&share), "share={share}");
    }
}
