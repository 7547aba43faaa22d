use glam::IVec2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Width and height of a cluster, in nodes.
pub const CLUSTER_SIZE: usize = 5;

/// In-cluster index of the centre node on both axes.
pub const CENTER: usize = 2;

/// Errors from constructing or parsing shared types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommonError {
    #[error("invalid direction {0:?}, expected one of N, S, E, W")]
    InvalidDirection(String),
    #[error("in-cluster position ({ix}, {iy}) outside 0..5")]
    InCellOutOfRange { ix: usize, iy: usize },
}

/// Colour-wheel flavour of a node or connector.
///
/// Three primaries and three secondaries, each secondary a blend of two
/// primaries. Declaration order is the order used by every weighted draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Affinity {
    Red,
    Blue,
    Yellow,
    /// Red + Yellow.
    Orange,
    /// Yellow + Blue.
    Green,
    /// Red + Blue.
    Violet,
}

impl Affinity {
    pub const ALL: [Affinity; 6] = [
        Affinity::Red,
        Affinity::Blue,
        Affinity::Yellow,
        Affinity::Orange,
        Affinity::Green,
        Affinity::Violet,
    ];

    pub fn is_primary(self) -> bool {
        matches!(self, Affinity::Red | Affinity::Blue | Affinity::Yellow)
    }

    /// The two primaries a secondary is blended from, or `None` for a primary.
    pub fn components(self) -> Option<(Affinity, Affinity)> {
        match self {
            Affinity::Orange => Some((Affinity::Red, Affinity::Yellow)),
            Affinity::Green => Some((Affinity::Yellow, Affinity::Blue)),
            Affinity::Violet => Some((Affinity::Red, Affinity::Blue)),
            Affinity::Red | Affinity::Blue | Affinity::Yellow => None,
        }
    }

    /// The two tags structurally related to this one: the components of a
    /// secondary, or the secondaries a primary takes part in.
    pub fn related(self) -> [Affinity; 2] {
        match self {
            Affinity::Red => [Affinity::Orange, Affinity::Violet],
            Affinity::Blue => [Affinity::Green, Affinity::Violet],
            Affinity::Yellow => [Affinity::Orange, Affinity::Green],
            Affinity::Orange => [Affinity::Red, Affinity::Yellow],
            Affinity::Green => [Affinity::Blue, Affinity::Yellow],
            Affinity::Violet => [Affinity::Red, Affinity::Blue],
        }
    }

    /// Single-letter tag used by text renderings.
    pub fn letter(self) -> char {
        match self {
            Affinity::Red => 'R',
            Affinity::Blue => 'B',
            Affinity::Yellow => 'Y',
            Affinity::Orange => 'O',
            Affinity::Green => 'G',
            Affinity::Violet => 'V',
        }
    }
}

impl FromStr for Affinity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Affinity::ALL
            .into_iter()
            .find(|a| {
                s.eq_ignore_ascii_case(&format!("{a:?}"))
                    || s.eq_ignore_ascii_case(&a.letter().to_string())
            })
            .ok_or_else(|| format!("unknown affinity {s:?}"))
    }
}

/// Gameplay role of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeType {
    Passive,
    Skill,
    Habit,
    /// No gameplay effect.
    Empty,
}

impl NodeType {
    pub const ALL: [NodeType; 4] = [
        NodeType::Passive,
        NodeType::Skill,
        NodeType::Habit,
        NodeType::Empty,
    ];

    pub fn letter(self) -> char {
        match self {
            NodeType::Passive => 'p',
            NodeType::Skill => 's',
            NodeType::Habit => 'h',
            NodeType::Empty => '.',
        }
    }
}

/// Side of a cluster a connector points out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Cluster-coordinate step taken when moving this way. North is -y.
    pub fn offset(self) -> IVec2 {
        match self {
            Direction::North => IVec2::new(0, -1),
            Direction::South => IVec2::new(0, 1),
            Direction::East => IVec2::new(1, 0),
            Direction::West => IVec2::new(-1, 0),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Direction::North => 'N',
            Direction::South => 'S',
            Direction::East => 'E',
            Direction::West => 'W',
        }
    }
}

impl TryFrom<char> for Direction {
    type Error = CommonError;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        match c.to_ascii_uppercase() {
            'N' => Ok(Direction::North),
            'S' => Ok(Direction::South),
            'E' => Ok(Direction::East),
            'W' => Ok(Direction::West),
            _ => Err(CommonError::InvalidDirection(c.to_string())),
        }
    }
}

impl FromStr for Direction {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Direction::try_from(c),
            _ => Direction::ALL
                .into_iter()
                .find(|d| s.eq_ignore_ascii_case(&format!("{d:?}")))
                .ok_or_else(|| CommonError::InvalidDirection(s.to_string())),
        }
    }
}

/// Integer coordinate of a cluster in the world.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ClusterCoord {
    pub x: i32,
    pub y: i32,
}

impl ClusterCoord {
    pub const ORIGIN: ClusterCoord = ClusterCoord { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn is_origin(self) -> bool {
        self == Self::ORIGIN
    }

    /// The adjacent cluster in the given direction.
    pub fn neighbor(self, dir: Direction) -> Self {
        let step = dir.offset();
        Self {
            x: self.x + step.x,
            y: self.y + step.y,
        }
    }
}

impl fmt::Display for ClusterCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Address of a single node: its cluster plus the in-cluster cell.
///
/// Used only for addressing; nodes never store their own position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    pub cluster: ClusterCoord,
    ix: usize,
    iy: usize,
}

impl GridPos {
    pub fn new(cluster: ClusterCoord, ix: usize, iy: usize) -> Result<Self, CommonError> {
        if ix >= CLUSTER_SIZE || iy >= CLUSTER_SIZE {
            return Err(CommonError::InCellOutOfRange { ix, iy });
        }
        Ok(Self { cluster, ix, iy })
    }

    /// Position of the centre node of a cluster.
    pub fn center(cluster: ClusterCoord) -> Self {
        Self {
            cluster,
            ix: CENTER,
            iy: CENTER,
        }
    }

    pub fn ix(&self) -> usize {
        self.ix
    }

    pub fn iy(&self) -> usize {
        self.iy
    }

    pub fn is_center(&self) -> bool {
        self.ix == CENTER && self.iy == CENTER
    }

    /// World-wide node coordinate: `cluster * 5 + in_cluster` on each axis.
    pub fn global(&self) -> IVec2 {
        let size = CLUSTER_SIZE as i32;
        IVec2::new(
            self.cluster.x * size + self.ix as i32,
            self.cluster.y * size + self.iy as i32,
        )
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}, {}]", self.cluster, self.ix, self.iy)
    }
}
