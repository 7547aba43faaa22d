use serde::{Deserialize, Serialize};
use skilltree_common::{ClusterCoord, CommonError, GridPos};
use std::str::FromStr;

/// A high-level request a viewer produces from pointer or keyboard input.
///
/// The world store consumes actions, never raw input events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// A connector was hit: reveal the cluster behind it.
    Reveal {
        cluster: ClusterCoord,
        connector: usize,
    },
    /// A node was hit: flip its `assigned` flag.
    ToggleNode(GridPos),
    /// Undo the last node toggle.
    Undo,
    /// Redo the last undone toggle.
    Redo,
    /// No-op (used for input mapping that hasn't been bound yet).
    Noop,
}

/// Errors from parsing the textual action form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionParseError {
    #[error("empty action")]
    Empty,
    #[error("unknown action {0:?}")]
    UnknownVerb(String),
    #[error("{verb} expects {expected} numeric arguments")]
    BadArguments { verb: &'static str, expected: usize },
    #[error(transparent)]
    Position(#[from] CommonError),
}

fn numbers<const N: usize>(
    verb: &'static str,
    args: &[&str],
) -> Result<[i64; N], ActionParseError> {
    let bad = ActionParseError::BadArguments { verb, expected: N };
    if args.len() != N {
        return Err(bad);
    }
    let mut out = [0i64; N];
    for (slot, arg) in out.iter_mut().zip(args) {
        *slot = arg.parse().map_err(|_| bad.clone())?;
    }
    Ok(out)
}

/// Parses the scripted form used by the CLI:
/// `reveal CX CY INDEX`, `toggle CX CY IX IY`, `undo`, `redo`, `noop`.
impl FromStr for Action {
    type Err = ActionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        let Some((verb, args)) = parts.split_first() else {
            return Err(ActionParseError::Empty);
        };
        match verb.to_ascii_lowercase().as_str() {
            "reveal" => {
                let [cx, cy, index] = numbers::<3>("reveal", args)?;
                let bad = ActionParseError::BadArguments {
                    verb: "reveal",
                    expected: 3,
                };
                Ok(Action::Reveal {
                    cluster: ClusterCoord::new(
                        i32::try_from(cx).map_err(|_| bad.clone())?,
                        i32::try_from(cy).map_err(|_| bad.clone())?,
                    ),
                    connector: usize::try_from(index).map_err(|_| bad)?,
                })
            }
            "toggle" => {
                let [cx, cy, ix, iy] = numbers::<4>("toggle", args)?;
                let bad = ActionParseError::BadArguments {
                    verb: "toggle",
                    expected: 4,
                };
                let cluster = ClusterCoord::new(
                    i32::try_from(cx).map_err(|_| bad.clone())?,
                    i32::try_from(cy).map_err(|_| bad.clone())?,
                );
                let ix = usize::try_from(ix).map_err(|_| bad.clone())?;
                let iy = usize::try_from(iy).map_err(|_| bad)?;
                Ok(Action::ToggleNode(GridPos::new(cluster, ix, iy)?))
            }
            "undo" => Ok(Action::Undo),
            "redo" => Ok(Action::Redo),
            "noop" => Ok(Action::Noop),
            _ => Err(ActionParseError::UnknownVerb((*verb).to_string())),
        }
    }
}
