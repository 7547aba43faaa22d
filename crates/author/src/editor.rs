use skilltree_common::{ClusterCoord, GridPos};
use skilltree_input::Action;
use skilltree_kernel::{GridError, GridState};

/// A reversible node edit.
///
/// Carries both the old and new flag so it can undo itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditCommand {
    SetAssigned { pos: GridPos, old: bool, new: bool },
}

impl EditCommand {
    /// Produce the inverse command (for undo).
    pub fn inverse(&self) -> Self {
        match *self {
            Self::SetAssigned { pos, old, new } => Self::SetAssigned {
                pos,
                old: new,
                new: old,
            },
        }
    }

    fn apply(&self, grid: &mut GridState) -> Result<(), GridError> {
        match *self {
            Self::SetAssigned { pos, new, .. } => grid.set_node_assigned(pos, new).map(|_| ()),
        }
    }
}

/// Errors from edit operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// What an applied action did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The connector's neighbour is now present and stitched.
    Revealed { neighbor: ClusterCoord },
    /// The node now has this `assigned` value.
    Toggled { pos: GridPos, assigned: bool },
    /// Undo or redo ran; `false` when the stack was empty.
    History { changed: bool },
    Nothing,
}

/// Applies actions to a `GridState` and tracks node toggles in undo/redo
/// stacks.
#[derive(Debug, Default)]
pub struct Editor {
    undo_stack: Vec<EditCommand>,
    redo_stack: Vec<EditCommand>,
}

impl Editor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Execute one viewer action.
    pub fn apply(
        &mut self,
        grid: &mut GridState,
        action: Action,
    ) -> Result<ActionOutcome, EditError> {
        match action {
            Action::Reveal { cluster, connector } => {
                let neighbor = grid.reveal_neighbor_from_connector(cluster, connector)?.coord;
                Ok(ActionOutcome::Revealed { neighbor })
            }
            Action::ToggleNode(pos) => {
                let assigned = self.toggle(grid, pos)?;
                Ok(ActionOutcome::Toggled { pos, assigned })
            }
            Action::Undo => Ok(ActionOutcome::History {
                changed: self.undo(grid)?,
            }),
            Action::Redo => Ok(ActionOutcome::History {
                changed: self.redo(grid)?,
            }),
            Action::Noop => Ok(ActionOutcome::Nothing),
        }
    }

    /// Flip a node's `assigned` flag and push to undo stack. Returns the new value.
    pub fn toggle(&mut self, grid: &mut GridState, pos: GridPos) -> Result<bool, EditError> {
        let new = grid.toggle_node(pos)?;
        self.undo_stack.push(EditCommand::SetAssigned {
            pos,
            old: !new,
            new,
        });
        self.redo_stack.clear();
        Ok(new)
    }

    /// Undo the last edit. Returns true if an operation was undone.
    ///
    /// If the inverse is rejected (say the node was stitched since) the
    /// command stays on the undo stack.
    pub fn undo(&mut self, grid: &mut GridState) -> Result<bool, EditError> {
        let Some(cmd) = self.undo_stack.pop() else {
            return Ok(false);
        };
        if let Err(err) = cmd.inverse().apply(grid) {
            tracing::debug!(?cmd, %err, "undo rejected");
            self.undo_stack.push(cmd);
            return Err(err.into());
        }
        self.redo_stack.push(cmd);
        Ok(true)
    }

    /// Redo the last undone edit. Returns true if an operation was redone.
    pub fn redo(&mut self, grid: &mut GridState) -> Result<bool, EditError> {
        let Some(cmd) = self.redo_stack.pop() else {
            return Ok(false);
        };
        if let Err(err) = cmd.apply(grid) {
            tracing::debug!(?cmd, %err, "redo rejected");
            self.redo_stack.push(cmd);
            return Err(err.into());
        }
        self.undo_stack.push(cmd);
        Ok(true)
    }

    /// Number of operations on the undo stack.
    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    /// Number of operations on the redo stack.
    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }
}
