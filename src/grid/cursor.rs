//! Traversal cursors over a [`Compact`]'s sample grid.
//!
//! A cursor is a handle into a slot table owned by the compact, mirroring
//! the set cursors in [`crate::linalg::set`]. Default stepping walks the
//! row-major sample order one index at a time; a user step vector instead
//! jumps by adding the step to the current sample and re-projecting.

use super::Compact;
use crate::linalg::vector::{self, Vector};
use crate::{Error, I};

#[derive(Debug, Clone)]
pub(crate) struct CursorState {
    pos: u64,
    step: Option<Vector>,
}

/// Handle to a traversal position inside a [`Compact`].
#[derive(Debug)]
pub struct GridCursor {
    slot: I,
}

impl Compact {
    /// Cursor at the first sample, optionally with a user step vector.
    pub fn begin(&mut self, step: Option<&Vector>) -> Result<GridCursor, Error> {
        self.cursor_at(0, step)
    }

    /// Cursor at the last sample, optionally with a user step vector.
    pub fn end(&mut self, step: Option<&Vector>) -> Result<GridCursor, Error> {
        self.cursor_at(self.points_amount() - 1, step)
    }

    /// Replaces the cursor's step vector; `None` restores default stepping.
    pub fn set_step(&mut self, cursor: &GridCursor, step: Option<&Vector>) -> Result<(), Error> {
        self.cursor_state(cursor)?;
        if let Some(step) = step {
            self.check_step(step)?;
        }
        self.cursor_state_mut(cursor)?.step = step.cloned();
        Ok(())
    }

    /// Advances the cursor.
    ///
    /// Default mode moves to the next sample index and reports
    /// [`Error::OutOfRange`] at the last sample. Stepped mode adds the step
    /// to the current sample, projects back onto the grid, and reports
    /// [`Error::OutOfRange`] when the projection does not move.
    pub fn do_step(&mut self, cursor: &GridCursor) -> Result<(), Error> {
        let state = self.cursor_state(cursor)?.clone();
        let next = match state.step {
            None => {
                if state.pos + 1 >= self.points_amount() {
                    tracing::warn!("grid cursor already at the last sample");
                    return Err(Error::OutOfRange);
                }
                state.pos + 1
            }
            Some(ref step) => {
                let current = self.point_at(state.pos)?;
                let moved = vector::add(&current, step)?;
                let neighbor = self.nearest_neighbor(&moved)?;
                let next = self.index_of(&neighbor)?;
                if next == state.pos {
                    tracing::warn!("grid cursor step projects onto its own sample");
                    return Err(Error::OutOfRange);
                }
                next
            }
        };
        self.cursor_state_mut(cursor)?.pos = next;
        Ok(())
    }

    /// Grid sample under the cursor.
    pub fn point_of(&self, cursor: &GridCursor) -> Result<Vector, Error> {
        let state = self.cursor_state(cursor)?;
        self.point_at(state.pos)
    }

    /// Releases the cursor, consuming the handle.
    pub fn release_cursor(&mut self, cursor: GridCursor) -> Result<(), Error> {
        self.cursor_state(&cursor)?;
        self.cursors[cursor.slot] = None;
        Ok(())
    }

    fn cursor_at(&mut self, pos: u64, step: Option<&Vector>) -> Result<GridCursor, Error> {
        if let Some(step) = step {
            self.check_step(step)?;
        }
        self.cursors.push(Some(CursorState {
            pos,
            step: step.cloned(),
        }));
        Ok(GridCursor {
            slot: self.cursors.len() - 1,
        })
    }

    /// A user step must be able to move the cursor: at least one component
    /// has to exceed half of the corresponding axis increment.
    fn check_step(&self, step: &Vector) -> Result<(), Error> {
        if step.dim() != self.dim() {
            tracing::warn!(
                step = step.dim(),
                dim = self.dim(),
                "cursor step dimensions mismatch"
            );
            return Err(Error::DimensionsMismatch);
        }
        for i in 0..self.dim() {
            if step.get(i)? > self.sampling().get(i)? / 2.0 {
                return Ok(());
            }
        }
        tracing::warn!("cursor step is too small to move on the grid");
        Err(Error::WrongArg)
    }

    fn cursor_state(&self, cursor: &GridCursor) -> Result<&CursorState, Error> {
        match self.cursors.get(cursor.slot) {
            Some(Some(state)) => Ok(state),
            _ => {
                tracing::warn!(slot = cursor.slot, "unknown or released grid cursor");
                Err(Error::WrongArg)
            }
        }
    }

    fn cursor_state_mut(&mut self, cursor: &GridCursor) -> Result<&mut CursorState, Error> {
        match self.cursors.get_mut(cursor.slot) {
            Some(Some(state)) => Ok(state),
            _ => {
                tracing::warn!(slot = cursor.slot, "unknown or released grid cursor");
                Err(Error::WrongArg)
            }
        }
    }
}
