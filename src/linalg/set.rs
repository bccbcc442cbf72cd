use crate::linalg::vector::{Norm, Vector};
use crate::{E, Error, I};

/// Tolerance used by [`VectorSet::contains`], under the L∞ norm.
pub const CONTAINS_PRECISION: E = 1e-8;

/// Handle to a traversal position inside a [`VectorSet`].
///
/// Cursors are owned by the set that vended them: every operation goes back
/// through the set, and a handle whose element was removed (or whose set was
/// cleared) is rejected with [`Error::WrongArg`]. Slots are never reused, so
/// a stale handle can not alias a newer cursor.
#[derive(Debug)]
pub struct SetCursor {
    slot: I,
}

/// Ordered multiset of vectors sharing one dimension.
///
/// Insertion and indexed access copy the stored vectors; membership is a
/// linear scan under [`CONTAINS_PRECISION`].
#[derive(Debug)]
pub struct VectorSet {
    dim: I,
    items: Vec<Vector>,
    cursors: Vec<Option<I>>,
}

impl VectorSet {
    pub fn new(dim: I) -> Result<Self, Error> {
        if dim == 0 {
            tracing::warn!("cannot create a set of zero-dimensional vectors");
            return Err(Error::WrongArg);
        }
        Ok(Self {
            dim,
            items: Vec::new(),
            cursors: Vec::new(),
        })
    }

    pub fn dim(&self) -> I {
        self.dim
    }

    pub fn len(&self) -> I {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Stores a copy of `item`.
    pub fn put(&mut self, item: &Vector) -> Result<(), Error> {
        if item.dim() != self.dim {
            tracing::warn!(
                item = item.dim(),
                dim = self.dim,
                "set and item dimensions mismatch"
            );
            return Err(Error::DimensionsMismatch);
        }
        self.items.push(item.clone());
        Ok(())
    }

    /// Returns a copy of the element at `index`.
    pub fn get(&self, index: I) -> Result<Vector, Error> {
        self.items.get(index).cloned().ok_or_else(|| {
            tracing::warn!(index, len = self.items.len(), "set index out of range");
            Error::OutOfRange
        })
    }

    /// Removes the element at `index`. Cursors past it shift down by one;
    /// cursors positioned exactly at it are invalidated.
    pub fn remove(&mut self, index: I) -> Result<(), Error> {
        if index >= self.items.len() {
            tracing::warn!(index, len = self.items.len(), "set index out of range");
            return Err(Error::OutOfRange);
        }
        for state in &mut self.cursors {
            match state {
                Some(pos) if *pos > index => *pos -= 1,
                Some(pos) if *pos == index => *state = None,
                _ => {}
            }
        }
        self.items.remove(index);
        Ok(())
    }

    /// Linear membership scan under the L∞ norm with [`CONTAINS_PRECISION`].
    pub fn contains(&self, item: &Vector) -> Result<bool, Error> {
        if item.dim() != self.dim {
            tracing::warn!(
                item = item.dim(),
                dim = self.dim,
                "set and item dimensions mismatch"
            );
            return Err(Error::DimensionsMismatch);
        }
        for stored in &self.items {
            if item.eq_with(stored, Norm::Inf, CONTAINS_PRECISION)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Drops every element and invalidates every live cursor.
    pub fn clear(&mut self) {
        self.items.clear();
        for state in &mut self.cursors {
            *state = None;
        }
    }

    /// Cursor at the first element. Fails on an empty set.
    pub fn begin(&mut self) -> Result<SetCursor, Error> {
        self.cursor_at(0)
    }

    /// Cursor at the last element. Fails on an empty set.
    pub fn end(&mut self) -> Result<SetCursor, Error> {
        self.cursor_at(self.items.len().wrapping_sub(1))
    }

    pub fn advance(&mut self, cursor: &SetCursor) -> Result<(), Error> {
        let pos = self.position(cursor)?;
        if pos + 1 >= self.items.len() {
            tracing::warn!("cursor already at the end of the set");
            return Err(Error::OutOfRange);
        }
        self.cursors[cursor.slot] = Some(pos + 1);
        Ok(())
    }

    pub fn retreat(&mut self, cursor: &SetCursor) -> Result<(), Error> {
        let pos = self.position(cursor)?;
        if pos == 0 {
            tracing::warn!("cursor already at the begin of the set");
            return Err(Error::OutOfRange);
        }
        self.cursors[cursor.slot] = Some(pos - 1);
        Ok(())
    }

    pub fn is_begin(&self, cursor: &SetCursor) -> Result<bool, Error> {
        Ok(self.position(cursor)? == 0)
    }

    pub fn is_end(&self, cursor: &SetCursor) -> Result<bool, Error> {
        Ok(self.position(cursor)? + 1 == self.items.len())
    }

    /// Returns a copy of the element under `cursor`.
    pub fn get_by_cursor(&self, cursor: &SetCursor) -> Result<Vector, Error> {
        let pos = self.position(cursor)?;
        self.get(pos)
    }

    /// Releases `cursor`, consuming the handle.
    pub fn release(&mut self, cursor: SetCursor) -> Result<(), Error> {
        self.position(&cursor)?;
        self.cursors[cursor.slot] = None;
        Ok(())
    }

    fn cursor_at(&mut self, pos: I) -> Result<SetCursor, Error> {
        if self.items.is_empty() {
            tracing::warn!("cannot create a cursor over an empty set");
            return Err(Error::WrongArg);
        }
        self.cursors.push(Some(pos));
        Ok(SetCursor {
            slot: self.cursors.len() - 1,
        })
    }

    fn position(&self, cursor: &SetCursor) -> Result<I, Error> {
        match self.cursors.get(cursor.slot) {
            Some(Some(pos)) => Ok(*pos),
            _ => {
                tracing::warn!(slot = cursor.slot, "unknown or invalidated set cursor");
                Err(Error::WrongArg)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_set() -> VectorSet {
        let mut set = VectorSet::new(2).unwrap();
        for coords in [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]] {
            set.put(&Vector::new(&coords).unwrap()).unwrap();
        }
        set
    }

    #[test]
    fn put_and_get_copy_the_element() {
        let mut set = sample_set();
        let mut probe = set.get(1).unwrap();
        assert_eq!(probe.coords(), &[1.0, 1.0]);
        // Mutating the returned copy must not affect the stored element.
        probe.set(0, 99.0).unwrap();
        assert_eq!(set.get(1).unwrap().coords(), &[1.0, 1.0]);
        assert_eq!(set.len(), 3);
        set.clear();
        assert!(set.is_empty());
    }

    #[test]
    fn put_rejects_other_dimensions() {
        let mut set = sample_set();
        let odd = Vector::new(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(set.put(&odd).unwrap_err(), Error::DimensionsMismatch);
        assert_eq!(set.contains(&odd).unwrap_err(), Error::DimensionsMismatch);
    }

    #[test]
    fn contains_uses_the_tolerance() {
        let set = sample_set();
        let close = Vector::new(&[1.0 + 1e-9, 1.0 - 1e-9]).unwrap();
        let far = Vector::new(&[1.0 + 1e-6, 1.0]).unwrap();
        assert!(set.contains(&close).unwrap());
        assert!(!set.contains(&far).unwrap());
    }

    #[test]
    fn removal_shifts_and_invalidates_cursors() {
        let mut set = sample_set();
        let at_removed = set.begin().unwrap();
        set.advance(&at_removed).unwrap();
        let past_removed = set.end().unwrap();

        set.remove(1).unwrap();

        // The cursor that sat on the removed element is gone.
        assert_eq!(
            set.get_by_cursor(&at_removed).unwrap_err(),
            Error::WrongArg
        );
        // The cursor past it shifted down and still reads its element.
        assert_eq!(set.get_by_cursor(&past_removed).unwrap().coords(), &[2.0, 2.0]);
        assert!(set.is_end(&past_removed).unwrap());
    }

    #[test]
    fn cursor_walks_both_ways() {
        let mut set = sample_set();
        let cursor = set.begin().unwrap();
        assert!(set.is_begin(&cursor).unwrap());
        assert_eq!(set.retreat(&cursor).unwrap_err(), Error::OutOfRange);
        set.advance(&cursor).unwrap();
        set.advance(&cursor).unwrap();
        assert!(set.is_end(&cursor).unwrap());
        assert_eq!(set.advance(&cursor).unwrap_err(), Error::OutOfRange);
        set.release(cursor).unwrap();
    }

    #[test]
    fn released_cursor_is_unknown() {
        let mut set = sample_set();
        let cursor = set.begin().unwrap();
        set.release(cursor).unwrap();
        // A fresh cursor occupies a fresh slot; the released one stays dead.
        let fresh = set.begin().unwrap();
        assert!(set.is_begin(&fresh).unwrap());
    }

    #[test]
    fn empty_set_has_no_cursors() {
        let mut set = VectorSet::new(2).unwrap();
        assert_eq!(set.begin().unwrap_err(), Error::WrongArg);
        assert_eq!(set.end().unwrap_err(), Error::WrongArg);
        assert_eq!(set.get(0).unwrap_err(), Error::OutOfRange);
        assert_eq!(set.remove(0).unwrap_err(), Error::OutOfRange);
    }
}
