use bitvec::prelude::*;

/// Set of NFA state ids backed by a bit vector, usable as a hash key once
/// every set compared against it has the same length. Only subset
/// construction keys use it, transitions keep sparse id lists.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct StateSet {
    inner: BitVec,
}

impl StateSet {
    pub fn new(state_count: usize) -> StateSet {
        StateSet {
            inner: BitVec::repeat(false, state_count),
        }
    }

    /// Returns `true` if `id` was not in the set yet.
    pub fn insert(&mut self, id: usize) -> bool {
        if self.inner[id] {
            return false;
        }
        self.inner.set(id, true);
        true
    }

    pub fn contains(&self, id: usize) -> bool {
        self.inner.get(id).is_some_and(|bit| *bit)
    }

    pub fn extend(&mut self, ids: impl IntoIterator<Item = usize>) {
        for id in ids {
            self.inner.set(id, true);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.inner.iter_ones()
    }

    pub fn len(&self) -> usize {
        self.inner.count_ones()
    }
}
