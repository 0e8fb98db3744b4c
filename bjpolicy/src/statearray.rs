use std::collections::BTreeMap;
use std::ops::{Index, IndexMut};

use crate::State;

/// This struct provide a convenient way to use State as the index of the
/// array. Iteration follows the ordering of `State`, so anything built from
/// a StateArray comes out in a deterministic order.
#[derive(Debug, Clone, PartialEq)]
pub struct StateArray<T: Default> {
    data: BTreeMap<State, T>,
}

impl<T: Default> StateArray<T> {
    pub fn new() -> StateArray<T> {
        StateArray {
            data: BTreeMap::new(),
        }
    }

    pub fn contains_state(&self, index: &State) -> bool {
        self.data.contains_key(index)
    }

    pub fn get(&self, index: &State) -> Option<&T> {
        self.data.get(index)
    }

    pub fn get_mut(&mut self, index: &State) -> Option<&mut T> {
        self.data.get_mut(index)
    }

    pub fn insert(&mut self, index: State, value: T) -> Option<T> {
        self.data.insert(index, value)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn states(&self) -> impl Iterator<Item = &State> + '_ {
        self.data.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&State, &T)> + '_ {
        self.data.iter()
    }
}

impl<T: Default> Default for StateArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Default> FromIterator<(State, T)> for StateArray<T> {
    fn from_iter<I: IntoIterator<Item = (State, T)>>(iter: I) -> Self {
        StateArray {
            data: iter.into_iter().collect(),
        }
    }
}

/// Panics if the state has never been written.
impl<T: Default> Index<&State> for StateArray<T> {
    type Output = T;
    fn index(&self, index: &State) -> &Self::Output {
        &self.data[index]
    }
}

/// Writing through an unseen state creates a default entry first.
impl<T: Default> IndexMut<&State> for StateArray<T> {
    fn index_mut(&mut self, index: &State) -> &mut Self::Output {
        self.data.entry(*index).or_default()
    }
}
