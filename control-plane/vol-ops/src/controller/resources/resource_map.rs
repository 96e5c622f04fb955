use super::{ResourceMutex, ResourceUid};
use indexmap::IndexMap;
use std::{fmt::Debug, hash::Hash};

/// Map of resources keyed by their identifier, holding the mutex-wrapped
/// specs shared with in-flight operation guards.
#[derive(Debug)]
pub struct ResourceMap<I, S: Clone> {
    map: IndexMap<I, ResourceMutex<S>>,
}

impl<I, S> Default for ResourceMap<I, S>
where
    I: Eq + Hash + Clone,
    S: Clone + ResourceUid<Uid = I> + Debug,
{
    fn default() -> Self {
        Self {
            map: IndexMap::new(),
        }
    }
}

impl<I, S> ResourceMap<I, S>
where
    I: Eq + Hash + Clone,
    S: Clone + ResourceUid<Uid = I> + Debug,
{
    /// Get the resource with the given key.
    pub fn get(&self, key: &I) -> Option<&ResourceMutex<S>> {
        self.map.get(key)
    }

    /// Insert an element or update an existing entry in the map.
    pub fn insert(&mut self, value: S) -> ResourceMutex<S> {
        match self.map.get(value.uid()) {
            Some(entry) => {
                let mut e = entry.lock();
                *e = value;
                entry.clone()
            }
            None => {
                let key = value.uid().clone();
                let resource: ResourceMutex<S> = value.into();
                self.map.insert(key, resource.clone());
                resource
            }
        }
    }

    /// Remove an element from the map.
    pub fn remove(&mut self, key: &I) {
        self.map.remove(key);
    }

    /// Return the length of the map.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
