use std::{fmt, hash::{Hash, Hasher}, marker::PhantomData, ops::{Index, IndexMut}};

use indexmap::IndexMap;

use super::osm::{Element, OsmId};

/// Stable reference to an element stored in an [`Arena`].
///
/// A handle is only meaningful for the arena that issued it. Elements are
/// never moved or removed once created, so a handle stays valid for the
/// lifetime of the arena and always observes the latest contents.
pub struct Handle<T> {
    index: usize,
    _kind: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(index: usize) -> Self {
        Handle {
            index,
            _kind: PhantomData,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.index)
    }
}

/// Identity map from element id to a single record.
///
/// `get_or_create` is the only way records come into existence, so every
/// mention of an id within one arena resolves to the same slot.
#[derive(Debug)]
pub struct Arena<T> {
    items: IndexMap<OsmId, T>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Arena { items: IndexMap::new() }
    }
}

impl<T: Element> Arena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record for `id`, inserting a placeholder carrying only
    /// the id when it has not been seen yet.
    pub fn get_or_create(&mut self, id: OsmId) -> Handle<T> {
        let entry = self.items.entry(id);
        let index = entry.index();
        entry.or_insert_with(|| T::placeholder(id));
        Handle::new(index)
    }

    /// Stores `element` under its own id, overwriting an earlier record in
    /// place so outstanding handles stay valid.
    pub fn replace(&mut self, element: T) -> Handle<T> {
        let (index, _) = self.items.insert_full(element.meta().id, element);
        Handle::new(index)
    }

    pub fn handle(&self, id: OsmId) -> Option<Handle<T>> {
        self.items.get_index_of(&id).map(Handle::new)
    }

    pub fn get(&self, id: OsmId) -> Option<&T> {
        self.items.get(&id)
    }

    pub fn get_mut(&mut self, id: OsmId) -> Option<&mut T> {
        self.items.get_mut(&id)
    }

    pub fn contains(&self, id: OsmId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Records in the order their ids were first mentioned.
    pub fn iter(&self) -> impl Iterator<Item = (OsmId, &T)> {
        self.items.iter().map(|(&id, item)| (id, item))
    }

    pub fn ids(&self) -> impl Iterator<Item = OsmId> + '_ {
        self.items.keys().copied()
    }
}

impl<T> Index<Handle<T>> for Arena<T> {
    type Output = T;

    fn index(&self, handle: Handle<T>) -> &T {
        &self.items[handle.index]
    }
}

impl<T> IndexMut<Handle<T>> for Arena<T> {
    fn index_mut(&mut self, handle: Handle<T>) -> &mut T {
        &mut self.items[handle.index]
    }
}

#[cfg(test)]
mod tests {
    use crate::data::osm::{Meta, Node};

    use super::*;

    #[test]
    fn get_or_create_returns_the_same_handle() {
        let mut arena: Arena<Node> = Arena::new();
        let first = arena.get_or_create(42);
        let second = arena.get_or_create(42);
        assert_eq!(first, second);
        assert_eq!(arena.len(), 1);
        assert_eq!(arena[first].meta, Meta::with_id(42));
    }

    #[test]
    fn replace_fills_placeholder_in_place() {
        let mut arena: Arena<Node> = Arena::new();
        let placeholder = arena.get_or_create(7);
        arena.get_or_create(8);

        let filled = arena.replace(Node { meta: Meta::with_id(7), lat: 1.5, lon: -2.5 });

        assert_eq!(placeholder, filled);
        assert_eq!(arena[placeholder].lat, 1.5);
        assert_eq!(arena.ids().collect::<Vec<_>>(), vec![7, 8]);
    }

    #[test]
    fn replace_files_records_under_their_own_id() {
        let mut arena: Arena<Node> = Arena::new();
        let fresh = arena.replace(Node { meta: Meta::with_id(3), lat: 0.5, lon: 0.5 });
        let placeholder = arena.get_or_create(9);

        assert_eq!(arena.handle(3), Some(fresh));
        assert_eq!(arena.handle(9), Some(placeholder));
        assert_eq!(arena.get(3).map(|node| node.lat), Some(0.5));
        for (id, node) in arena.iter() {
            assert_eq!(id, node.meta.id);
        }
    }

    #[test]
    fn lookups_miss_unknown_ids() {
        let arena: Arena<Node> = Arena::new();
        assert!(arena.is_empty());
        assert!(arena.handle(1).is_none());
        assert!(arena.get(1).is_none());
        assert!(!arena.contains(1));
    }
}
