//! Z-ordered registry of renderable objects.
//!
//! The registry knows nothing about rendering; it owns arbitrary payloads
//! keyed by [`SceneId`] and hands them back in draw order. Sorting is
//! memoized: the order is rebuilt lazily after a mutation, and iteration
//! between mutations costs a map lookup per object.

use ahash::AHashMap;

use crate::core::SceneId;

struct SceneEntry<R> {
    renderable: R,
    z_index: f32,
    /// Registration sequence, the tie-break for equal z.
    seq: u64,
}

/// Registry of renderables ordered by ascending z-index.
///
/// Ties sort by registration order, so two objects on the same plane draw
/// in the order they were added. Re-adding an existing id replaces the
/// payload and counts as a fresh registration.
pub struct SceneRegistry<R> {
    entries: AHashMap<SceneId, SceneEntry<R>>,
    order: Vec<SceneId>,
    order_dirty: bool,
    next_seq: u64,
}

impl<R> Default for SceneRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> SceneRegistry<R> {
    pub fn new() -> Self {
        Self {
            entries: AHashMap::new(),
            order: Vec::new(),
            order_dirty: false,
            next_seq: 0,
        }
    }

    /// Insert or replace an object. Last writer wins on id reuse.
    pub fn add_object(&mut self, id: impl Into<SceneId>, renderable: R, z_index: f32) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            id.into(),
            SceneEntry {
                renderable,
                z_index,
                seq,
            },
        );
        self.order_dirty = true;
    }

    /// Remove an object, returning its payload if it was present.
    pub fn remove_object(&mut self, id: &SceneId) -> Option<R> {
        let removed = self.entries.remove(id);
        if removed.is_some() {
            self.order_dirty = true;
        }
        removed.map(|e| e.renderable)
    }

    pub fn get(&self, id: &SceneId) -> Option<&R> {
        self.entries.get(id).map(|e| &e.renderable)
    }

    pub fn contains(&self, id: &SceneId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in draw order: ascending z-index, registration order within
    /// a z plane.
    pub fn ordered(&mut self) -> impl Iterator<Item = (&SceneId, &R)> {
        if self.order_dirty {
            let mut ids: Vec<(&SceneId, f32, u64)> = self
                .entries
                .iter()
                .map(|(id, e)| (id, e.z_index, e.seq))
                .collect();
            ids.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.2.cmp(&b.2)));
            self.order = ids.into_iter().map(|(id, _, _)| id.clone()).collect();
            self.order_dirty = false;
        }
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id).map(|e| (id, &e.renderable)))
    }
}
