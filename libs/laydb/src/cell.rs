//! Cells and their lazily computed per-layer caches.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arcstr::ArcStr;
use bitflags::bitflags;
use geometry::prelude::*;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::instance::Instance;
use crate::layer::Layer;
use crate::shapes::Shapes;
use crate::spatial::{SpatialIndex, SpatialIndexOption};
use crate::CellId;

bitflags! {
    /// Cached values that may be stale.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct DirtyFlags: u8 {
        /// The sorted list of layers used by the cell or its descendants.
        const LAYERS = 1 << 0;
        /// Per-layer bounding boxes.
        const BBOX = 1 << 1;
        /// Per-layer spatial indices.
        const SPATIAL_INDEX = 1 << 2;
    }
}

bitflags! {
    /// Caches to rebuild eagerly in [`Layout::update`](crate::Layout::update).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct UpdateFlags: u8 {
        /// Refresh layer lists.
        const LAYERS = 1 << 0;
        /// Compute bounding boxes.
        const BBOX = 1 << 1;
        /// Build spatial indices.
        const SPATIAL_INDEX = 1 << 2;
        /// Choose the top cell of the layout.
        const TOP_CELL = 1 << 3;
    }
}

impl UpdateFlags {
    pub(crate) fn dirty(&self) -> DirtyFlags {
        DirtyFlags::from_bits_truncate(self.bits())
    }
}

/// Options for [`Layout::update_cell`](crate::Layout::update_cell).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CellUpdateOption {
    /// Layers to update. Empty means every layer used by the cell or its descendants.
    pub layers: Vec<Layer>,
    /// How spatial indices are built.
    pub spatial_index: SpatialIndexOption,
    /// Only reserve cache entries without computing anything.
    pub empty_spatial_index: bool,
}

/// Cached state for one layer of a cell.
///
/// A dirty spatial index is always dropped, and computing the bbox clears
/// [`DirtyFlags::SPATIAL_INDEX`] when no index is held. An entry with a dirty
/// index therefore also has a dirty bbox.
#[derive(Debug, Clone)]
pub(crate) struct LayerCache {
    pub(crate) bbox: Rect,
    pub(crate) spatial_index: Option<Arc<SpatialIndex>>,
    /// Only [`DirtyFlags::BBOX`] and [`DirtyFlags::SPATIAL_INDEX`] are used.
    pub(crate) dirty: DirtyFlags,
}

impl Default for LayerCache {
    fn default() -> Self {
        Self {
            bbox: Rect::EMPTY,
            spatial_index: None,
            dirty: DirtyFlags::BBOX | DirtyFlags::SPATIAL_INDEX,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct CellCache {
    /// Sorted layers used by the cell or any of its descendants.
    pub(crate) layers: Vec<Layer>,
    pub(crate) layers_dirty: bool,
    pub(crate) entries: BTreeMap<Layer, LayerCache>,
    pub(crate) max_level: Option<u32>,
}

impl Default for CellCache {
    fn default() -> Self {
        Self {
            layers: Vec::new(),
            layers_dirty: true,
            entries: BTreeMap::new(),
            max_level: None,
        }
    }
}

impl CellCache {
    /// Stores a freshly computed layer list, dropping entries of layers that are gone.
    pub(crate) fn set_layers(&mut self, layers: Vec<Layer>) {
        let mut stale = Vec::new();
        let mut new = layers.iter().peekable();
        for layer in self.entries.keys() {
            while new.next_if(|l| *l < layer).is_some() {}
            if new.peek() != Some(&layer) {
                stale.push(*layer);
            }
        }
        for layer in stale {
            self.entries.remove(&layer);
        }
        self.layers = layers;
        self.layers_dirty = false;
    }

    /// Marks `flags` dirty, returning `true` if any bit was newly set.
    ///
    /// With `layer` given, a missing entry for that layer is created dirty.
    pub(crate) fn mark(&mut self, flags: DirtyFlags, layer: Option<Layer>) -> bool {
        let mut changed = false;
        if flags.contains(DirtyFlags::LAYERS) && !self.layers_dirty {
            self.layers_dirty = true;
            changed = true;
        }
        let area = flags & (DirtyFlags::BBOX | DirtyFlags::SPATIAL_INDEX);
        if area.is_empty() {
            return changed;
        }
        let mark_entry = |entry: &mut LayerCache| {
            let fresh = !entry.dirty.contains(area);
            entry.dirty |= area;
            if area.contains(DirtyFlags::SPATIAL_INDEX) {
                entry.spatial_index = None;
            }
            fresh
        };
        match layer {
            Some(layer) => match self.entries.get_mut(&layer) {
                Some(entry) => mark_entry(entry) || changed,
                None => {
                    self.entries.insert(layer, LayerCache::default());
                    true
                }
            },
            None => self
                .entries
                .values_mut()
                .fold(changed, |acc, entry| mark_entry(entry) || acc),
        }
    }
}

/// A named container of shapes and instances of other cells.
#[derive(Debug, Default)]
pub struct Cell {
    pub(crate) name: ArcStr,
    pub(crate) shapes: BTreeMap<Layer, Shapes>,
    pub(crate) instances: Vec<Instance>,
    pub(crate) parents: IndexSet<CellId>,
    pub(crate) cache: Mutex<CellCache>,
}

impl Clone for Cell {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            shapes: self.shapes.clone(),
            instances: self.instances.clone(),
            parents: self.parents.clone(),
            cache: Mutex::new(self.cache().clone()),
        }
    }
}

impl Cell {
    pub(crate) fn new(name: ArcStr) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    /// The name of the cell.
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// The layers this cell itself has shapes on, in order.
    pub fn layers(&self) -> impl Iterator<Item = Layer> + '_ {
        self.shapes.keys().copied()
    }

    /// Returns `true` if the cell itself has shapes on `layer`.
    pub fn has_layer(&self, layer: Layer) -> bool {
        self.shapes.contains_key(&layer)
    }

    /// The shapes of this cell on `layer`.
    pub fn shapes(&self, layer: Layer) -> Option<&Shapes> {
        self.shapes.get(&layer)
    }

    /// Iterates over every layer and its shapes.
    pub fn shapes_iter(&self) -> impl Iterator<Item = (Layer, &Shapes)> {
        self.shapes.iter().map(|(l, s)| (*l, s))
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn instance(&self, index: usize) -> Option<&Instance> {
        self.instances.get(index)
    }

    /// Cells that hold at least one instance of this cell.
    pub fn parents(&self) -> impl Iterator<Item = CellId> + '_ {
        self.parents.iter().copied()
    }

    /// Returns `true` if `parent` holds an instance of this cell.
    pub fn has_parent(&self, parent: CellId) -> bool {
        self.parents.contains(&parent)
    }

    /// The number of distinct cells this cell instantiates.
    pub fn child_count(&self) -> usize {
        self.children().len()
    }

    /// The distinct cells this cell instantiates.
    pub fn children(&self) -> HashSet<CellId> {
        self.instances.iter().map(Instance::cell).collect()
    }

    /// Returns `true` if the cell has neither shapes nor instances.
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty() && self.instances.is_empty()
    }

    /// The number of polygons stored in this cell on `layer`, ignoring instances.
    pub fn polygon_count(&self, layer: Layer) -> usize {
        self.shapes.get(&layer).map_or(0, Shapes::polygon_count)
    }

    pub(crate) fn cache(&self) -> MutexGuard<'_, CellCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn cache_mut(&mut self) -> &mut CellCache {
        self.cache.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn has_instance_of(&self, child: CellId) -> bool {
        self.instances.iter().any(|inst| inst.cell() == child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(id: u32) -> Layer {
        Layer::new(id, 0)
    }

    #[test]
    fn set_layers_evicts_vanished_entries() {
        let mut cache = CellCache::default();
        for id in [1, 2, 3, 5, 8] {
            cache.entries.insert(layer(id), LayerCache::default());
        }
        cache.set_layers(vec![layer(2), layer(4), layer(5), layer(9)]);
        let kept: Vec<_> = cache.entries.keys().map(|l| l.id).collect();
        assert_eq!(kept, vec![2, 5]);
        assert!(!cache.layers_dirty);
    }

    #[test]
    fn mark_reports_changes_only_once() {
        let mut cache = CellCache::default();
        cache.set_layers(vec![layer(1)]);
        cache.entries.insert(
            layer(1),
            LayerCache {
                dirty: DirtyFlags::empty(),
                ..Default::default()
            },
        );

        assert!(cache.mark(DirtyFlags::BBOX, Some(layer(1))));
        assert!(!cache.mark(DirtyFlags::BBOX, Some(layer(1))));
        assert!(cache.mark(DirtyFlags::SPATIAL_INDEX, None));
        assert!(cache.mark(DirtyFlags::LAYERS, None));
        assert!(!cache.mark(DirtyFlags::all(), None));
        // A missing entry is created dirty.
        assert!(cache.mark(DirtyFlags::BBOX, Some(layer(7))));
        assert!(cache.entries[&layer(7)].dirty.contains(DirtyFlags::BBOX));
    }

    #[test]
    fn update_flags_map_to_dirty_flags() {
        let flags = UpdateFlags::BBOX | UpdateFlags::TOP_CELL;
        assert_eq!(flags.dirty(), DirtyFlags::BBOX);
        assert_eq!(UpdateFlags::all().dirty(), DirtyFlags::all());
    }
}
