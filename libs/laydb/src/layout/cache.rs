//! Lazily computed per-cell caches: layer lists, bounding boxes, depths and spatial indices.

use std::collections::HashSet;
use std::sync::Arc;

use geometry::prelude::*;
use rayon::prelude::*;

use crate::cell::{CellUpdateOption, DirtyFlags, UpdateFlags};
use crate::error::{Error, Result};
use crate::layer::Layer;
use crate::spatial::{SpatialIndex, SpatialIndexOption};
use crate::CellId;

use super::{Layout, LayoutUpdateOption};

impl Layout {
    /// The sorted layers used by `id` or any of its descendants.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a cell of this layout.
    pub fn layers_including_children(&self, id: CellId) -> Vec<Layer> {
        self.refresh_layers(id);
        self.cell(id).cache().layers.clone()
    }

    /// Returns `true` if `id` or one of its descendants has shapes on `layer`.
    pub fn has_layer_including_children(&self, id: CellId, layer: Layer) -> bool {
        self.refresh_layers(id);
        self.cell(id).cache().layers.binary_search(&layer).is_ok()
    }

    fn refresh_layers(&self, id: CellId) {
        let cell = self.cell(id);
        if !cell.cache().layers_dirty {
            return;
        }
        let mut layers: Vec<Layer> = cell.layers().collect();
        for child in cell.children() {
            self.refresh_layers(child);
            layers.extend_from_slice(&self.cell(child).cache().layers);
        }
        layers.sort_unstable();
        layers.dedup();
        tracing::trace!(cell = %cell.name, count = layers.len(), "recomputed layers");
        cell.cache().set_layers(layers);
    }

    /// The bounding box of `id` on `layer`, including its instances.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a cell of this layout.
    pub fn cell_bbox(&self, id: CellId, layer: Layer) -> Rect {
        if !self.has_layer_including_children(id, layer) {
            return Rect::EMPTY;
        }
        let cell = self.cell(id);
        if let Some(entry) = cell.cache().entries.get(&layer) {
            if !entry.dirty.contains(DirtyFlags::BBOX) {
                return entry.bbox;
            }
        }
        let own = cell.shapes(layer).map(|s| s.bbox()).unwrap_or_default();
        let bbox = cell.instances().iter().fold(own, |acc, inst| {
            acc.union(inst.placement().bbox(self.cell_bbox(inst.cell(), layer)))
        });
        let mut cache = cell.cache();
        let entry = cache.entries.entry(layer).or_default();
        entry.bbox = bbox;
        entry.dirty.remove(DirtyFlags::BBOX);
        if entry.spatial_index.is_none() {
            // Nothing built, so nothing stale.
            entry.dirty.remove(DirtyFlags::SPATIAL_INDEX);
        }
        bbox
    }

    /// The bounding box of `id` over every layer.
    pub fn bbox_all(&self, id: CellId) -> Rect {
        self.layers_including_children(id)
            .into_iter()
            .fold(Rect::EMPTY, |acc, layer| acc.union(self.cell_bbox(id, layer)))
    }

    /// The depth of the instance hierarchy below `id`: 0 for a cell without instances.
    pub fn max_level(&self, id: CellId) -> u32 {
        let cell = self.cell(id);
        if let Some(level) = cell.cache().max_level {
            return level;
        }
        let level = cell
            .children()
            .into_iter()
            .map(|child| self.max_level(child) + 1)
            .max()
            .unwrap_or(0);
        cell.cache().max_level = Some(level);
        level
    }

    /// The number of polygons of `id` on `layer`, with every instance expanded.
    pub fn cell_polygon_count(&self, id: CellId, layer: Layer) -> usize {
        let cell = self.cell(id);
        cell.polygon_count(layer)
            + cell
                .instances()
                .iter()
                .map(|inst| inst.placement().len() * self.cell_polygon_count(inst.cell(), layer))
                .sum::<usize>()
    }

    /// The number of distinct cells `id` instantiates.
    pub fn child_count(&self, id: CellId) -> usize {
        self.cell(id).child_count()
    }

    /// Every cell below `id`, each listed once, in depth-first pre-order.
    pub fn descendants(&self, id: CellId) -> Vec<CellId> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut stack: Vec<CellId> = self.cell(id).instances().iter().rev().map(|i| i.cell()).collect();
        while let Some(next) = stack.pop() {
            if !seen.insert(next) {
                continue;
            }
            out.push(next);
            stack.extend(self.cell(next).instances().iter().rev().map(|i| i.cell()));
        }
        out
    }

    /// Returns `true` if `id` has an up-to-date spatial index on `layer`.
    pub fn has_spatial_index(&self, id: CellId, layer: Layer) -> bool {
        self.spatial_index(id, layer).is_some()
    }

    /// The up-to-date spatial index of `id` on `layer`, if one was built.
    pub fn spatial_index(&self, id: CellId, layer: Layer) -> Option<Arc<SpatialIndex>> {
        let cache = self.try_cell(id)?.cache();
        let entry = cache.entries.get(&layer)?;
        if entry.dirty.contains(DirtyFlags::SPATIAL_INDEX) {
            return None;
        }
        entry.spatial_index.clone()
    }

    /// Eagerly computes the caches of `id` selected by `flags`.
    pub fn update_cell(
        &self,
        id: CellId,
        flags: UpdateFlags,
        option: &CellUpdateOption,
    ) -> Result<()> {
        let cell = self.try_cell(id).ok_or(Error::UnknownCell(id))?;
        let layers = self.layers_including_children(id);
        let targets: Vec<Layer> = if option.layers.is_empty() {
            layers
        } else {
            option
                .layers
                .iter()
                .copied()
                .filter(|l| layers.binary_search(l).is_ok())
                .collect()
        };
        if option.empty_spatial_index {
            let mut cache = cell.cache();
            for layer in targets {
                cache.entries.entry(layer).or_default();
            }
            return Ok(());
        }
        let dirty = flags.dirty();
        for layer in targets {
            if dirty.intersects(DirtyFlags::BBOX | DirtyFlags::SPATIAL_INDEX) {
                self.cell_bbox(id, layer);
            }
            if dirty.contains(DirtyFlags::SPATIAL_INDEX) {
                self.build_spatial_index(id, layer, &option.spatial_index);
            }
        }
        Ok(())
    }

    fn build_spatial_index(&self, id: CellId, layer: Layer, option: &SpatialIndexOption) {
        let cell = self.cell(id);
        if let Some(entry) = cell.cache().entries.get(&layer) {
            let fine_enough = entry
                .spatial_index
                .as_ref()
                .is_some_and(|index| index.window_step() <= option.window_step);
            if !entry.dirty.contains(DirtyFlags::SPATIAL_INDEX) && fine_enough {
                return;
            }
        }
        let shapes = cell.shapes(layer);
        let instances: Vec<(u32, Rect)> = cell
            .instances()
            .iter()
            .enumerate()
            .map(|(i, inst)| {
                let child = self.cell_bbox(inst.cell(), layer);
                (i as u32, inst.placement().bbox(child))
            })
            .collect();
        let mut option = option.clone();
        if option.window_step != 0 && option.region.is_empty() {
            option.region = self.cell_bbox(id, layer);
        }
        let index = if SpatialIndex::grid_size(shapes, instances.iter().copied(), &option) > 1 {
            let index = SpatialIndex::build(shapes, instances, &option);
            tracing::debug!(
                cell = %cell.name,
                %layer,
                rows = index.rows(),
                cols = index.cols(),
                elements = index.len(),
                "built spatial index"
            );
            Some(Arc::new(index))
        } else {
            None
        };
        let mut cache = cell.cache();
        let entry = cache.entries.entry(layer).or_default();
        entry.spatial_index = index;
        entry.dirty.remove(DirtyFlags::SPATIAL_INDEX);
    }

    /// Eagerly computes caches for every cell, in parallel.
    ///
    /// [`UpdateFlags::TOP_CELL`] designates the root cell with the deepest
    /// hierarchy as the top cell.
    pub fn update(&mut self, flags: UpdateFlags, option: &LayoutUpdateOption) -> Result<()> {
        if flags.contains(UpdateFlags::TOP_CELL) {
            let top = self
                .root_cells()
                .map(|id| (self.max_level(id), id))
                .max_by_key(|(level, _)| *level)
                .map(|(_, id)| id);
            if let Some(top) = top {
                tracing::debug!(cell = %self.cell(top).name, "selected top cell");
                self.top = Some(top);
            }
        }
        if flags.dirty().is_empty() {
            return Ok(());
        }
        let ids: Vec<CellId> = self.cells.keys().collect();
        let reserve = CellUpdateOption {
            empty_spatial_index: true,
            ..Default::default()
        };
        for &id in &ids {
            self.update_cell(id, flags, &reserve)?;
        }
        let cell_option = CellUpdateOption {
            spatial_index: SpatialIndexOption {
                window_step: option.window_step,
                ..Default::default()
            },
            ..Default::default()
        };
        tracing::debug!(cells = ids.len(), threads = option.threads, ?flags, "updating layout");
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(option.threads)
            .build()?;
        let layout = &*self;
        pool.install(|| {
            ids.par_iter()
                .try_for_each(|&id| layout.update_cell(id, flags, &cell_option))
        })?;
        tracing::debug!("layout update finished");
        Ok(())
    }
}
