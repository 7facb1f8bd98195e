//! The cell pool.

mod cache;
mod edit;
mod transform;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use arcstr::ArcStr;
use geometry::prelude::*;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::cell::{Cell, DirtyFlags};
use crate::error::{Error, Result};
use crate::layer::Layer;
use crate::CellId;

/// The default size of a database unit, in microns.
pub const DEFAULT_DBU: f64 = 0.001;

/// Options for [`Layout::update`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutUpdateOption {
    /// The number of worker threads. Zero lets the thread pool decide.
    pub threads: usize,
    /// The window step of the spatial indices to build.
    pub window_step: u32,
}

impl Default for LayoutUpdateOption {
    fn default() -> Self {
        Self {
            threads: 16,
            window_step: 500_000,
        }
    }
}

/// What [`Layout::delete_cell`] removes besides the cell itself.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeleteMode {
    /// Only the cell. Its children lose it as a parent.
    #[default]
    Shallow,
    /// The cell and every descendant left without any parent.
    Deep,
}

/// A pool of cells forming a hierarchy of instances.
///
/// All mutation goes through `&mut Layout`. Reads take `&Layout` and may
/// fill caches, so a layout can be queried from many threads at once.
#[derive(Debug, Clone)]
pub struct Layout {
    cells: SlotMap<CellId, Cell>,
    names: HashMap<ArcStr, CellId>,
    top: Option<CellId>,
    layer_names: BTreeMap<Layer, ArcStr>,
    dbu: f64,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            cells: SlotMap::with_key(),
            names: HashMap::new(),
            top: None,
            layer_names: BTreeMap::new(),
            dbu: DEFAULT_DBU,
        }
    }
}

impl Layout {
    pub fn new() -> Self {
        Self::default()
    }

    /// The size of a database unit, in microns.
    pub fn dbu(&self) -> f64 {
        self.dbu
    }

    /// Sets the size of a database unit. Must be positive.
    pub fn set_dbu(&mut self, dbu: f64) -> Result<()> {
        if dbu.is_nan() || dbu <= 0. {
            tracing::warn!(dbu, "rejected database unit");
            return Err(Error::InvalidOption(format!(
                "database unit must be positive, got {dbu}"
            )));
        }
        self.dbu = dbu;
        Ok(())
    }

    /// Creates an empty cell named `name`.
    pub fn create_cell(&mut self, name: impl Into<ArcStr>) -> Result<CellId> {
        let name = name.into();
        if self.names.contains_key(&name) {
            tracing::warn!(%name, "cell name already taken");
            return Err(Error::CellNameTaken(name));
        }
        let id = self.cells.insert(Cell::new(name.clone()));
        self.names.insert(name, id);
        Ok(id)
    }

    /// Returns the cell named `name`, creating it if needed.
    pub fn get_or_create_cell(&mut self, name: impl Into<ArcStr>) -> CellId {
        let name = name.into();
        if let Some(&id) = self.names.get(&name) {
            return id;
        }
        let id = self.cells.insert(Cell::new(name.clone()));
        self.names.insert(name, id);
        id
    }

    /// The ID of the cell named `name`.
    pub fn cell_id(&self, name: &str) -> Option<CellId> {
        self.names.get(name).copied()
    }

    /// The ID of the cell named `name`.
    ///
    /// # Panics
    ///
    /// Panics if there is no cell named `name`.
    pub fn cell_id_named(&self, name: &str) -> CellId {
        match self.try_cell_id_named(name) {
            Ok(id) => id,
            Err(err) => {
                tracing::error!("{err}");
                panic!("{err}");
            }
        }
    }

    /// The ID of the cell named `name`, or [`Error::CellNotFound`].
    pub fn try_cell_id_named(&self, name: &str) -> Result<CellId> {
        self.cell_id(name)
            .ok_or_else(|| Error::CellNotFound(name.into()))
    }

    /// The cell with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a cell of this layout.
    pub fn cell(&self, id: CellId) -> &Cell {
        match self.cells.get(id) {
            Some(cell) => cell,
            None => {
                tracing::error!(?id, "no such cell");
                panic!("no cell with ID {id:?}");
            }
        }
    }

    pub fn try_cell(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(id)
    }

    pub(crate) fn cell_mut(&mut self, id: CellId) -> Result<&mut Cell> {
        self.cells.get_mut(id).ok_or_else(|| {
            tracing::warn!(?id, "no such cell");
            Error::UnknownCell(id)
        })
    }

    /// Returns `true` if `id` is a cell of this layout.
    pub fn contains(&self, id: CellId) -> bool {
        self.cells.contains_key(id)
    }

    /// Iterates over all cells.
    pub fn cells(&self) -> impl Iterator<Item = (CellId, &Cell)> {
        self.cells.iter()
    }

    /// The number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Renames a cell.
    pub fn rename_cell(&mut self, id: CellId, name: impl Into<ArcStr>) -> Result<()> {
        let name = name.into();
        match self.names.get(&name) {
            Some(&other) if other == id => return Ok(()),
            Some(_) => {
                tracing::warn!(%name, "cell name already taken");
                return Err(Error::CellNameTaken(name));
            }
            None => {}
        }
        let cell = self.cell_mut(id)?;
        let old = std::mem::replace(&mut cell.name, name.clone());
        self.names.remove(&old);
        self.names.insert(name, id);
        Ok(())
    }

    /// Deletes a cell, removing every instance of it and its links to its children.
    ///
    /// With [`DeleteMode::Deep`], descendants that end up without any parent
    /// are deleted as well.
    pub fn delete_cell(&mut self, id: CellId, mode: DeleteMode) -> Result<()> {
        if !self.contains(id) {
            tracing::warn!(?id, "no such cell");
            return Err(Error::UnknownCell(id));
        }
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            if !self.contains(id) {
                continue;
            }
            let layers = self.layers_including_children(id);
            let Some(cell) = self.cells.remove(id) else {
                continue;
            };
            tracing::debug!(name = %cell.name, ?mode, "deleting cell");
            self.names.remove(&cell.name);
            if self.top == Some(id) {
                self.top = None;
            }
            for parent in cell.parents.iter().copied() {
                if let Some(p) = self.cells.get_mut(parent) {
                    p.instances.retain(|inst| inst.cell() != id);
                }
                self.invalidate_layers(parent, layers.iter().copied());
                self.invalidate_max_level(parent);
            }
            for child in cell.children() {
                if let Some(c) = self.cells.get_mut(child) {
                    c.parents.shift_remove(&id);
                    if mode == DeleteMode::Deep && c.parents.is_empty() {
                        pending.push(child);
                    }
                }
            }
        }
        Ok(())
    }

    /// The designated top cell, if any.
    pub fn top_cell(&self) -> Option<CellId> {
        self.top
    }

    /// Designates `id` as the top cell.
    pub fn set_top_cell(&mut self, id: CellId) -> Result<()> {
        if !self.contains(id) {
            tracing::warn!(?id, "no such cell");
            return Err(Error::UnknownCell(id));
        }
        self.top = Some(id);
        Ok(())
    }

    /// Cells that are not instantiated anywhere.
    pub fn root_cells(&self) -> impl Iterator<Item = CellId> + '_ {
        self.cells
            .iter()
            .filter(|(_, cell)| cell.parents.is_empty())
            .map(|(id, _)| id)
    }

    /// The top cell, or every root cell when there is none.
    fn tops(&self) -> Vec<CellId> {
        match self.top {
            Some(top) => vec![top],
            None => self.root_cells().collect(),
        }
    }

    /// Every layer that some cell has shapes on, in order.
    pub fn layers(&self) -> BTreeSet<Layer> {
        self.cells
            .values()
            .flat_map(|cell| cell.shapes.keys().copied())
            .collect()
    }

    /// Returns `true` if some cell has shapes on `layer`.
    pub fn has_layer(&self, layer: Layer) -> bool {
        self.cells
            .values()
            .any(|cell| cell.shapes.contains_key(&layer))
    }

    /// Removes `layer` from every cell.
    pub fn remove_layer(&mut self, layer: Layer) {
        let ids: Vec<_> = self
            .cells
            .iter()
            .filter(|(_, cell)| cell.has_layer(layer))
            .map(|(id, _)| id)
            .collect();
        for id in ids {
            if let Some(cell) = self.cells.get_mut(id) {
                cell.shapes.remove(&layer);
            }
            self.set_dirty(id, DirtyFlags::all(), Some(layer));
        }
        self.layer_names.remove(&layer);
    }

    /// Moves the shapes on `from` to `to` in every cell.
    pub fn move_layer_everywhere(&mut self, from: Layer, to: Layer) {
        if from == to {
            return;
        }
        let ids: Vec<_> = self
            .cells
            .iter()
            .filter(|(_, cell)| cell.has_layer(from))
            .map(|(id, _)| id)
            .collect();
        for id in ids {
            // The cell was just checked to exist and to have the layer.
            let _ = self.move_layer(id, from, to);
        }
        if let Some(name) = self.layer_names.remove(&from) {
            self.layer_names.entry(to).or_insert(name);
        }
    }

    /// Gives `layer` a human-readable name.
    pub fn set_layer_name(&mut self, layer: Layer, name: impl Into<ArcStr>) {
        self.layer_names.insert(layer, name.into());
    }

    /// The name of `layer`, if it has one.
    pub fn layer_name(&self, layer: Layer) -> Option<&ArcStr> {
        self.layer_names.get(&layer)
    }

    /// The bounding box of the top cell (or of all root cells) on the given layers.
    ///
    /// An empty slice of layers means every layer.
    pub fn bbox(&self, layers: &[Layer]) -> Rect {
        self.tops()
            .into_iter()
            .map(|id| {
                if layers.is_empty() {
                    self.bbox_all(id)
                } else {
                    layers
                        .iter()
                        .fold(Rect::EMPTY, |acc, &l| acc.union(self.cell_bbox(id, l)))
                }
            })
            .fold(Rect::EMPTY, Rect::union)
    }

    /// The number of polygons on `layer` in the top cell (or in all root cells),
    /// with every instance expanded.
    pub fn polygon_count(&self, layer: Layer) -> usize {
        self.tops()
            .into_iter()
            .map(|id| self.cell_polygon_count(id, layer))
            .sum()
    }
}
