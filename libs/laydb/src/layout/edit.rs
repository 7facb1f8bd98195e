//! Mutation of cell contents and dirty-flag propagation.

use std::collections::{BTreeSet, HashSet, VecDeque};

use crate::cell::DirtyFlags;
use crate::element::{Element, ShapeRef};
use crate::error::{Error, Result};
use crate::instance::Instance;
use crate::layer::Layer;
use crate::shapes::{Shape, ShapeKind, Shapes};
use crate::CellId;

use super::Layout;

const AREA_FLAGS: DirtyFlags = DirtyFlags::BBOX.union(DirtyFlags::SPATIAL_INDEX);

impl Layout {
    /// Marks `flags` dirty on `id` and on every ancestor whose flags changed.
    ///
    /// With a layer, only that layer's caches are marked (created if missing);
    /// without, every existing layer cache is.
    pub(crate) fn set_dirty(&mut self, id: CellId, flags: DirtyFlags, layer: Option<Layer>) {
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            let Some(cell) = self.cells.get_mut(id) else {
                continue;
            };
            if cell.cache_mut().mark(flags, layer) {
                tracing::trace!(cell = %cell.name, ?flags, ?layer, "marked dirty");
                pending.extend(cell.parents.iter().copied());
            }
        }
    }

    /// Marks the layer list and the caches of each of `layers` dirty.
    pub(crate) fn invalidate_layers(&mut self, id: CellId, layers: impl IntoIterator<Item = Layer>) {
        self.set_dirty(id, DirtyFlags::LAYERS, None);
        for layer in layers {
            self.set_dirty(id, AREA_FLAGS, Some(layer));
        }
    }

    /// Forgets the cached hierarchy depth of `id` and of its ancestors.
    pub(crate) fn invalidate_max_level(&mut self, id: CellId) {
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            let Some(cell) = self.cells.get_mut(id) else {
                continue;
            };
            if cell.cache_mut().max_level.take().is_some() {
                pending.extend(cell.parents.iter().copied());
            }
        }
    }

    /// Returns `true` if `ancestor` is `id` or instantiates `id`, directly or not.
    pub fn is_ancestor_or_self(&self, ancestor: CellId, id: CellId) -> bool {
        let mut seen = HashSet::from([id]);
        let mut queue = VecDeque::from([id]);
        while let Some(id) = queue.pop_front() {
            if id == ancestor {
                return true;
            }
            let Some(cell) = self.try_cell(id) else {
                continue;
            };
            for parent in cell.parents() {
                if seen.insert(parent) {
                    queue.push_back(parent);
                }
            }
        }
        false
    }

    fn shapes_mut(&mut self, id: CellId, layer: Layer) -> Result<&mut Shapes> {
        self.cell_mut(id)?.shapes.get_mut(&layer).ok_or_else(|| {
            tracing::warn!(%layer, "no shapes on layer");
            Error::UnknownLayer(layer)
        })
    }

    /// Adds a shape to a cell.
    pub fn insert_shape(
        &mut self,
        id: CellId,
        layer: Layer,
        shape: impl Into<Shape>,
    ) -> Result<Element> {
        let shape = shape.into();
        let kind = shape.kind();
        let index = self
            .cell_mut(id)?
            .shapes
            .entry(layer)
            .or_default()
            .insert(shape);
        self.set_dirty(id, DirtyFlags::all(), Some(layer));
        Ok(Element::shape(
            kind,
            ShapeRef {
                cell: id,
                layer,
                index,
            },
        ))
    }

    /// Adds many shapes to a cell at once.
    pub fn insert_shapes<S: Into<Shape>>(
        &mut self,
        id: CellId,
        layer: Layer,
        shapes: impl IntoIterator<Item = S>,
    ) -> Result<()> {
        let store = self.cell_mut(id)?.shapes.entry(layer).or_default();
        for shape in shapes {
            store.insert(shape);
        }
        if store.is_empty() {
            self.cell_mut(id)?.shapes.remove(&layer);
            return Ok(());
        }
        self.set_dirty(id, DirtyFlags::all(), Some(layer));
        Ok(())
    }

    /// Replaces the shape at `index` among shapes of the new shape's kind, returning the old shape.
    pub fn replace_shape(
        &mut self,
        id: CellId,
        layer: Layer,
        index: u32,
        shape: impl Into<Shape>,
    ) -> Result<Shape> {
        let shape = shape.into();
        let kind = shape.kind();
        let old = self.shapes_mut(id, layer)?.replace(index, shape)?;
        if kind.has_area() {
            self.set_dirty(id, AREA_FLAGS, Some(layer));
        }
        Ok(old)
    }

    /// Deletes the shapes of `kind` at `indices` on `layer`.
    ///
    /// Either every index is valid and all are deleted, or nothing changes.
    /// Deletion swap-removes, so the remaining shapes of `kind` may be renumbered.
    pub fn delete_shapes(
        &mut self,
        id: CellId,
        layer: Layer,
        kind: ShapeKind,
        indices: &[u32],
    ) -> Result<()> {
        let shapes = self.shapes_mut(id, layer)?;
        shapes.delete(kind, indices)?;
        if shapes.is_empty() {
            self.cell_mut(id)?.shapes.remove(&layer);
            let flags = if kind.has_area() {
                DirtyFlags::all()
            } else {
                DirtyFlags::LAYERS
            };
            self.set_dirty(id, flags, Some(layer));
        } else if kind.has_area() {
            self.set_dirty(id, AREA_FLAGS, Some(layer));
        }
        Ok(())
    }

    /// Deletes the shape or instance `element` refers to.
    pub fn delete_element(&mut self, element: Element) -> Result<()> {
        match (element.shape_ref(), element.shape_kind(), element.instance_ref()) {
            (Some(s), Some(kind), _) => self.delete_shapes(s.cell, s.layer, kind, &[s.index]),
            (_, _, Some(i)) => self.delete_instances(i.cell, &[i.index]),
            _ => Err(Error::ForeignShape),
        }
    }

    /// Adds an instance of another cell to `id`.
    ///
    /// Fails if the child is `id` itself or one of its ancestors.
    pub fn insert_instance(&mut self, id: CellId, instance: Instance) -> Result<Element> {
        let child = instance.cell();
        if !self.contains(id) {
            tracing::warn!(?id, "no such cell");
            return Err(Error::UnknownCell(id));
        }
        if !self.contains(child) {
            tracing::warn!(?child, "no such cell");
            return Err(Error::UnknownCell(child));
        }
        if self.is_ancestor_or_self(child, id) {
            tracing::warn!(parent = ?id, ?child, "rejected cyclic instance");
            return Err(Error::InstanceCycle { parent: id, child });
        }
        let layers = self.layers_including_children(child);
        let cell = self.cell_mut(id)?;
        cell.instances.push(instance);
        let index = (cell.instances.len() - 1) as u32;
        self.cell_mut(child)?.parents.insert(id);
        self.invalidate_layers(id, layers);
        self.invalidate_max_level(id);
        Ok(Element::instance(id, index))
    }

    /// Deletes the instances at `indices`, keeping the order of the others.
    ///
    /// Either every index is valid and all are deleted, or nothing changes.
    pub fn delete_instances(&mut self, id: CellId, indices: &[u32]) -> Result<()> {
        let count = self.cell_mut(id)?.instances.len();
        if indices.iter().any(|&i| i as usize >= count) {
            tracing::warn!(?id, "instance index out of range");
            return Err(Error::ForeignInstance);
        }
        let doomed: BTreeSet<usize> = indices.iter().map(|&i| i as usize).collect();
        let cell = self.cell_mut(id)?;
        let mut position = 0;
        let mut removed = HashSet::new();
        cell.instances.retain(|inst| {
            let keep = !doomed.contains(&position);
            if !keep {
                removed.insert(inst.cell());
            }
            position += 1;
            keep
        });
        self.detach_children(id, removed);
        Ok(())
    }

    /// Deletes every instance of `child` in `id`, returning how many were removed.
    pub fn delete_instances_of(&mut self, id: CellId, child: CellId) -> Result<usize> {
        let cell = self.cell_mut(id)?;
        let before = cell.instances.len();
        cell.instances.retain(|inst| inst.cell() != child);
        let removed = before - cell.instances.len();
        if removed > 0 {
            self.detach_children(id, [child]);
        }
        Ok(removed)
    }

    /// Deletes every instance in `id`.
    pub fn clear_instances(&mut self, id: CellId) -> Result<()> {
        let cell = self.cell_mut(id)?;
        let removed = cell.children();
        cell.instances.clear();
        self.detach_children(id, removed);
        Ok(())
    }

    /// Updates parent links and caches after instances of `children` were removed from `id`.
    fn detach_children(&mut self, id: CellId, children: impl IntoIterator<Item = CellId>) {
        let mut layers = BTreeSet::new();
        for child in children {
            layers.extend(self.layers_including_children(child));
            let still_used = self.try_cell(id).is_some_and(|c| c.has_instance_of(child));
            if !still_used {
                if let Some(c) = self.cells.get_mut(child) {
                    c.parents.shift_remove(&id);
                }
            }
        }
        self.invalidate_layers(id, layers);
        self.invalidate_max_level(id);
    }

    /// Removes all shapes and instances from a cell.
    pub fn clear_cell(&mut self, id: CellId) -> Result<()> {
        self.clear_instances(id)?;
        let shapes = std::mem::take(&mut self.cell_mut(id)?.shapes);
        self.invalidate_layers(id, shapes.into_keys());
        Ok(())
    }

    /// Copies the shapes of `id` on `from` to `to`.
    pub fn copy_layer(&mut self, id: CellId, from: Layer, to: Layer) -> Result<()> {
        let shapes = self.shapes_mut(id, from)?.clone();
        if from != to {
            self.cell_mut(id)?.shapes.entry(to).or_default().merge(shapes);
        } else {
            self.shapes_mut(id, to)?.merge(shapes);
        }
        self.set_dirty(id, DirtyFlags::all(), Some(to));
        Ok(())
    }

    /// Moves the shapes of `id` on `from` to `to`.
    pub fn move_layer(&mut self, id: CellId, from: Layer, to: Layer) -> Result<()> {
        if from == to {
            return self.shapes_mut(id, from).map(|_| ());
        }
        let shapes = self.remove_cell_layer(id, from)?;
        self.cell_mut(id)?.shapes.entry(to).or_default().merge(shapes);
        self.set_dirty(id, DirtyFlags::all(), Some(to));
        Ok(())
    }

    /// Removes and returns the shapes of `id` on `layer`.
    pub fn remove_cell_layer(&mut self, id: CellId, layer: Layer) -> Result<Shapes> {
        let shapes = self.cell_mut(id)?.shapes.remove(&layer).ok_or_else(|| {
            tracing::warn!(%layer, "no shapes on layer");
            Error::UnknownLayer(layer)
        })?;
        self.set_dirty(id, DirtyFlags::all(), Some(layer));
        Ok(shapes)
    }
}
