//! Whole-cell rewrites: transformation, compression and flattening.

use std::collections::BTreeMap;

use geometry::prelude::*;

use crate::cell::DirtyFlags;
use crate::error::{Error, Result};
use crate::iter::{ElementIterator, ElementIteratorOption};
use crate::layer::Layer;
use crate::shapes::{Shape, Shapes};
use crate::spatial::QueryKind;
use crate::CellId;

use super::{DeleteMode, Layout};

impl Layout {
    /// Applies `trans` to every shape and instance placement of a cell.
    pub fn transform_cell(&mut self, id: CellId, trans: &Transformation) -> Result<()> {
        let layers = self.layers_including_children(self.checked(id)?);
        let cell = self.cell_mut(id)?;
        for shapes in cell.shapes.values_mut() {
            shapes.transform_mut(*trans);
        }
        for inst in cell.instances.iter_mut() {
            inst.placement_mut().transform(trans);
        }
        tracing::debug!(cell = %cell.name, "transformed cell");
        self.invalidate_layers(id, layers);
        Ok(())
    }

    /// Folds repeated rectangles and polygons of a cell into repetitions.
    ///
    /// See [`Shapes::compress`] for the meaning of `level`.
    pub fn compress_cell(&mut self, id: CellId, level: u32) -> Result<()> {
        self.rewrite_shapes(id, |shapes| shapes.compress(level))
    }

    /// Expands every repetition of a cell into individual shapes.
    pub fn decompress_cell(&mut self, id: CellId) -> Result<()> {
        self.rewrite_shapes(id, Shapes::decompress)
    }

    /// Compresses every cell.
    pub fn compress(&mut self, level: u32) {
        let ids: Vec<CellId> = self.cells.keys().collect();
        for id in ids {
            // Every id was just listed from the pool.
            let _ = self.compress_cell(id, level);
        }
    }

    /// Decompresses every cell.
    pub fn decompress(&mut self) {
        let ids: Vec<CellId> = self.cells.keys().collect();
        for id in ids {
            let _ = self.decompress_cell(id);
        }
    }

    fn rewrite_shapes(&mut self, id: CellId, mut f: impl FnMut(&mut Shapes)) -> Result<()> {
        let cell = self.cell_mut(id)?;
        let layers: Vec<Layer> = cell.shapes.keys().copied().collect();
        for shapes in cell.shapes.values_mut() {
            f(shapes);
        }
        for layer in layers {
            self.set_dirty(id, DirtyFlags::BBOX | DirtyFlags::SPATIAL_INDEX, Some(layer));
        }
        Ok(())
    }

    fn checked(&self, id: CellId) -> Result<CellId> {
        if self.contains(id) {
            Ok(id)
        } else {
            Err(Error::UnknownCell(id))
        }
    }

    /// Replaces the instances of a cell by copies of everything they contain.
    ///
    /// The shapes of every descendant are transformed into the cell's
    /// coordinates, repetitions staying compact. With `delete_unused`, former
    /// descendants left without any parent are deleted.
    pub fn flatten_cell(&mut self, id: CellId, delete_unused: bool) -> Result<()> {
        let id = self.checked(id)?;
        if self.cell(id).instances().is_empty() {
            return Ok(());
        }
        let descendants = self.descendants(id);
        let mut flat: BTreeMap<Layer, Vec<Shape>> = BTreeMap::new();
        for layer in self.layers_including_children(id) {
            let option = ElementIteratorOption {
                query: QueryKind::Shapes,
                ..Default::default()
            };
            let shapes: Vec<Shape> = ElementIterator::new(self, id, layer, option)
                .filter(|visit| visit.level > 0)
                .filter_map(|visit| {
                    let shape = visit.element.to_shape(self)?;
                    Some(shape.transform(visit.trans))
                })
                .collect();
            if !shapes.is_empty() {
                flat.insert(layer, shapes);
            }
        }
        for (layer, text) in self.nested_texts(id, Transformation::identity()) {
            flat.entry(layer).or_default().push(text);
        }

        tracing::debug!(
            cell = %self.cell(id).name,
            layers = flat.len(),
            shapes = flat.values().map(Vec::len).sum::<usize>(),
            "flattening cell"
        );
        self.clear_instances(id)?;
        for (layer, shapes) in flat {
            self.insert_shapes(id, layer, shapes)?;
        }

        if delete_unused {
            for cell in descendants {
                if self.try_cell(cell).is_some_and(|c| c.parents().next().is_none()) {
                    self.delete_cell(cell, DeleteMode::Deep)?;
                }
            }
        }
        Ok(())
    }

    /// Texts of every descendant of `id`, in the coordinates given by `trans`.
    fn nested_texts(&self, id: CellId, trans: Transformation) -> Vec<(Layer, Shape)> {
        let mut out = Vec::new();
        for inst in self.cell(id).instances() {
            let placement = inst.placement();
            let child = self.cell(inst.cell());
            for i in 0..placement.len() {
                let trans = Transformation::cascade(trans, placement.trans(i));
                for (layer, shapes) in child.shapes_iter() {
                    out.extend(
                        shapes
                            .texts()
                            .iter()
                            .map(|text| (layer, Shape::Text(text.clone().transform(trans)))),
                    );
                }
                out.extend(self.nested_texts(inst.cell(), trans));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::instance::Instance;
    use crate::placement::Placement;
    use crate::shape_rep::ShapeRepetition;
    use crate::shapes::ShapeKind;
    use crate::text::Text;

    const LAYER: Layer = Layer::new(1, 0);
    const PINS: Layer = Layer::new(2, 0);

    #[test]
    fn transform_cell_moves_shapes_and_instances() {
        let mut layout = Layout::new();
        let top = layout.create_cell("top").unwrap();
        let unit = layout.create_cell("unit").unwrap();
        layout.insert_shape(unit, LAYER, Rect::from_sides(0, 0, 10, 10)).unwrap();
        layout.insert_shape(top, LAYER, Rect::from_sides(0, 0, 5, 5)).unwrap();
        layout
            .insert_instance(top, Instance::new(unit, Placement::default()))
            .unwrap();
        assert_eq!(layout.cell_bbox(top, LAYER), Rect::from_sides(0, 0, 10, 10));

        layout
            .transform_cell(top, &Transformation::rotate(Rotation::R90))
            .unwrap();
        assert_eq!(layout.cell_bbox(top, LAYER), Rect::from_sides(-10, 0, 0, 10));
        assert_eq!(layout.cell_bbox(unit, LAYER), Rect::from_sides(0, 0, 10, 10));
    }

    #[test]
    fn compression_preserves_bbox() {
        let mut layout = Layout::new();
        let cell = layout.create_cell("cell").unwrap();
        layout
            .insert_shapes(
                cell,
                LAYER,
                (0..10).map(|i| Rect::from_sides(i * 20, 0, i * 20 + 10, 10)),
            )
            .unwrap();
        let bbox = layout.cell_bbox(cell, LAYER);

        layout.compress_cell(cell, 2).unwrap();
        let shapes = layout.cell(cell).shapes(LAYER).unwrap();
        assert_eq!(shapes.count(ShapeKind::Rect), 0);
        assert_eq!(shapes.count(ShapeKind::RectRep), 1);
        assert_eq!(shapes.polygon_count(), 10);
        assert_eq!(layout.cell_bbox(cell, LAYER), bbox);

        layout.decompress();
        let shapes = layout.cell(cell).shapes(LAYER).unwrap();
        assert_eq!(shapes.count(ShapeKind::Rect), 10);
        assert_eq!(layout.cell_bbox(cell, LAYER), bbox);
    }

    #[test]
    fn flatten_copies_nested_shapes() {
        let mut layout = Layout::new();
        let top = layout.create_cell("top").unwrap();
        let mid = layout.create_cell("mid").unwrap();
        let leaf = layout.create_cell("leaf").unwrap();
        let shared = layout.create_cell("shared").unwrap();
        let other = layout.create_cell("other").unwrap();

        layout.insert_shape(leaf, LAYER, Rect::from_sides(0, 0, 10, 10)).unwrap();
        layout
            .insert_shape(
                leaf,
                PINS,
                Text::new("a", Transformation::from_offset(Point::new(5, 5))),
            )
            .unwrap();
        layout
            .insert_shape(
                mid,
                LAYER,
                ShapeRepetition::new(
                    Rect::from_sides(0, 20, 5, 25),
                    Repetition::array(1, 3, Point::zero(), Point::new(10, 0)),
                ),
            )
            .unwrap();
        layout.insert_shape(shared, LAYER, Rect::from_sides(0, 0, 1, 1)).unwrap();
        let placement = Placement::builder()
            .repetition(Repetition::array(1, 2, Point::zero(), Point::new(100, 0)))
            .build();
        layout.insert_instance(mid, Instance::new(leaf, placement)).unwrap();
        let placement = Placement::builder().offset(Point::new(0, 1000)).build();
        layout.insert_instance(top, Instance::new(mid, placement)).unwrap();
        layout.insert_instance(top, Instance::new(shared, Placement::default())).unwrap();
        layout.insert_instance(other, Instance::new(shared, Placement::default())).unwrap();

        let bbox = layout.cell_bbox(top, LAYER);
        let count = layout.cell_polygon_count(top, LAYER);
        layout.flatten_cell(top, true).unwrap();

        assert!(layout.cell(top).instances().is_empty());
        assert_eq!(layout.cell_bbox(top, LAYER), bbox);
        assert_eq!(layout.cell_polygon_count(top, LAYER), count);
        let shapes = layout.cell(top).shapes(LAYER).unwrap();
        assert_eq!(shapes.count(ShapeKind::RectRep), 1);
        assert_eq!(shapes.count(ShapeKind::Rect), 3);
        let texts = layout.cell(top).shapes(PINS).unwrap().texts();
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[1].position(), Point::new(105, 1005));

        assert!(!layout.contains(mid));
        assert!(!layout.contains(leaf));
        assert!(layout.contains(shared));
        assert!(!layout.cell(shared).has_parent(top));
    }

    #[test]
    fn unknown_cells_are_rejected() {
        let mut layout = Layout::new();
        let id = layout.create_cell("gone").unwrap();
        layout.delete_cell(id, DeleteMode::Shallow).unwrap();
        assert!(layout.transform_cell(id, &Transformation::identity()).is_err());
        assert!(layout.compress_cell(id, 1).is_err());
        assert!(layout.flatten_cell(id, false).is_err());
    }
}
