//! Handles to individual shapes and instances.

use geometry::prelude::*;
use serde::{Deserialize, Serialize};

use crate::instance::Instance;
use crate::layer::Layer;
use crate::layout::Layout;
use crate::shape_rep::ShapeRepetition;
use crate::shapes::{Shape, ShapeKind, Shapes};
use crate::spatial::IndexKey;
use crate::text::Text;
use crate::CellId;

/// Identifies a shape: its cell, its layer and its index among shapes of its kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShapeRef {
    /// The cell that stores the shape.
    pub cell: CellId,
    /// The layer the shape is on.
    pub layer: Layer,
    /// The index of the shape among shapes of the same kind.
    pub index: u32,
}

/// Identifies an instance: its parent cell and its index in the parent.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceRef {
    /// The cell that holds the instance.
    pub cell: CellId,
    /// The index of the instance in the cell.
    pub index: u32,
}

/// The kind of an [`Element`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementKind {
    Rect,
    Polygon,
    Text,
    Path,
    RectRep,
    PolygonRep,
    Instance,
}

impl From<ShapeKind> for ElementKind {
    fn from(value: ShapeKind) -> Self {
        match value {
            ShapeKind::Rect => ElementKind::Rect,
            ShapeKind::Polygon => ElementKind::Polygon,
            ShapeKind::Text => ElementKind::Text,
            ShapeKind::Path => ElementKind::Path,
            ShapeKind::RectRep => ElementKind::RectRep,
            ShapeKind::PolygonRep => ElementKind::PolygonRep,
        }
    }
}

/// A handle to a shape or an instance in a [`Layout`].
///
/// Two elements are equal exactly when they refer to the same stored object.
/// Handles are invalidated by deletions in their cell, which swap-remove.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Element {
    Rect(ShapeRef),
    Polygon(ShapeRef),
    Path(ShapeRef),
    Text(ShapeRef),
    RectRep(ShapeRef),
    PolygonRep(ShapeRef),
    Instance(InstanceRef),
}

impl Element {
    /// Creates a handle to a shape of the given kind.
    pub fn shape(kind: ShapeKind, shape: ShapeRef) -> Self {
        match kind {
            ShapeKind::Rect => Element::Rect(shape),
            ShapeKind::Polygon => Element::Polygon(shape),
            ShapeKind::Text => Element::Text(shape),
            ShapeKind::Path => Element::Path(shape),
            ShapeKind::RectRep => Element::RectRep(shape),
            ShapeKind::PolygonRep => Element::PolygonRep(shape),
        }
    }

    /// Creates a handle to the instance at `index` of `cell`.
    pub fn instance(cell: CellId, index: u32) -> Self {
        Element::Instance(InstanceRef { cell, index })
    }

    pub(crate) fn from_key(cell: CellId, layer: Layer, key: IndexKey) -> Self {
        match key {
            IndexKey::Shape(kind, index) => Element::shape(kind, ShapeRef { cell, layer, index }),
            IndexKey::Instance(index) => Element::instance(cell, index),
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Rect(_) => ElementKind::Rect,
            Element::Polygon(_) => ElementKind::Polygon,
            Element::Path(_) => ElementKind::Path,
            Element::Text(_) => ElementKind::Text,
            Element::RectRep(_) => ElementKind::RectRep,
            Element::PolygonRep(_) => ElementKind::PolygonRep,
            Element::Instance(_) => ElementKind::Instance,
        }
    }

    /// Returns `true` if the element is of the given kind.
    pub fn is(&self, kind: ElementKind) -> bool {
        self.kind() == kind
    }

    /// The shape kind, or [`None`] for instances.
    pub fn shape_kind(&self) -> Option<ShapeKind> {
        Some(match self {
            Element::Rect(_) => ShapeKind::Rect,
            Element::Polygon(_) => ShapeKind::Polygon,
            Element::Path(_) => ShapeKind::Path,
            Element::Text(_) => ShapeKind::Text,
            Element::RectRep(_) => ShapeKind::RectRep,
            Element::PolygonRep(_) => ShapeKind::PolygonRep,
            Element::Instance(_) => return None,
        })
    }

    /// The shape handle, or [`None`] for instances.
    pub fn shape_ref(&self) -> Option<ShapeRef> {
        match *self {
            Element::Rect(s)
            | Element::Polygon(s)
            | Element::Path(s)
            | Element::Text(s)
            | Element::RectRep(s)
            | Element::PolygonRep(s) => Some(s),
            Element::Instance(_) => None,
        }
    }

    /// The instance handle, or [`None`] for shapes.
    pub fn instance_ref(&self) -> Option<InstanceRef> {
        match *self {
            Element::Instance(i) => Some(i),
            _ => None,
        }
    }

    /// The cell that stores the element.
    pub fn cell(&self) -> CellId {
        match *self {
            Element::Rect(s)
            | Element::Polygon(s)
            | Element::Path(s)
            | Element::Text(s)
            | Element::RectRep(s)
            | Element::PolygonRep(s) => s.cell,
            Element::Instance(i) => i.cell,
        }
    }

    fn shapes<'a>(&self, layout: &'a Layout) -> Option<(&'a Shapes, usize)> {
        let s = self.shape_ref()?;
        let shapes = layout.try_cell(s.cell)?.shapes(s.layer)?;
        Some((shapes, s.index as usize))
    }

    pub fn as_rect<'a>(&self, layout: &'a Layout) -> Option<&'a Rect> {
        match self {
            Element::Rect(_) => self.shapes(layout).and_then(|(s, i)| s.rects().get(i)),
            _ => None,
        }
    }

    pub fn as_polygon<'a>(&self, layout: &'a Layout) -> Option<&'a Polygon> {
        match self {
            Element::Polygon(_) => self.shapes(layout).and_then(|(s, i)| s.polygons().get(i)),
            _ => None,
        }
    }

    pub fn as_path<'a>(&self, layout: &'a Layout) -> Option<&'a Path> {
        match self {
            Element::Path(_) => self.shapes(layout).and_then(|(s, i)| s.paths().get(i)),
            _ => None,
        }
    }

    pub fn as_text<'a>(&self, layout: &'a Layout) -> Option<&'a Text> {
        match self {
            Element::Text(_) => self.shapes(layout).and_then(|(s, i)| s.texts().get(i)),
            _ => None,
        }
    }

    pub fn as_rect_rep<'a>(&self, layout: &'a Layout) -> Option<&'a ShapeRepetition<Rect>> {
        match self {
            Element::RectRep(_) => self.shapes(layout).and_then(|(s, i)| s.rect_reps().get(i)),
            _ => None,
        }
    }

    pub fn as_polygon_rep<'a>(
        &self,
        layout: &'a Layout,
    ) -> Option<&'a ShapeRepetition<Polygon>> {
        match self {
            Element::PolygonRep(_) => self
                .shapes(layout)
                .and_then(|(s, i)| s.polygon_reps().get(i)),
            _ => None,
        }
    }

    pub fn as_instance<'a>(&self, layout: &'a Layout) -> Option<&'a Instance> {
        let i = self.instance_ref()?;
        layout.try_cell(i.cell)?.instance(i.index as usize)
    }

    /// Returns an owned copy of the shape, or [`None`] for instances and stale handles.
    pub fn to_shape(&self, layout: &Layout) -> Option<Shape> {
        let (shapes, i) = self.shapes(layout)?;
        shapes.get(self.shape_kind()?, i as u32)
    }

    /// The bounding box of the element.
    ///
    /// For instances, `layer` selects the layer of the child cell to bound;
    /// [`None`] bounds the child on every layer. Shapes ignore `layer`.
    /// Texts and stale handles give the empty rectangle.
    pub fn bbox(&self, layout: &Layout, layer: Option<Layer>) -> Rect {
        match self {
            Element::Instance(_) => match self.as_instance(layout) {
                Some(inst) => {
                    let child = match layer {
                        Some(layer) => layout.cell_bbox(inst.cell(), layer),
                        None => layout.bbox_all(inst.cell()),
                    };
                    inst.placement().bbox(child)
                }
                None => Rect::EMPTY,
            },
            _ => match (self.shapes(layout), self.shape_kind()) {
                (Some((shapes, i)), Some(kind)) => shapes.shape_bbox(kind, i as u32),
                _ => Rect::EMPTY,
            },
        }
    }

    /// The area of a rectangle, polygon or path.
    pub fn area(&self, layout: &Layout) -> Option<f64> {
        match self {
            Element::Rect(_) => self.as_rect(layout).map(|r| r.area() as f64),
            Element::Polygon(_) => self.as_polygon(layout).map(Polygon::area),
            Element::Path(_) => self.as_path(layout).map(Path::area),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::Placement;

    const LAYER: Layer = Layer::new(1, 0);

    #[test]
    fn handles_resolve_through_the_layout() {
        let mut layout = Layout::new();
        let top = layout.create_cell("top").unwrap();
        let child = layout.create_cell("child").unwrap();
        let rect = layout
            .insert_shape(top, LAYER, Rect::from_sides(0, 0, 4, 5))
            .unwrap();
        layout
            .insert_shape(child, Layer::new(2, 0), Rect::from_sides(0, 0, 1, 1))
            .unwrap();
        let placement = Placement::builder().offset(Point::new(10, 10)).build();
        let inst = layout
            .insert_instance(top, Instance::new(child, placement))
            .unwrap();

        assert_eq!(rect.kind(), ElementKind::Rect);
        assert!(rect.is(ElementKind::Rect));
        assert_eq!(rect.cell(), top);
        assert_eq!(rect.as_rect(&layout), Some(&Rect::from_sides(0, 0, 4, 5)));
        assert!(rect.as_polygon(&layout).is_none());
        assert_eq!(rect.area(&layout), Some(20.0));
        assert_eq!(rect.to_shape(&layout), Some(Shape::Rect(Rect::from_sides(0, 0, 4, 5))));

        assert_eq!(inst, Element::instance(top, 0));
        assert_eq!(inst.as_instance(&layout).map(Instance::cell), Some(child));
        assert_eq!(inst.bbox(&layout, Some(LAYER)), Rect::EMPTY);
        assert_eq!(inst.bbox(&layout, None), Rect::from_sides(10, 10, 11, 11));
        assert_eq!(inst.area(&layout), None);
    }
}
