//! Iteration over the elements of a single cell on one layer.

use geometry::prelude::*;

use crate::cell::Cell;
use crate::element::{Element, ShapeRef};
use crate::layer::Layer;
use crate::layout::Layout;
use crate::shapes::{ShapeKind, Shapes};
use crate::spatial::{QueryKind, QueryMode, SpatialIterator};
use crate::CellId;

/// Below this many elements a linear scan beats an accurate index query.
pub const INDEX_THRESHOLD: usize = 100;

#[derive(Debug, Clone)]
enum Scan<'a> {
    Indexed(SpatialIterator<'a>),
    /// Position of the next candidate: kind slot (shapes only) and index.
    Linear(usize, u32),
    Done,
}

/// Iterator over the shapes and instances of one cell on one layer.
///
/// Shapes come first, in the kind order of [`ShapeKind::AREA`] (texts are
/// never returned), followed by instances in insertion order. Instances
/// whose child has nothing on the layer are skipped. When the cell has a
/// clean spatial index on the layer, large parts are served from it;
/// otherwise every element is tested against the region. This iterator
/// never builds an index.
#[derive(Debug, Clone)]
pub struct CellElementIterator<'a> {
    layout: &'a Layout,
    id: CellId,
    cell: &'a Cell,
    layer: Layer,
    shapes: Option<&'a Shapes>,
    region: Option<Rect>,
    shape_scan: Scan<'a>,
    instance_scan: Scan<'a>,
}

impl<'a> CellElementIterator<'a> {
    /// Creates an iterator over the elements of `id` on `layer` touching `region`.
    ///
    /// A region of [`None`] places no restriction.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a cell of `layout`.
    pub fn new(
        layout: &'a Layout,
        id: CellId,
        layer: Layer,
        region: Option<Rect>,
        kind: QueryKind,
        mode: QueryMode,
    ) -> Self {
        let cell = layout.cell(id);
        let shapes = cell.shapes(layer);
        let bbox = layout.cell_bbox(id, layer);
        let (region, empty) = match region {
            _ if bbox.is_empty() => (None, true),
            Some(r) if !r.intersects(&bbox) => (None, true),
            Some(r) if r.contains_rect(&bbox) => (None, false),
            r => (r, false),
        };
        let index = region.and_then(|_| layout.spatial_index(id, layer));
        let scan = |wanted: bool, count: usize, filter: QueryKind| match (&index, region) {
            _ if !wanted || empty => Scan::Done,
            (Some(index), Some(region)) if mode == QueryMode::Simple || count > INDEX_THRESHOLD => {
                Scan::Indexed(index.query(region, mode, filter, shapes))
            }
            _ => Scan::Linear(0, 0),
        };
        let shape_count = shapes.map_or(0, |s| ShapeKind::AREA.iter().map(|&k| s.count(k)).sum());
        let shape_scan = scan(kind.includes_shapes(), shape_count, QueryKind::Shapes);
        let instance_scan = scan(
            kind.includes_instances(),
            cell.instances().len(),
            QueryKind::Instances,
        );
        Self {
            layout,
            id,
            cell,
            layer,
            shapes,
            region,
            shape_scan,
            instance_scan,
        }
    }

    /// The cell being iterated.
    pub fn cell(&self) -> CellId {
        self.id
    }

    /// The layer being iterated.
    pub fn layer(&self) -> Layer {
        self.layer
    }

    /// The effective query region, or [`None`] for an unrestricted scan.
    pub fn region(&self) -> Option<Rect> {
        self.region
    }

    fn next_shape(&mut self) -> Option<Element> {
        let shape_ref = |index| ShapeRef {
            cell: self.id,
            layer: self.layer,
            index,
        };
        match &mut self.shape_scan {
            Scan::Indexed(iter) => {
                let key = iter.next()?;
                Some(Element::from_key(self.id, self.layer, key))
            }
            Scan::Linear(slot, index) => {
                let shapes = self.shapes?;
                while let Some(&kind) = ShapeKind::AREA.get(*slot) {
                    if (*index as usize) >= shapes.count(kind) {
                        *slot += 1;
                        *index = 0;
                        continue;
                    }
                    let i = *index;
                    *index += 1;
                    if self
                        .region
                        .is_none_or(|r| shapes.shape_intersects(kind, i, &r))
                    {
                        return Some(Element::shape(kind, shape_ref(i)));
                    }
                }
                None
            }
            Scan::Done => None,
        }
    }

    fn next_instance(&mut self) -> Option<Element> {
        match &mut self.instance_scan {
            Scan::Indexed(iter) => {
                let key = iter.next()?;
                Some(Element::from_key(self.id, self.layer, key))
            }
            Scan::Linear(_, index) => {
                while let Some(inst) = self.cell.instance(*index as usize) {
                    let i = *index;
                    *index += 1;
                    let bbox = inst
                        .placement()
                        .bbox(self.layout.cell_bbox(inst.cell(), self.layer));
                    if !bbox.is_empty() && self.region.is_none_or(|r| bbox.intersects(&r)) {
                        return Some(Element::instance(self.id, i));
                    }
                }
                None
            }
            Scan::Done => None,
        }
    }
}

impl Iterator for CellElementIterator<'_> {
    type Item = Element;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(element) = self.next_shape() {
            return Some(element);
        }
        self.shape_scan = Scan::Done;
        self.next_instance()
    }
}
