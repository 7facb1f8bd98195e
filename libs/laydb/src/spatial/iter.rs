use std::collections::HashSet;
use std::sync::Arc;

use geometry::prelude::*;

use super::grid::Relation;
use super::{IndexKey, QueryKind, QueryMode, SpatialIndex};
use crate::shapes::Shapes;

/// Iterator over the elements of a [`SpatialIndex`] touching a region.
///
/// Grid cells are visited row by row; all shapes are yielded before any instance.
#[derive(Debug, Clone)]
pub struct SpatialIterator<'a> {
    index: Arc<SpatialIndex>,
    shapes: Option<&'a Shapes>,
    region: Rect,
    mode: QueryMode,
    rows: (u32, u32),
    cols: (u32, u32),
    row: u32,
    col: u32,
    pos: usize,
    /// `true` once the walk over shapes is finished.
    instances: bool,
    with_instances: bool,
    cell_inside: bool,
    done: bool,
    seen: HashSet<IndexKey>,
}

impl<'a> SpatialIterator<'a> {
    pub(crate) fn new(
        index: Arc<SpatialIndex>,
        region: Rect,
        mode: QueryMode,
        kind: QueryKind,
        shapes: Option<&'a Shapes>,
    ) -> Self {
        let done = index.nodes.is_empty()
            || !region.intersects(&index.grid.region)
            || !(kind.includes_shapes() || kind.includes_instances());
        let (rows, cols) = index.grid.cell_range(&region);
        let mut iter = Self {
            index,
            shapes,
            region,
            mode,
            rows,
            cols,
            row: rows.0,
            col: cols.0,
            pos: 0,
            instances: !kind.includes_shapes(),
            with_instances: kind.includes_instances(),
            cell_inside: false,
            done,
            seen: HashSet::new(),
        };
        iter.enter_cell();
        iter
    }

    fn enter_cell(&mut self) {
        self.pos = 0;
        if !self.done {
            let cell = self.index.grid.cell_box(self.row, self.col);
            self.cell_inside = self.region.contains_rect(&cell);
        }
    }

    /// Moves to the next grid cell, starting over with instances after the last one.
    fn advance_cell(&mut self) {
        if self.col < self.cols.1 {
            self.col += 1;
        } else if self.row < self.rows.1 {
            self.col = self.cols.0;
            self.row += 1;
        } else if !self.instances && self.with_instances {
            self.instances = true;
            self.row = self.rows.0;
            self.col = self.cols.0;
        } else {
            self.done = true;
        }
        self.enter_cell();
    }

    fn accepts(&self, key: IndexKey, bbox: &Rect, relation: Relation) -> bool {
        if self.cell_inside || self.mode == QueryMode::Simple || relation == Relation::GridInside
        {
            return true;
        }
        match (key, self.shapes) {
            (IndexKey::Shape(kind, i), Some(shapes)) if kind.is_repetition() => {
                shapes.shape_intersects(kind, i, &self.region)
            }
            _ => bbox.intersects(&self.region),
        }
    }
}

impl Iterator for SpatialIterator<'_> {
    type Item = IndexKey;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let index = &*self.index;
            let node = &index.nodes[index.grid.node_index(self.row, self.col)];
            let (bucket, elements) = if self.instances {
                (&node.instances, &index.instances)
            } else {
                (&node.shapes, &index.shapes)
            };
            while let Some((item, relation)) = bucket.get(self.pos) {
                self.pos += 1;
                let element = &elements[item as usize];
                if !self.accepts(element.key, &element.bbox, relation) {
                    continue;
                }
                if relation != Relation::ElementInside && !self.seen.insert(element.key) {
                    continue;
                }
                return Some(element.key);
            }
            self.advance_cell();
        }
        None
    }
}
