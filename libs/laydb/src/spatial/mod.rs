//! Grid spatial indices over the elements of one cell on one layer.
//!
//! An index files every element with a non-empty bounding box under each grid
//! cell it overlaps, remembering whether the grid cell lies inside the
//! element, the element lies inside the grid cell, or neither. Queries walk
//! only the grid cells overlapping the query region and use those relations
//! to skip most intersection tests.

mod grid;
mod iter;

use std::sync::Arc;

use geometry::prelude::*;
use serde::{Deserialize, Serialize};

use crate::shapes::{ShapeKind, Shapes};

use self::grid::{Bucket, Grid, GridNode};
pub use self::iter::SpatialIterator;

/// Options controlling how a [`SpatialIndex`] lays out its grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialIndexOption {
    /// The side length of a grid cell. Zero picks the grid size from the element count.
    pub window_step: u32,
    /// The area to cover. Empty means the union of the element bounding boxes.
    pub region: Rect,
    /// The maximum number of rows (and columns) of an automatically sized grid.
    pub max_rows: u32,
    /// The number of elements per grid cell an automatically sized grid aims for.
    pub node_capacity: usize,
}

impl Default for SpatialIndexOption {
    fn default() -> Self {
        Self {
            window_step: 0,
            region: Rect::EMPTY,
            max_rows: 100,
            node_capacity: 2000,
        }
    }
}

/// How precisely a query filters its results.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryMode {
    /// Only elements that touch the query region.
    #[default]
    Accurate,
    /// Every element filed under a grid cell that touches the query region.
    Simple,
}

/// Which elements a query returns.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryKind {
    /// Shapes only.
    Shapes,
    /// Instances only.
    Instances,
    /// Shapes, then instances.
    #[default]
    All,
}

impl QueryKind {
    /// Returns `true` if shapes are part of the result.
    pub fn includes_shapes(&self) -> bool {
        matches!(self, QueryKind::Shapes | QueryKind::All)
    }

    /// Returns `true` if instances are part of the result.
    pub fn includes_instances(&self) -> bool {
        matches!(self, QueryKind::Instances | QueryKind::All)
    }
}

/// Identifies an element of a cell on the indexed layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexKey {
    /// The shape of the given kind and index.
    Shape(ShapeKind, u32),
    /// The instance at the given index.
    Instance(u32),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct IndexedElement {
    pub(crate) key: IndexKey,
    pub(crate) bbox: Rect,
}

/// An immutable grid index over the shapes and instances of a cell on one layer.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    grid: Grid,
    window_step: u32,
    shapes: Vec<IndexedElement>,
    instances: Vec<IndexedElement>,
    nodes: Vec<GridNode>,
}

impl SpatialIndex {
    /// Builds an index over `shapes` and the given `(instance index, bounding box)` pairs.
    ///
    /// Elements with an empty bounding box are not indexed.
    pub fn build(
        shapes: Option<&Shapes>,
        instances: impl IntoIterator<Item = (u32, Rect)>,
        option: &SpatialIndexOption,
    ) -> Self {
        let shapes_list = shapes.map(collect_shapes).unwrap_or_default();
        let instances: Vec<_> = instances
            .into_iter()
            .filter(|(_, bbox)| !bbox.is_empty())
            .map(|(i, bbox)| IndexedElement {
                key: IndexKey::Instance(i),
                bbox,
            })
            .collect();
        let region = Self::covering(option, &shapes_list, &instances);
        let grid = Grid::new(region, shapes_list.len() + instances.len(), option);
        Self::with_grid(grid, option.window_step, shapes, shapes_list, instances)
    }

    /// The number of grid cells an index over these elements would have.
    pub fn grid_size(
        shapes: Option<&Shapes>,
        instances: impl IntoIterator<Item = (u32, Rect)>,
        option: &SpatialIndexOption,
    ) -> usize {
        let shapes_list = shapes.map(collect_shapes).unwrap_or_default();
        let instances: Vec<_> = instances
            .into_iter()
            .filter(|(_, bbox)| !bbox.is_empty())
            .map(|(i, bbox)| IndexedElement {
                key: IndexKey::Instance(i),
                bbox,
            })
            .collect();
        let n = shapes_list.len() + instances.len();
        if n == 0 {
            return 0;
        }
        let region = Self::covering(option, &shapes_list, &instances);
        Grid::new(region, n, option).len()
    }

    fn covering(
        option: &SpatialIndexOption,
        shapes: &[IndexedElement],
        instances: &[IndexedElement],
    ) -> Rect {
        shapes
            .iter()
            .chain(instances)
            .fold(option.region, |acc, e| acc.union(e.bbox))
    }

    fn with_grid(
        grid: Grid,
        window_step: u32,
        store: Option<&Shapes>,
        shapes: Vec<IndexedElement>,
        instances: Vec<IndexedElement>,
    ) -> Self {
        let file = |elements: &[IndexedElement]| {
            let mut parts = vec![<[Vec<u32>; 3]>::default(); grid.len()];
            for (i, element) in elements.iter().enumerate() {
                let ((r0, r1), (c0, c1)) = grid.cell_range(&element.bbox);
                if r0 == r1 && c0 == c1 {
                    parts[grid.node_index(r0, c0)][2].push(i as u32);
                    continue;
                }
                let repeated = match element.key {
                    IndexKey::Shape(kind, _) => kind.is_repetition(),
                    IndexKey::Instance(_) => false,
                };
                for row in r0..=r1 {
                    for col in c0..=c1 {
                        let cell = grid.cell_box(row, col);
                        let part = if repeated {
                            let touches = match (element.key, store) {
                                (IndexKey::Shape(kind, idx), Some(store)) => {
                                    store.shape_intersects(kind, idx, &cell)
                                }
                                _ => true,
                            };
                            if !touches {
                                continue;
                            }
                            1
                        } else if element.bbox.contains_rect(&cell) {
                            0
                        } else {
                            1
                        };
                        parts[grid.node_index(row, col)][part].push(i as u32);
                    }
                }
            }
            parts.into_iter().map(Bucket::from_parts).collect::<Vec<_>>()
        };
        let shape_buckets = file(&shapes);
        let instance_buckets = file(&instances);
        let nodes = shape_buckets
            .into_iter()
            .zip(instance_buckets)
            .map(|(shapes, instances)| GridNode { shapes, instances })
            .collect();
        Self {
            grid,
            window_step,
            shapes,
            instances,
            nodes,
        }
    }

    /// Lazily iterates over the elements touching `region`.
    ///
    /// `shapes` must be the store the index was built from; it is used to
    /// test repeated shapes per repeat. Without it, their bounding boxes are tested.
    pub fn query<'a>(
        self: &Arc<Self>,
        region: Rect,
        mode: QueryMode,
        kind: QueryKind,
        shapes: Option<&'a Shapes>,
    ) -> SpatialIterator<'a> {
        SpatialIterator::new(Arc::clone(self), region, mode, kind, shapes)
    }

    /// The rectangle covered by the grid.
    pub fn region(&self) -> Rect {
        self.grid.region
    }

    pub fn rows(&self) -> u32 {
        self.grid.rows
    }

    pub fn cols(&self) -> u32 {
        self.grid.cols
    }

    /// The window step the index was built with.
    pub fn window_step(&self) -> u32 {
        self.window_step
    }

    /// The number of indexed elements.
    pub fn len(&self) -> usize {
        self.shapes.len() + self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The number of indexed shapes.
    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// The number of indexed instances.
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

fn collect_shapes(shapes: &Shapes) -> Vec<IndexedElement> {
    ShapeKind::AREA
        .iter()
        .flat_map(|&kind| {
            (0..shapes.count(kind) as u32).map(move |i| IndexedElement {
                key: IndexKey::Shape(kind, i),
                bbox: shapes.shape_bbox(kind, i),
            })
        })
        .filter(|e| !e.bbox.is_empty())
        .collect()
}
