//! Uniform grids over a covering rectangle.

use geometry::prelude::*;

use super::SpatialIndexOption;

/// How an indexed element relates to a grid cell it was filed under.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Relation {
    /// The grid cell lies inside the element.
    GridInside,
    /// The element crosses the grid cell boundary.
    Intersect,
    /// The element lies inside this grid cell and no other.
    ElementInside,
}

/// Element indices filed under one grid cell, partitioned by [`Relation`].
#[derive(Debug, Clone, Default)]
pub(crate) struct Bucket {
    items: Vec<u32>,
    grid_inside_end: u32,
    intersect_end: u32,
}

impl Bucket {
    pub(crate) fn from_parts(parts: [Vec<u32>; 3]) -> Self {
        let [grid_inside, intersect, element_inside] = parts;
        let grid_inside_end = grid_inside.len() as u32;
        let intersect_end = grid_inside_end + intersect.len() as u32;
        let mut items = grid_inside;
        items.extend(intersect);
        items.extend(element_inside);
        Self {
            items,
            grid_inside_end,
            intersect_end,
        }
    }

    /// The element at position `pos` and how it relates to the grid cell.
    pub(crate) fn get(&self, pos: usize) -> Option<(u32, Relation)> {
        let item = *self.items.get(pos)?;
        let relation = if (pos as u32) < self.grid_inside_end {
            Relation::GridInside
        } else if (pos as u32) < self.intersect_end {
            Relation::Intersect
        } else {
            Relation::ElementInside
        };
        Some((item, relation))
    }
}

/// The contents of one grid cell: shapes and instances kept apart.
#[derive(Debug, Clone, Default)]
pub(crate) struct GridNode {
    pub(crate) shapes: Bucket,
    pub(crate) instances: Bucket,
}

/// The geometry of a grid: origin, cell size and dimensions.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Grid {
    pub(crate) region: Rect,
    pub(crate) rows: u32,
    pub(crate) cols: u32,
    pub(crate) cell_width: i64,
    pub(crate) cell_height: i64,
}

impl Grid {
    /// Lays out a grid over `region` for `n` elements.
    pub(crate) fn new(region: Rect, n: usize, option: &SpatialIndexOption) -> Self {
        let (rows, cols) = if option.window_step == 0 {
            let capacity = option.node_capacity.max(1);
            let k = if n < capacity {
                1
            } else {
                let k = (n as f64 / capacity as f64).sqrt().ceil() as u32;
                k.clamp(1, option.max_rows.max(1))
            };
            (k, k)
        } else {
            let step = option.window_step as i64;
            let count = |len: i64| ((len + step - 1) / step).clamp(1, u32::MAX as i64) as u32;
            (count(region.height()), count(region.width()))
        };
        let (cell_width, cell_height) = if option.window_step == 0 {
            let size = |len: i64, n: u32| ((len + n as i64 - 1) / n as i64).max(1);
            (size(region.width(), cols), size(region.height(), rows))
        } else {
            (option.window_step as i64, option.window_step as i64)
        };
        Self {
            region,
            rows,
            cols,
            cell_width,
            cell_height,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    pub(crate) fn node_index(&self, row: u32, col: u32) -> usize {
        row as usize * self.cols as usize + col as usize
    }

    /// The closed rectangle covered by the grid cell at (`row`, `col`).
    pub(crate) fn cell_box(&self, row: u32, col: u32) -> Rect {
        let x0 = self.region.left() as i64 + col as i64 * self.cell_width;
        let y0 = self.region.bot() as i64 + row as i64 * self.cell_height;
        Rect::new(
            Point::saturating_from_i64(x0, y0),
            Point::saturating_from_i64(x0 + self.cell_width, y0 + self.cell_height),
        )
    }

    fn col_of(&self, x: i32) -> u32 {
        let c = (x as i64 - self.region.left() as i64).div_euclid(self.cell_width);
        c.clamp(0, self.cols as i64 - 1) as u32
    }

    fn row_of(&self, y: i32) -> u32 {
        let r = (y as i64 - self.region.bot() as i64).div_euclid(self.cell_height);
        r.clamp(0, self.rows as i64 - 1) as u32
    }

    /// The inclusive row and column ranges of grid cells touching `rect`,
    /// clamped to the grid.
    pub(crate) fn cell_range(&self, rect: &Rect) -> ((u32, u32), (u32, u32)) {
        (
            (self.row_of(rect.bot()), self.row_of(rect.top())),
            (self.col_of(rect.left()), self.col_of(rect.right())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_grid_grows_with_element_count() {
        let region = Rect::from_sides(0, 0, 1000, 1000);
        let option = SpatialIndexOption::default();
        assert_eq!(Grid::new(region, 1999, &option).len(), 1);
        let grid = Grid::new(region, 2000 * 9, &option);
        assert_eq!((grid.rows, grid.cols), (3, 3));
        assert_eq!(grid.cell_width, 334);
        let grid = Grid::new(region, usize::MAX / 2, &option);
        assert_eq!((grid.rows, grid.cols), (100, 100));
    }

    #[test]
    fn stepped_grid_rounds_up() {
        let region = Rect::from_sides(0, 0, 1001, 500);
        let option = SpatialIndexOption {
            window_step: 100,
            ..Default::default()
        };
        let grid = Grid::new(region, 1, &option);
        assert_eq!((grid.rows, grid.cols), (5, 11));
        assert_eq!(grid.cell_box(1, 10), Rect::from_sides(1000, 100, 1100, 200));
    }

    #[test]
    fn cell_range_includes_shared_edges() {
        let region = Rect::from_sides(0, 0, 100, 100);
        let option = SpatialIndexOption {
            window_step: 10,
            ..Default::default()
        };
        let grid = Grid::new(region, 1, &option);
        assert_eq!(
            grid.cell_range(&Rect::from_sides(5, 5, 10, 10)),
            ((0, 1), (0, 1))
        );
        assert_eq!(
            grid.cell_range(&Rect::from_sides(-50, 95, 500, 200)),
            ((9, 9), (0, 9))
        );
    }

    #[test]
    fn bucket_partitions_by_relation() {
        let bucket = Bucket::from_parts([vec![7], vec![3, 4], vec![9]]);
        assert_eq!(bucket.get(0), Some((7, Relation::GridInside)));
        assert_eq!(bucket.get(2), Some((4, Relation::Intersect)));
        assert_eq!(bucket.get(3), Some((9, Relation::ElementInside)));
        assert_eq!(bucket.get(4), None);
    }
}
