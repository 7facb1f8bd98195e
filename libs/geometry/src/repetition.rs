//! Repetitions: compact sets of integer offsets.
//!
//! A repetition stands for the same object placed once per offset. Offsets are
//! addressed by index; array repetitions are indexed in row-major order and the
//! other kinds in list order.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::dir::Dir;
use crate::point::Point;
use crate::rect::Rect;
use crate::transform::Transformation;

/// A two-dimensional lattice of offsets.
///
/// Offset `i` is `row_offset * (i / cols) + col_offset * (i % cols)`.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayRepetition {
    rows: u32,
    cols: u32,
    row_offset: Point,
    col_offset: Point,
}

impl ArrayRepetition {
    /// Creates a new array repetition.
    pub fn new(rows: u32, cols: u32, row_offset: Point, col_offset: Point) -> Self {
        Self {
            rows,
            cols,
            row_offset,
            col_offset,
        }
    }

    /// The number of rows.
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// The number of columns.
    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// The displacement between consecutive rows.
    pub fn row_offset(&self) -> Point {
        self.row_offset
    }

    /// The displacement between consecutive columns.
    pub fn col_offset(&self) -> Point {
        self.col_offset
    }

    fn len(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    fn at(&self, row: usize, col: usize) -> Point {
        self.row_offset * row as i64 + self.col_offset * col as i64
    }

    fn bbox(&self) -> Rect {
        if self.len() == 0 {
            return Rect::EMPTY;
        }
        let r = self.row_offset * (self.rows as i64 - 1);
        let c = self.col_offset * (self.cols as i64 - 1);
        let corners = [Point::zero(), r, c, r + c];
        let (mut ll, mut ur) = (corners[0], corners[0]);
        for p in &corners[1..] {
            ll = Point::new(ll.x.min(p.x), ll.y.min(p.y));
            ur = Point::new(ur.x.max(p.x), ur.y.max(p.y));
        }
        Rect::new(ll, ur)
    }

    /// The rows that may hold an offset inside `region`.
    fn row_range(&self, region: &Rect) -> Range<usize> {
        let (row, col) = (self.row_offset, self.col_offset);
        let (l, b, r, t) = (
            region.left() as i128,
            region.bot() as i128,
            region.right() as i128,
            region.top() as i128,
        );
        if col.x == 0 {
            constrain(l, row.x as i128, r, self.rows as usize)
        } else if col.y == 0 {
            constrain(b, row.y as i128, t, self.rows as usize)
        } else {
            // Project onto the normal of the column vector: cross(p, col) = i * cross(row, col).
            let (cx, cy) = (col.x as i128, col.y as i128);
            let lo = if cy > 0 { l } else { r } * cy - if cx > 0 { t } else { b } * cx;
            let hi = if cy > 0 { r } else { l } * cy - if cx > 0 { b } else { t } * cx;
            constrain(lo, row.cross(col) as i128, hi, self.rows as usize)
        }
    }

    /// The columns of row `row` whose offset lies inside `region`.
    fn col_range(&self, row: usize, region: &Rect) -> Range<usize> {
        let v = self.row_offset * row as i64;
        let col = self.col_offset;
        let n = self.cols as usize;
        let xs = constrain(
            region.left() as i128 - v.x as i128,
            col.x as i128,
            region.right() as i128 - v.x as i128,
            n,
        );
        let ys = constrain(
            region.bot() as i128 - v.y as i128,
            col.y as i128,
            region.top() as i128 - v.y as i128,
            n,
        );
        xs.start.max(ys.start)..xs.end.min(ys.end).max(xs.start.max(ys.start))
    }
}

/// Offsets along a single axis: `(c, 0)` for horizontal, `(0, c)` for vertical.
///
/// The coordinate list is monotone (ascending or descending).
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisRepetition {
    dir: Dir,
    coords: Vec<i32>,
}

impl AxisRepetition {
    /// Creates an axis repetition. A coordinate list that is not monotone is sorted.
    pub fn new(dir: Dir, mut coords: Vec<i32>) -> Self {
        let ascending = coords.windows(2).all(|w| w[0] <= w[1]);
        let descending = coords.windows(2).all(|w| w[0] >= w[1]);
        if !ascending && !descending {
            coords.sort_unstable();
        }
        Self { dir, coords }
    }

    /// Horizontal offsets `(x, 0)`.
    pub fn horizontal(xs: Vec<i32>) -> Self {
        Self::new(Dir::Horiz, xs)
    }

    /// Vertical offsets `(0, y)`.
    pub fn vertical(ys: Vec<i32>) -> Self {
        Self::new(Dir::Vert, ys)
    }

    /// The repetition axis.
    pub fn dir(&self) -> Dir {
        self.dir
    }

    /// The coordinates along the axis.
    pub fn coords(&self) -> &[i32] {
        &self.coords
    }

    fn at(&self, i: usize) -> Point {
        Point::from_dir_coords(self.dir, self.coords[i], 0)
    }

    fn is_descending(&self) -> bool {
        self.coords.first() > self.coords.last()
    }

    fn bbox(&self) -> Rect {
        match (self.coords.first(), self.coords.last()) {
            (Some(&a), Some(&b)) => Rect::new(
                Point::from_dir_coords(self.dir, a, 0),
                Point::from_dir_coords(self.dir, b, 0),
            ),
            _ => Rect::EMPTY,
        }
    }

    fn index_range(&self, region: &Rect) -> Range<usize> {
        let other = self.dir.other();
        let (olo, ohi) = match other {
            Dir::Horiz => (region.left(), region.right()),
            Dir::Vert => (region.bot(), region.top()),
        };
        if olo > 0 || ohi < 0 {
            return 0..0;
        }
        let (lo, hi) = match self.dir {
            Dir::Horiz => (region.left(), region.right()),
            Dir::Vert => (region.bot(), region.top()),
        };
        let (start, end) = if self.is_descending() {
            (
                self.coords.partition_point(|&c| c > hi),
                self.coords.partition_point(|&c| c >= lo),
            )
        } else {
            (
                self.coords.partition_point(|&c| c < lo),
                self.coords.partition_point(|&c| c <= hi),
            )
        };
        start..end.max(start)
    }
}

/// An arbitrary list of offsets.
///
/// After [`OrdinaryRepetition::sort`] the offsets are ordered by `(x, y)` and
/// region queries use binary search.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrdinaryRepetition {
    offsets: Vec<Point>,
    sorted: bool,
    bbox: Rect,
}

impl OrdinaryRepetition {
    /// Creates an unsorted ordinary repetition.
    pub fn new(offsets: Vec<Point>) -> Self {
        let bbox = points_bbox(&offsets);
        Self {
            offsets,
            sorted: false,
            bbox,
        }
    }

    /// Sorts the offsets by `(x, y)`, changing their indices.
    pub fn sort(&mut self) {
        self.offsets.sort_unstable();
        self.sorted = true;
    }

    /// Returns `true` if the offsets are sorted.
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// The offsets, in list order.
    pub fn offsets(&self) -> &[Point] {
        &self.offsets
    }
}

fn points_bbox(points: &[Point]) -> Rect {
    let Some(first) = points.first() else {
        return Rect::EMPTY;
    };
    let (mut ll, mut ur) = (*first, *first);
    for p in &points[1..] {
        ll = Point::new(ll.x.min(p.x), ll.y.min(p.y));
        ur = Point::new(ur.x.max(p.x), ur.y.max(p.y));
    }
    Rect::new(ll, ur)
}

/// A set of offsets at which an object is repeated.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum Repetition {
    /// A regular two-dimensional lattice.
    Array(ArrayRepetition),
    /// Offsets along the x or y axis.
    Axis(AxisRepetition),
    /// An arbitrary offset list.
    Ordinary(OrdinaryRepetition),
}

impl Repetition {
    /// Creates an array repetition.
    ///
    /// # Example
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// let rep = Repetition::array(2, 3, Point::new(0, 100), Point::new(10, 0));
    /// assert_eq!(rep.len(), 6);
    /// assert_eq!(rep.offset(4), Point::new(10, 100));
    /// assert_eq!(rep.offset(6), Point::zero());
    /// assert_eq!(rep.bbox(), Rect::from_sides(0, 0, 20, 100));
    /// ```
    pub fn array(rows: u32, cols: u32, row_offset: Point, col_offset: Point) -> Self {
        Self::Array(ArrayRepetition::new(rows, cols, row_offset, col_offset))
    }

    /// Creates a horizontal repetition with offsets `(x, 0)`.
    pub fn horizontal(xs: Vec<i32>) -> Self {
        Self::Axis(AxisRepetition::horizontal(xs))
    }

    /// Creates a vertical repetition with offsets `(0, y)`.
    pub fn vertical(ys: Vec<i32>) -> Self {
        Self::Axis(AxisRepetition::vertical(ys))
    }

    /// Creates an ordinary repetition from an offset list.
    pub fn ordinary(offsets: Vec<Point>) -> Self {
        Self::Ordinary(OrdinaryRepetition::new(offsets))
    }

    /// The number of offsets.
    pub fn len(&self) -> usize {
        match self {
            Self::Array(a) => a.len(),
            Self::Axis(a) => a.coords.len(),
            Self::Ordinary(o) => o.offsets.len(),
        }
    }

    /// Returns `true` if there are no offsets.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The offset at index `i`, or `(0, 0)` if `i` is out of range.
    pub fn offset(&self, i: usize) -> Point {
        if i >= self.len() {
            return Point::zero();
        }
        match self {
            Self::Array(a) => {
                let cols = a.cols as usize;
                a.at(i / cols, i % cols)
            }
            Self::Axis(a) => a.at(i),
            Self::Ordinary(o) => o.offsets[i],
        }
    }

    /// Iterates over all offsets in index order.
    pub fn offsets(&self) -> impl Iterator<Item = Point> + '_ {
        (0..self.len()).map(|i| self.offset(i))
    }

    /// The bounding box of the offsets themselves.
    ///
    /// The result may be degenerate (a segment or a point).
    pub fn bbox(&self) -> Rect {
        match self {
            Self::Array(a) => a.bbox(),
            Self::Axis(a) => a.bbox(),
            Self::Ordinary(o) => o.bbox,
        }
    }

    /// Returns `true` if any offset lies inside `region`, boundary included.
    pub fn has_offset_in(&self, region: &Rect) -> bool {
        self.offsets_in(*region).next().is_some()
    }

    /// Lazily iterates over `(index, offset)` pairs for offsets inside `region`, in index order.
    ///
    /// Offsets outside the region are skipped without being visited where the
    /// repetition kind allows it.
    ///
    /// # Example
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// let rep = Repetition::array(1, 1000, Point::zero(), Point::new(10, 0));
    /// let hits: Vec<_> = rep.offsets_in(Rect::from_sides(95, -1, 120, 1)).collect();
    /// assert_eq!(hits, vec![(10, Point::new(100, 0)), (11, Point::new(110, 0)), (12, Point::new(120, 0))]);
    /// ```
    pub fn offsets_in(&self, region: Rect) -> OffsetsIn<'_> {
        let bbox = self.bbox();
        let inner = if self.is_empty() || !region.intersects(&bbox) {
            Inner::Empty
        } else if region.contains_rect(&bbox) {
            Inner::Range {
                rep: self,
                range: 0..self.len(),
            }
        } else {
            match self {
                Self::Array(a) => {
                    let rows = a.row_range(&region);
                    Inner::Array {
                        rep: a,
                        region,
                        row: rows.start,
                        rows_end: rows.end,
                        cols: 0..0,
                    }
                }
                Self::Axis(a) => Inner::Range {
                    rep: self,
                    range: a.index_range(&region),
                },
                Self::Ordinary(o) => {
                    let range = if o.sorted {
                        o.offsets.partition_point(|p| p.x < region.left())
                            ..o.offsets.partition_point(|p| p.x <= region.right())
                    } else {
                        0..o.offsets.len()
                    };
                    Inner::Filter {
                        offsets: &o.offsets,
                        region,
                        range,
                    }
                }
            }
        };
        OffsetsIn { inner }
    }

    /// The repetition with every offset mapped through the linear part of `trans`.
    ///
    /// Rotations by 90 or 270 degrees turn horizontal repetitions into vertical ones and vice versa.
    pub fn transformed_without_translation(&self, trans: &Transformation) -> Repetition {
        match self {
            Self::Array(a) => Self::Array(ArrayRepetition {
                rows: a.rows,
                cols: a.cols,
                row_offset: trans.apply_vector(a.row_offset),
                col_offset: trans.apply_vector(a.col_offset),
            }),
            Self::Axis(a) => {
                let dir = if trans.rotation().swaps_axes() {
                    a.dir.other()
                } else {
                    a.dir
                };
                let coords = a
                    .coords
                    .iter()
                    .map(|&c| {
                        trans
                            .apply_vector(Point::from_dir_coords(a.dir, c, 0))
                            .coord(dir)
                    })
                    .collect();
                Self::Axis(AxisRepetition::new(dir, coords))
            }
            Self::Ordinary(o) => {
                let mut out = OrdinaryRepetition::new(
                    o.offsets.iter().map(|p| trans.apply_vector(*p)).collect(),
                );
                if o.sorted {
                    out.sort();
                }
                Self::Ordinary(out)
            }
        }
    }
}

/// The integers `k` in `0..n` with `lo <= step * k <= hi`.
fn constrain(lo: i128, step: i128, hi: i128, n: usize) -> Range<usize> {
    let (kmin, kmax) = match step {
        0 if lo <= 0 && 0 <= hi => (0, n as i128 - 1),
        0 => return 0..0,
        s if s > 0 => (div_ceil(lo, s), div_floor(hi, s)),
        s => (div_ceil(hi, s), div_floor(lo, s)),
    };
    let start = kmin.max(0);
    let end = (kmax + 1).min(n as i128);
    if start >= end {
        0..0
    } else {
        start as usize..end as usize
    }
}

fn div_floor(a: i128, b: i128) -> i128 {
    let q = a / b;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

fn div_ceil(a: i128, b: i128) -> i128 {
    let q = a / b;
    if a % b != 0 && ((a < 0) == (b < 0)) {
        q + 1
    } else {
        q
    }
}

/// Iterator over the offsets of a [`Repetition`] that fall inside a region.
///
/// Created by [`Repetition::offsets_in`].
#[derive(Debug, Clone)]
pub struct OffsetsIn<'a> {
    inner: Inner<'a>,
}

impl OffsetsIn<'_> {
    /// An iterator that yields nothing.
    pub fn empty() -> Self {
        Self { inner: Inner::Empty }
    }
}

#[derive(Debug, Clone)]
enum Inner<'a> {
    Empty,
    Range {
        rep: &'a Repetition,
        range: Range<usize>,
    },
    Array {
        rep: &'a ArrayRepetition,
        region: Rect,
        row: usize,
        rows_end: usize,
        cols: Range<usize>,
    },
    Filter {
        offsets: &'a [Point],
        region: Rect,
        range: Range<usize>,
    },
}

impl Iterator for OffsetsIn<'_> {
    type Item = (usize, Point);

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            Inner::Empty => None,
            Inner::Range { rep, range } => range.next().map(|i| (i, rep.offset(i))),
            Inner::Array {
                rep,
                region,
                row,
                rows_end,
                cols,
            } => loop {
                if let Some(j) = cols.next() {
                    // `row` has already advanced past the row being emitted.
                    let i = *row - 1;
                    return Some((i * rep.cols as usize + j, rep.at(i, j)));
                }
                if *row >= *rows_end {
                    return None;
                }
                *cols = rep.col_range(*row, region);
                *row += 1;
            },
            Inner::Filter {
                offsets,
                region,
                range,
            } => range
                .by_ref()
                .map(|i| (i, offsets[i]))
                .find(|(_, p)| region.contains_point(*p)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Rotation;

    fn brute_force(rep: &Repetition, region: Rect) -> Vec<(usize, Point)> {
        rep.offsets()
            .enumerate()
            .filter(|(_, p)| region.contains_point(*p))
            .collect()
    }

    fn regions() -> Vec<Rect> {
        let mut out = Vec::new();
        for l in [-35, -7, 0, 13, 40] {
            for b in [-50, -3, 0, 22] {
                for (w, h) in [(0, 0), (5, 5), (17, 60), (100, 3), (200, 200)] {
                    out.push(Rect::from_sides(l, b, l + w, b + h));
                }
            }
        }
        out
    }

    #[test]
    fn array_region_queries_match_brute_force() {
        let reps = [
            Repetition::array(4, 5, Point::new(0, 10), Point::new(7, 0)),
            Repetition::array(4, 5, Point::new(3, 11), Point::new(7, -2)),
            Repetition::array(6, 3, Point::new(-5, 4), Point::new(0, -9)),
            Repetition::array(3, 4, Point::new(4, 0), Point::new(-6, 0)),
            Repetition::array(5, 5, Point::new(2, 2), Point::new(4, 4)),
        ];
        for rep in &reps {
            for region in regions() {
                let fast: Vec<_> = rep.offsets_in(region).collect();
                assert_eq!(fast, brute_force(rep, region), "{rep:?} in {region:?}");
            }
        }
    }

    #[test]
    fn axis_and_ordinary_region_queries_match_brute_force() {
        let mut sorted = OrdinaryRepetition::new(vec![
            Point::new(3, 4),
            Point::new(-20, 1),
            Point::new(3, -8),
            Point::new(15, 15),
            Point::new(0, 0),
        ]);
        sorted.sort();
        let reps = [
            Repetition::horizontal(vec![0, 5, 5, 12, 30, 31]),
            Repetition::vertical(vec![40, 20, 10, 0, -10]),
            Repetition::ordinary(vec![Point::new(3, 4), Point::new(-20, 1), Point::new(15, 15)]),
            Repetition::Ordinary(sorted),
        ];
        for rep in &reps {
            for region in regions() {
                let fast: Vec<_> = rep.offsets_in(region).collect();
                assert_eq!(fast, brute_force(rep, region), "{rep:?} in {region:?}");
            }
        }
    }

    #[test]
    fn unsorted_axis_coords_are_sorted() {
        let rep = AxisRepetition::horizontal(vec![5, 1, 9]);
        assert_eq!(rep.coords(), &[1, 5, 9]);
    }

    #[test]
    fn huge_array_query_is_sublinear() {
        let rep = Repetition::array(100_000, 100_000, Point::new(0, 10), Point::new(10, 0));
        assert_eq!(rep.len(), 10_000_000_000);
        let hits: Vec<_> = rep
            .offsets_in(Rect::from_sides(500_000, 500_000, 500_010, 500_010))
            .collect();
        assert_eq!(hits.len(), 4);
        assert_eq!(hits[0], (50_000 * 100_000 + 50_000, Point::new(500_000, 500_000)));
    }

    #[test]
    fn rotation_swaps_axis_repetitions() {
        let rep = Repetition::horizontal(vec![0, 10, 20]);
        let rotated = rep.transformed_without_translation(&Transformation::rotate(Rotation::R90));
        assert_eq!(rotated, Repetition::vertical(vec![0, 10, 20]));
        let flipped = rep.transformed_without_translation(&Transformation::rotate(Rotation::R180));
        assert_eq!(flipped, Repetition::horizontal(vec![0, -10, -20]));
        assert_eq!(flipped.bbox(), Rect::from_sides(-20, 0, 0, 0));
    }

    #[test]
    fn transformed_array_matches_transformed_offsets() {
        let rep = Repetition::array(3, 4, Point::new(1, 10), Point::new(7, -2));
        let trans = Transformation::builder()
            .rotation(Rotation::R270)
            .reflect_vert(true)
            .mag(2.)
            .build();
        let out = rep.transformed_without_translation(&trans);
        for (a, b) in rep.offsets().zip(out.offsets()) {
            assert_eq!(trans.apply_vector(a), b);
        }
    }
}
