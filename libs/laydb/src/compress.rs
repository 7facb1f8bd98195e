//! Repetition discovery for flat shape lists.
//!
//! Shapes that are translated copies of each other are grouped, and their
//! offsets are folded into array, axis or ordinary repetitions.

use std::collections::{BTreeMap, HashSet};

use geometry::prelude::*;
use geometry::repetition::OrdinaryRepetition;

use crate::shape_rep::ShapeRepetition;
use crate::shapes::Shapes;

/// Lines shorter than this stay as an ordinary repetition in the vector pass.
const MIN_LINE_LEN: usize = 16;
/// Single-row arrays shorter than this are expanded back into loose offsets.
const MIN_ARRAY_LEN: u32 = 5;

/// How aggressively a group of offsets is compressed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CompressAlgo {
    None,
    /// Axis and ordinary repetitions.
    Vector,
    /// Array repetitions first, then the vector pass on what is left.
    Array,
}

impl CompressAlgo {
    pub fn for_rects(level: u32) -> Self {
        match level {
            0 => Self::None,
            1 => Self::Vector,
            _ => Self::Array,
        }
    }

    pub fn for_polygons(level: u32) -> Self {
        match level {
            0..=2 => Self::None,
            3 => Self::Vector,
            _ => Self::Array,
        }
    }
}

/// A group of offsets of one base shape.
#[derive(Debug, Default)]
pub(crate) struct Compressor {
    vectors: Vec<Point>,
    x_first: bool,
}

/// The result of compressing one group: repetitions with their base offsets, and loose offsets.
pub(crate) struct Compressed {
    pub(crate) reps: Vec<(Point, Repetition)>,
    pub(crate) loose: Vec<Point>,
}

impl Compressor {
    pub(crate) fn new(vectors: Vec<Point>) -> Self {
        let xs: HashSet<i32> = vectors.iter().map(|v| v.x).collect();
        let ys: HashSet<i32> = vectors.iter().map(|v| v.y).collect();
        let mut out = Self {
            x_first: xs.len() > ys.len(),
            vectors,
        };
        out.sort();
        out
    }

    fn sort(&mut self) {
        cluster_sort(&mut self.vectors, self.x_first);
    }

    pub(crate) fn compress(mut self, algo: CompressAlgo) -> Compressed {
        let mut reps = Vec::new();
        match algo {
            CompressAlgo::None => {}
            CompressAlgo::Vector => self.vector_pass(&mut reps),
            CompressAlgo::Array => {
                self.array_pass(&mut reps);
                self.sort();
                self.vector_pass(&mut reps);
            }
        }
        Compressed {
            reps,
            loose: self.vectors,
        }
    }

    fn array_pass(&mut self, reps: &mut Vec<(Point, Repetition)>) {
        // (count, step) of a line run -> base offsets of every run with that shape.
        let mut lines: BTreeMap<(u32, Point), Vec<Point>> = BTreeMap::new();
        let mut loose = Vec::new();
        for line in split_lines(&self.vectors, self.x_first) {
            split_runs(line, &mut loose, |base, n, step| {
                lines.entry((n, step)).or_default().push(base)
            });
        }
        self.vectors = loose;

        for pass in [1, 0] {
            let x_array = self.x_first == (pass == 0);
            for (&(cols, col_offset), bases) in lines.iter_mut() {
                cluster_sort(bases, x_array);
                let mut kept = Vec::new();
                for line in split_lines(&bases[..], x_array) {
                    split_runs(line, &mut kept, |base, rows, row_offset| {
                        reps.push((
                            base,
                            Repetition::array(rows, cols, row_offset, col_offset),
                        ))
                    });
                }
                *bases = kept;
            }
        }

        for ((n, step), bases) in lines {
            for base in bases {
                if n < MIN_ARRAY_LEN {
                    self.vectors
                        .extend((0..n as i64).map(|i| base + step * i));
                } else {
                    reps.push((base, Repetition::array(1, n, Point::zero(), step)));
                }
            }
        }
    }

    fn vector_pass(&mut self, reps: &mut Vec<(Point, Repetition)>) {
        if self.vectors.len() <= 1 {
            return;
        }
        let mut loose = Vec::new();
        for line in split_lines(&self.vectors, self.x_first) {
            if line.len() < MIN_LINE_LEN {
                loose.extend_from_slice(line);
                continue;
            }
            let mut line = line.to_vec();
            // Every point of a line shares one coordinate, so (y, x) order sorts along it.
            cluster_sort(&mut line, true);
            let base = line[0];
            let rep = if self.x_first {
                Repetition::horizontal(line.iter().map(|p| (*p - base).x).collect())
            } else {
                Repetition::vertical(line.iter().map(|p| (*p - base).y).collect())
            };
            reps.push((base, rep));
        }
        self.vectors = loose;

        if self.vectors.len() <= 1 {
            return;
        }
        let base = self.vectors[0];
        let mut rep =
            OrdinaryRepetition::new(self.vectors.drain(..).map(|v| v - base).collect());
        rep.sort();
        reps.push((base, Repetition::Ordinary(rep)));
    }
}

/// Returns `true` if the difference of any two of `points` fits in an [`i32`].
///
/// Offsets and steps of a group are differences of its points, so a group
/// failing this test cannot be folded without saturating.
fn span_fits(points: &[Point]) -> bool {
    let limit = i64::from(i32::MAX);
    let span = |coord: fn(&Point) -> i32| {
        let (min, max) = points.iter().map(coord).fold((i32::MAX, i32::MIN), |(lo, hi), c| {
            (lo.min(c), hi.max(c))
        });
        i64::from(max) - i64::from(min)
    };
    points.is_empty() || (span(|p| p.x) <= limit && span(|p| p.y) <= limit)
}

/// Sorts by `(y, x)` when `x_first`, otherwise by `(x, y)`.
fn cluster_sort(v: &mut [Point], x_first: bool) {
    if x_first {
        v.sort_unstable_by_key(|p| (p.y, p.x));
    } else {
        v.sort_unstable_by_key(|p| (p.x, p.y));
    }
}

/// Splits sorted offsets into maximal lines sharing y (when `x_first`) or x.
fn split_lines(v: &[Point], x_first: bool) -> impl Iterator<Item = &[Point]> {
    v.chunk_by(move |a, b| {
        if x_first {
            a.y == b.y
        } else {
            a.x == b.x
        }
    })
}

/// Emits every equal-step run of at least 3 points as `(base, count, step)`.
///
/// Points not covered by such a run are pushed to `loose`.
fn split_runs(line: &[Point], loose: &mut Vec<Point>, mut emit: impl FnMut(Point, u32, Point)) {
    let mut i = 0;
    while i < line.len() {
        if i + 1 == line.len() {
            loose.push(line[i]);
            return;
        }
        let step = line[i + 1] - line[i];
        let mut n = 2;
        while i + n < line.len() && line[i + n] - line[i + n - 1] == step {
            n += 1;
        }
        if n == 2 {
            loose.push(line[i]);
            i += 1;
        } else {
            emit(line[i], n as u32, step);
            i += n;
        }
    }
}

impl Shapes {
    /// Folds translated copies of rectangles and polygons into repetitions.
    ///
    /// `level` 0 leaves everything alone; 1 uses axis and ordinary repetitions
    /// for rectangles; 2 adds array repetitions for rectangles; 3 and 4 do the
    /// same for polygons. Existing repetitions, paths and texts are untouched.
    pub fn compress(&mut self, level: u32) {
        let rect_algo = CompressAlgo::for_rects(level);
        let polygon_algo = CompressAlgo::for_polygons(level);
        if rect_algo != CompressAlgo::None && !self.rects.is_empty() {
            self.compress_rects(rect_algo);
        }
        if polygon_algo != CompressAlgo::None && !self.polygons.is_empty() {
            self.compress_polygons(polygon_algo);
        }
    }

    fn compress_rects(&mut self, algo: CompressAlgo) {
        let mut groups: BTreeMap<Point, Vec<Point>> = BTreeMap::new();
        let mut loose = Vec::new();
        for rect in std::mem::take(&mut self.rects) {
            if !span_fits(&[rect.lower_left(), rect.upper_right()]) {
                loose.push(rect);
                continue;
            }
            groups
                .entry(rect.upper_right() - rect.lower_left())
                .or_default()
                .push(rect.lower_left());
        }
        let make = |offset: Point, diag: Point| Rect::new(offset, offset + diag);
        let before = self.rect_reps.len();
        self.rects = loose;
        for (diag, offsets) in groups {
            if offsets.len() == 1 || !span_fits(&offsets) {
                self.rects
                    .extend(offsets.into_iter().map(|offset| make(offset, diag)));
                continue;
            }
            let out = Compressor::new(offsets).compress(algo);
            for (base, rep) in out.reps {
                self.rect_reps
                    .push(ShapeRepetition::new(make(base, diag), rep));
            }
            self.rects
                .extend(out.loose.into_iter().map(|offset| make(offset, diag)));
        }
        tracing::debug!(
            repetitions = self.rect_reps.len() - before,
            loose = self.rects.len(),
            "compressed rectangles"
        );
        self.invalidate();
    }

    fn compress_polygons(&mut self, algo: CompressAlgo) {
        let mut groups: BTreeMap<Polygon, Vec<Point>> = BTreeMap::new();
        let mut loose = Vec::new();
        for polygon in std::mem::take(&mut self.polygons) {
            let Some(&offset) = polygon.points().first() else {
                continue;
            };
            // The first vertex is negated below.
            if !span_fits(polygon.points()) || offset.x == i32::MIN || offset.y == i32::MIN {
                loose.push(polygon);
                continue;
            }
            groups
                .entry(polygon.translate(-offset))
                .or_default()
                .push(offset);
        }
        let before = self.polygon_reps.len();
        self.polygons = loose;
        for (base_polygon, offsets) in groups {
            if offsets.len() == 1 || !span_fits(&offsets) {
                self.polygons.extend(
                    offsets
                        .into_iter()
                        .map(|offset| base_polygon.clone().translate(offset)),
                );
                continue;
            }
            let out = Compressor::new(offsets).compress(algo);
            for (base, rep) in out.reps {
                self.polygon_reps.push(ShapeRepetition::new(
                    base_polygon.clone().translate(base),
                    rep,
                ));
            }
            self.polygons.extend(
                out.loose
                    .into_iter()
                    .map(|offset| base_polygon.clone().translate(offset)),
            );
        }
        tracing::debug!(
            repetitions = self.polygon_reps.len() - before,
            loose = self.polygons.len(),
            "compressed polygons"
        );
        self.invalidate();
    }

    /// Expands every repetition back into individual rectangles and polygons.
    pub fn decompress(&mut self) {
        for rep in std::mem::take(&mut self.rect_reps) {
            self.rects.extend(rep.shapes());
        }
        for rep in std::mem::take(&mut self.polygon_reps) {
            self.polygons.extend(rep.shapes());
        }
        self.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn sorted_rects(shapes: &Shapes) -> Vec<Rect> {
        let mut out: Vec<Rect> = shapes.rects().to_vec();
        for rep in shapes.rect_reps() {
            out.extend(rep.shapes());
        }
        out.sort();
        out
    }

    #[test]
    fn long_row_becomes_single_array() {
        let mut shapes = Shapes::new();
        for i in 0..10_000 {
            shapes.insert(Rect::from_sides(10 * i, 0, 10 * i + 5, 5));
        }
        shapes.compress(2);
        assert!(shapes.rects().is_empty());
        assert_eq!(shapes.rect_reps().len(), 1);
        let rep = &shapes.rect_reps()[0];
        assert_eq!(rep.shape(), &Rect::from_sides(0, 0, 5, 5));
        assert_eq!(
            rep.repetition(),
            &Repetition::array(1, 10_000, Point::zero(), Point::new(10, 0))
        );
        assert_eq!(shapes.len(false), 10_000);
        assert_eq!(shapes.bbox(), Rect::from_sides(0, 0, 99_995, 5));
    }

    #[test]
    fn grid_becomes_two_dimensional_array() {
        let mut shapes = Shapes::new();
        for row in 0..4 {
            for col in 0..6 {
                shapes.insert(Rect::from_sides(7 * col, 20 * row, 7 * col + 3, 20 * row + 3));
            }
        }
        let expected = sorted_rects(&shapes);
        shapes.compress(2);
        assert_eq!(shapes.rect_reps().len(), 1);
        assert_eq!(shapes.rect_reps()[0].len(), 24);
        assert_eq!(sorted_rects(&shapes), expected);
    }

    #[test]
    fn vector_pass_preserves_shapes() {
        let mut shapes = Shapes::new();
        for i in 0..20 {
            shapes.insert(Rect::from_sides(0, 3 * i * i, 2, 3 * i * i + 2));
        }
        shapes.insert(Rect::from_sides(50, 50, 52, 52));
        shapes.insert(Rect::from_sides(90, 13, 92, 15));
        shapes.insert(Rect::from_sides(0, 0, 9, 9));
        let expected = sorted_rects(&shapes);
        shapes.compress(1);
        assert_eq!(shapes.rects(), &[Rect::from_sides(0, 0, 9, 9)]);
        assert_eq!(shapes.rect_reps().len(), 2);
        assert_eq!(sorted_rects(&shapes), expected);
    }

    #[test]
    fn polygons_compress_at_higher_levels() {
        let tri = |x: i32| {
            Polygon::from_verts(vec![
                Point::new(x, 0),
                Point::new(x + 4, 0),
                Point::new(x, 4),
            ])
        };
        let mut shapes = Shapes::new();
        for i in 0..8 {
            shapes.insert(tri(10 * i));
        }
        shapes.compress(2);
        assert_eq!(shapes.polygons().len(), 8);
        shapes.compress(4);
        assert!(shapes.polygons().is_empty());
        assert_eq!(shapes.polygon_reps().len(), 1);
        assert_eq!(shapes.len(false), 8);

        shapes.decompress();
        assert!(shapes.polygon_reps().is_empty());
        let mut polys = shapes.polygons().to_vec();
        polys.sort();
        let mut expected: Vec<_> = (0..8).map(tri).collect();
        expected.sort();
        assert_eq!(polys, expected);
    }

    #[test]
    fn offsets_wider_than_i32_stay_loose() {
        let mut shapes = Shapes::new();
        shapes.insert(Rect::from_sides(-2_000_000_000, 0, -1_999_999_990, 10));
        shapes.insert(Rect::from_sides(2_000_000_000, 0, 2_000_000_010, 10));
        let expected = sorted_rects(&shapes);
        shapes.compress(1);
        assert!(shapes.rect_reps().is_empty());
        assert_eq!(sorted_rects(&shapes), expected);
    }

    #[test]
    fn wide_rows_survive_every_level() {
        let step = 250_000_000;
        let mut shapes = Shapes::new();
        for i in -8..8 {
            shapes.insert(Rect::from_sides(step * i, 0, step * i + 5, 5));
        }
        shapes.insert(Rect::from_sides(i32::MIN, -5, i32::MAX, 5));
        let expected = sorted_rects(&shapes);
        for level in 1..=4 {
            let mut compressed = shapes.clone();
            compressed.compress(level);
            assert_eq!(sorted_rects(&compressed), expected);
            compressed.decompress();
            let mut rects = compressed.rects().to_vec();
            rects.sort();
            assert_eq!(rects, expected);
        }
    }

    #[test]
    fn narrow_groups_still_fold_next_to_wide_ones() {
        let mut shapes = Shapes::new();
        for i in 0..8 {
            shapes.insert(Rect::from_sides(10 * i, 0, 10 * i + 5, 5));
        }
        shapes.insert(Rect::from_sides(-2_000_000_000, 0, 2_000_000_000, 5));
        let expected = sorted_rects(&shapes);
        shapes.compress(2);
        assert_eq!(shapes.rect_reps().len(), 1);
        assert_eq!(shapes.rects().len(), 1);
        assert_eq!(sorted_rects(&shapes), expected);
    }

    #[test]
    fn short_runs_stay_loose() {
        let compressed = Compressor::new(vec![
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(20, 0),
        ])
        .compress(CompressAlgo::Array);
        // A 3-long single row is below the array threshold and falls through to the vector pass.
        assert_eq!(compressed.reps.len(), 1);
        assert!(matches!(compressed.reps[0].1, Repetition::Ordinary(_)));
        assert!(compressed.loose.is_empty());
    }
}
