//! Integer coordinate polygons.

use serde::{Deserialize, Serialize};

use crate::bbox::Bbox;
use crate::point::Point;
use crate::rect::Rect;
use crate::transform::{TransformMut, Transformation, TranslateMut};

/// The angle class of a polygon's edges.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ManhattanKind {
    /// Every edge is horizontal or vertical.
    Manhattan,
    /// Every edge is horizontal, vertical or diagonal at 45 degrees.
    Octangular,
    /// At least one edge has an arbitrary angle.
    AnyAngle,
}

/// A simple polygon, given by its vertex ring.
///
/// The ring is implicitly closed. Construction normalizes the ring by removing
/// consecutive duplicate vertices and collinear vertices; a ring with fewer
/// than 3 remaining vertices becomes the empty polygon.
#[derive(Debug, Default, Clone, Hash, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Polygon {
    /// Vector of points that make up the polygon.
    points: Vec<Point>,
}

impl Polygon {
    /// Creates a polygon with given vertices.
    ///
    /// # Example
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// let polygon = Polygon::from_verts(vec![
    ///     Point::new(0, 0),
    ///     Point::new(5, 0),
    ///     Point::new(10, 0),
    ///     Point::new(10, 10),
    ///     Point::new(10, 10),
    ///     Point::new(0, 10),
    /// ]);
    /// assert_eq!(polygon.points().len(), 4);
    ///
    /// let line = Polygon::from_verts(vec![Point::new(0, 0), Point::new(5, 5), Point::new(10, 10)]);
    /// assert!(line.is_empty());
    /// ```
    pub fn from_verts(vec: Vec<Point>) -> Self {
        Self {
            points: normalize(vec),
        }
    }

    /// Creates the 4-vertex polygon covering `rect`, or the empty polygon if `rect` is empty.
    pub fn from_rect(rect: Rect) -> Self {
        if rect.is_empty() {
            return Self::default();
        }
        let (ll, ur) = (rect.lower_left(), rect.upper_right());
        Self {
            points: vec![ll, Point::new(ur.x, ll.y), ur, Point::new(ll.x, ur.y)],
        }
    }

    /// Returns the vertex ring.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Returns `true` if the polygon has no vertices.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The enclosed area, computed with the shoelace formula.
    ///
    /// # Example
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// let triangle = Polygon::from_verts(vec![Point::new(0, 0), Point::new(4, 0), Point::new(0, 3)]);
    /// assert_eq!(triangle.area(), 6.);
    /// ```
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        let twice: i128 = (0..n)
            .map(|i| self.points[i].cross(self.points[(i + 1) % n]) as i128)
            .sum();
        twice.abs() as f64 / 2.
    }

    /// Classifies the polygon's edge angles.
    pub fn manhattan_kind(&self) -> ManhattanKind {
        let n = self.points.len();
        let mut kind = ManhattanKind::Manhattan;
        for i in 0..n {
            let d = self.points[(i + 1) % n] - self.points[i];
            if d.x == 0 || d.y == 0 {
                continue;
            }
            if d.x.unsigned_abs() == d.y.unsigned_abs() {
                kind = ManhattanKind::Octangular;
            } else {
                return ManhattanKind::AnyAngle;
            }
        }
        kind
    }

    /// Returns `true` if every edge is axis-aligned.
    pub fn is_manhattan(&self) -> bool {
        self.manhattan_kind() == ManhattanKind::Manhattan
    }
}

/// Removes consecutive duplicates and collinear vertices, including across the ring wrap.
fn normalize(points: Vec<Point>) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for p in points {
        push_vertex(&mut out, p);
    }
    // Close the ring: the first vertices may be collinear with the last ones.
    loop {
        if out.len() < 3 {
            return Vec::new();
        }
        let n = out.len();
        if out[n - 1] == out[0] {
            out.pop();
        } else if is_collinear(out[n - 2], out[n - 1], out[0]) {
            out.pop();
        } else if is_collinear(out[n - 1], out[0], out[1]) {
            out.remove(0);
        } else {
            return out;
        }
    }
}

fn push_vertex(out: &mut Vec<Point>, p: Point) {
    if out.last() == Some(&p) {
        return;
    }
    while out.len() >= 2 && is_collinear(out[out.len() - 2], out[out.len() - 1], p) {
        out.pop();
        if out.last() == Some(&p) {
            return;
        }
    }
    out.push(p);
}

#[inline]
fn is_collinear(a: Point, b: Point, c: Point) -> bool {
    (b - a).cross(c - b) == 0
}

impl Bbox for Polygon {
    fn bbox(&self) -> Rect {
        let Some(first) = self.points.first() else {
            return Rect::EMPTY;
        };
        let (mut ll, mut ur) = (*first, *first);
        for p in &self.points[1..] {
            ll = Point::new(ll.x.min(p.x), ll.y.min(p.y));
            ur = Point::new(ur.x.max(p.x), ur.y.max(p.y));
        }
        Rect::new(ll, ur)
    }
}

impl TranslateMut for Polygon {
    fn translate_mut(&mut self, p: Point) {
        self.points.translate_mut(p);
    }
}

impl TransformMut for Polygon {
    fn transform_mut(&mut self, trans: Transformation) {
        let points = std::mem::take(&mut self.points);
        self.points = normalize(points.into_iter().map(|p| trans.apply(p)).collect());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{Rotation, Transform};

    #[test]
    fn collinear_vertices_across_wrap_are_removed() {
        let polygon = Polygon::from_verts(vec![
            Point::new(5, 0),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(0, 10),
            Point::new(0, 0),
        ]);
        assert_eq!(polygon.points().len(), 4);
        assert_eq!(polygon.bbox(), Rect::from_sides(0, 0, 10, 10));
        assert_eq!(polygon.area(), 100.);
    }

    #[test]
    fn backtracking_spike_is_removed() {
        let polygon = Polygon::from_verts(vec![
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(20, 0),
            Point::new(10, 0),
            Point::new(10, 10),
        ]);
        assert_eq!(
            polygon.points(),
            &[Point::new(0, 0), Point::new(10, 0), Point::new(10, 10)]
        );
    }

    #[test]
    fn degenerate_polygons_are_empty() {
        assert!(Polygon::from_verts(vec![]).is_empty());
        assert!(Polygon::from_verts(vec![Point::new(1, 1); 5]).is_empty());
        assert!(Polygon::from_verts(vec![]).bbox().is_empty());
        assert_eq!(Polygon::from_verts(vec![]).area(), 0.);
    }

    #[test]
    fn manhattan_classification() {
        let rect = Polygon::from_rect(Rect::from_sides(0, 0, 5, 5));
        assert_eq!(rect.manhattan_kind(), ManhattanKind::Manhattan);
        let octagon_piece = Polygon::from_verts(vec![
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 5),
            Point::new(5, 10),
            Point::new(0, 10),
        ]);
        assert_eq!(octagon_piece.manhattan_kind(), ManhattanKind::Octangular);
        let any = Polygon::from_verts(vec![Point::new(0, 0), Point::new(10, 0), Point::new(3, 7)]);
        assert_eq!(any.manhattan_kind(), ManhattanKind::AnyAngle);
    }

    #[test]
    fn transform_preserves_area() {
        let polygon = Polygon::from_verts(vec![Point::new(0, 0), Point::new(4, 0), Point::new(0, 3)]);
        let moved = polygon.clone().transform(
            Transformation::builder()
                .point(Point::new(100, 0))
                .rotation(Rotation::R90)
                .reflect_vert(true)
                .build(),
        );
        assert_eq!(moved.area(), polygon.area());
        assert_eq!(moved.bbox(), Rect::from_sides(100, 0, 103, 4));
    }
}
