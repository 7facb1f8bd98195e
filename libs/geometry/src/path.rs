//! Wire paths with a width and end extensions.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::bbox::Bbox;
use crate::point::Point;
use crate::polygon::Polygon;
use crate::rect::Rect;
use crate::transform::{TransformMut, Transformation, TranslateMut};

/// A path: a center line of points swept by a given width.
///
/// The first and last points are extended along the path direction by
/// `begin_extend` and `end_extend`. Interior corners use miter joins, falling
/// back to bevel joins on turns sharper than 90 degrees.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Path {
    points: Vec<Point>,
    width: i32,
    begin_extend: i32,
    end_extend: i32,
    #[serde(skip)]
    outline: OnceLock<Polygon>,
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.points == other.points
            && self.width == other.width
            && self.begin_extend == other.begin_extend
            && self.end_extend == other.end_extend
    }
}

impl Eq for Path {}

impl Path {
    /// Creates a new path. Consecutive duplicate points are dropped.
    ///
    /// # Example
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// let path = Path::new(vec![Point::new(0, 0), Point::new(0, 0), Point::new(100, 0)], 10, 0, 0);
    /// assert_eq!(path.points().len(), 2);
    /// assert_eq!(path.bbox(), Rect::from_sides(0, -5, 100, 5));
    /// ```
    pub fn new(mut points: Vec<Point>, width: i32, begin_extend: i32, end_extend: i32) -> Self {
        points.dedup();
        Self {
            points,
            width,
            begin_extend,
            end_extend,
            outline: OnceLock::new(),
        }
    }

    /// The center line points.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// The path width.
    pub fn width(&self) -> i32 {
        self.width
    }

    /// The extension before the first point.
    pub fn begin_extend(&self) -> i32 {
        self.begin_extend
    }

    /// The extension after the last point.
    pub fn end_extend(&self) -> i32 {
        self.end_extend
    }

    /// Returns `true` if the path covers no area.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
            || self.width <= 1
            || (self.points.len() == 1 && self.begin_extend == 0 && self.end_extend == 0)
    }

    /// The outline polygon of the path. Computed once and cached.
    pub fn to_polygon(&self) -> &Polygon {
        self.outline.get_or_init(|| self.outline())
    }

    /// The enclosed area of the outline.
    pub fn area(&self) -> f64 {
        self.to_polygon().area()
    }

    fn outline(&self) -> Polygon {
        if self.is_empty() {
            return Polygon::default();
        }
        let hw = (self.width / 2) as f64;
        if let [p] = self.points[..] {
            return Polygon::from_rect(Rect::from_sides(
                p.x.saturating_sub(self.begin_extend),
                p.y.saturating_sub(self.width / 2),
                p.x.saturating_add(self.end_extend),
                p.y.saturating_add(self.width / 2),
            ));
        }

        let mut pts: Vec<[f64; 2]> = self
            .points
            .iter()
            .map(|p| [p.x as f64, p.y as f64])
            .collect();
        let n = pts.len();
        let d0 = unit(pts[0], pts[1]);
        pts[0] = [
            pts[0][0] - d0[0] * self.begin_extend as f64,
            pts[0][1] - d0[1] * self.begin_extend as f64,
        ];
        let dn = unit(pts[n - 2], pts[n - 1]);
        pts[n - 1] = [
            pts[n - 1][0] + dn[0] * self.end_extend as f64,
            pts[n - 1][1] + dn[1] * self.end_extend as f64,
        ];

        let normals: Vec<[f64; 2]> = pts
            .windows(2)
            .map(|w| {
                let d = unit(w[0], w[1]);
                [-d[1], d[0]]
            })
            .collect();

        let mut left = Vec::with_capacity(2 * n);
        let mut right = Vec::with_capacity(2 * n);
        for (i, p) in pts.iter().enumerate() {
            let n_in = normals[i.saturating_sub(1)];
            let n_out = normals[i.min(normals.len() - 1)];
            side_points(*p, n_in, n_out, hw, &mut left);
            side_points(*p, n_in, n_out, -hw, &mut right);
        }
        right.reverse();
        left.extend(right);
        Polygon::from_verts(
            left.into_iter()
                .map(|[x, y]| Point::new(x.round() as i32, y.round() as i32))
                .collect(),
        )
    }
}

fn unit(a: [f64; 2], b: [f64; 2]) -> [f64; 2] {
    let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
    let len = dx.hypot(dy);
    if len == 0. {
        [0., 0.]
    } else {
        [dx / len, dy / len]
    }
}

/// Pushes the offset point(s) of vertex `p` at signed distance `hw` along the normals.
fn side_points(p: [f64; 2], n1: [f64; 2], n2: [f64; 2], hw: f64, out: &mut Vec<[f64; 2]>) {
    let dot = n1[0] * n2[0] + n1[1] * n2[1];
    if dot < 0. {
        out.push([p[0] + n1[0] * hw, p[1] + n1[1] * hw]);
        out.push([p[0] + n2[0] * hw, p[1] + n2[1] * hw]);
    } else {
        let k = hw / (1. + dot);
        out.push([p[0] + (n1[0] + n2[0]) * k, p[1] + (n1[1] + n2[1]) * k]);
    }
}

impl Bbox for Path {
    fn bbox(&self) -> Rect {
        self.to_polygon().bbox()
    }
}

impl TranslateMut for Path {
    fn translate_mut(&mut self, p: Point) {
        self.points.translate_mut(p);
        self.outline = OnceLock::new();
    }
}

impl TransformMut for Path {
    fn transform_mut(&mut self, trans: Transformation) {
        self.points.transform_mut(trans);
        self.points.dedup();
        self.width = trans.scale(self.width);
        self.begin_extend = trans.scale(self.begin_extend);
        self.end_extend = trans.scale(self.end_extend);
        self.outline = OnceLock::new();
    }
}
