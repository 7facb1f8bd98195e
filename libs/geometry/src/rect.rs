//! Axis-aligned rectangles.

use serde::{Deserialize, Serialize};

use crate::bbox::Bbox;
use crate::dir::Dir;
use crate::intersect::Intersect;
use crate::point::Point;
use crate::transform::{TransformMut, Transformation, TranslateMut};

/// An axis-aligned rectangle, specified by lower-left and upper-right corners.
///
/// Corners are always stored in canonical order (`p0 <= p1` on both axes).
/// A rectangle with zero width or zero height is *empty*; [`Rect::default`]
/// (all coordinates zero) is the canonical empty rectangle and is what every
/// bounding box computation returns when there is nothing to bound.
#[derive(
    Debug, Default, Copy, Clone, Hash, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord,
)]
pub struct Rect {
    /// The lower-left corner.
    p0: Point,
    /// The upper-right corner.
    p1: Point,
}

impl Rect {
    /// The canonical empty rectangle.
    pub const EMPTY: Rect = Rect {
        p0: Point::zero(),
        p1: Point::zero(),
    };

    /// Creates a new rectangle from the given opposite corner points.
    ///
    /// # Example
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// let rect = Rect::new(Point::new(30, 20), Point::new(15, 40));
    /// assert_eq!(rect.left(), 15);
    /// assert_eq!(rect.bot(), 20);
    /// assert_eq!(rect.right(), 30);
    /// assert_eq!(rect.top(), 40);
    /// ```
    #[inline]
    pub fn new(p0: Point, p1: Point) -> Self {
        Self {
            p0: Point::new(p0.x.min(p1.x), p0.y.min(p1.y)),
            p1: Point::new(p0.x.max(p1.x), p0.y.max(p1.y)),
        }
    }

    /// Creates a rectangle from all 4 sides (left, bottom, right, top).
    ///
    /// Sides given out of order are swapped.
    ///
    /// # Example
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// let rect = Rect::from_sides(15, 20, 30, 40);
    /// assert_eq!(rect.left(), 15);
    /// assert_eq!(rect.bot(), 20);
    /// assert_eq!(rect.right(), 30);
    /// assert_eq!(rect.top(), 40);
    /// ```
    #[inline]
    pub fn from_sides(left: i32, bot: i32, right: i32, top: i32) -> Self {
        Self::new(Point::new(left, bot), Point::new(right, top))
    }

    /// Creates a zero-area rectangle containing the given point.
    #[inline]
    pub const fn from_point(p: Point) -> Self {
        Self { p0: p, p1: p }
    }

    /// Creates a rectangle from the lower-left corner of `a` plus the lower-left corner of `b`
    /// to the upper-right corner of `a` plus the upper-right corner of `b`.
    ///
    /// This is the Minkowski sum of the two rectangles. Either operand may be degenerate.
    pub fn minkowski_sum(&self, other: &Rect) -> Rect {
        Rect::new(self.p0 + other.p0, self.p1 + other.p1)
    }

    /// Returns the bottom y-coordinate of the rectangle.
    #[inline]
    pub const fn bot(&self) -> i32 {
        self.p0.y
    }

    /// Returns the top y-coordinate of the rectangle.
    #[inline]
    pub const fn top(&self) -> i32 {
        self.p1.y
    }

    /// Returns the left x-coordinate of the rectangle.
    #[inline]
    pub const fn left(&self) -> i32 {
        self.p0.x
    }

    /// Returns the right x-coordinate of the rectangle.
    #[inline]
    pub const fn right(&self) -> i32 {
        self.p1.x
    }

    /// Returns the lower-left corner.
    #[inline]
    pub const fn lower_left(&self) -> Point {
        self.p0
    }

    /// Returns the upper-right corner.
    #[inline]
    pub const fn upper_right(&self) -> Point {
        self.p1
    }

    /// Returns the horizontal width of the rectangle.
    #[inline]
    pub const fn width(&self) -> i64 {
        self.p1.x as i64 - self.p0.x as i64
    }

    /// Returns the vertical height of the rectangle.
    #[inline]
    pub const fn height(&self) -> i64 {
        self.p1.y as i64 - self.p0.y as i64
    }

    /// Returns the length of the rectangle along `dir`.
    pub const fn length(&self, dir: Dir) -> i64 {
        match dir {
            Dir::Horiz => self.width(),
            Dir::Vert => self.height(),
        }
    }

    /// Returns the area of the rectangle.
    #[inline]
    pub const fn area(&self) -> i64 {
        self.width() * self.height()
    }

    /// Returns the center point of the rectangle, rounded down.
    pub fn center(&self) -> Point {
        Point::saturating_from_i64(
            (self.p0.x as i64 + self.p1.x as i64).div_euclid(2),
            (self.p0.y as i64 + self.p1.y as i64).div_euclid(2),
        )
    }

    /// Returns `true` if the rectangle has no area.
    ///
    /// # Example
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// assert!(Rect::default().is_empty());
    /// assert!(Rect::from_sides(0, 0, 0, 10).is_empty());
    /// assert!(!Rect::from_sides(0, 0, 1, 1).is_empty());
    /// ```
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.p0.x >= self.p1.x || self.p0.y >= self.p1.y
    }

    /// Returns the smallest rectangle containing both `self` and `other`.
    ///
    /// Empty operands do not contribute to the result.
    ///
    /// # Example
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// let a = Rect::from_sides(0, 0, 10, 10);
    /// let b = Rect::from_sides(20, -5, 30, 5);
    /// assert_eq!(a.union(b), Rect::from_sides(0, -5, 30, 10));
    /// assert_eq!(a.union(Rect::default()), a);
    /// ```
    pub fn union(self, other: Rect) -> Rect {
        if other.is_empty() {
            return self;
        }
        if self.is_empty() {
            return other;
        }
        Rect {
            p0: Point::new(self.p0.x.min(other.p0.x), self.p0.y.min(other.p0.y)),
            p1: Point::new(self.p1.x.max(other.p1.x), self.p1.y.max(other.p1.y)),
        }
    }

    /// Returns `true` if the closed rectangles `self` and `other` share at least one point.
    ///
    /// Touching edges and corners count as intersecting. The test is purely
    /// coordinate based, so degenerate rectangles (segments and points) participate.
    #[inline]
    pub const fn intersects(&self, other: &Rect) -> bool {
        !(self.p1.x < other.p0.x
            || other.p1.x < self.p0.x
            || self.p1.y < other.p0.y
            || other.p1.y < self.p0.y)
    }

    /// Returns `true` if `other` lies inside `self`, boundary included.
    #[inline]
    pub const fn contains_rect(&self, other: &Rect) -> bool {
        self.p0.x <= other.p0.x
            && self.p0.y <= other.p0.y
            && other.p1.x <= self.p1.x
            && other.p1.y <= self.p1.y
    }

    /// Returns `true` if `p` lies inside `self`, boundary included.
    #[inline]
    pub const fn contains_point(&self, p: Point) -> bool {
        self.p0.x <= p.x && p.x <= self.p1.x && self.p0.y <= p.y && p.y <= self.p1.y
    }

    /// Grows the rectangle by `amount` on every side.
    pub fn expand(&self, amount: i32) -> Rect {
        let d = Point::new(amount, amount);
        Rect::new(self.p0 - d, self.p1 + d)
    }
}

impl Intersect<Rect> for Rect {
    type Output = Rect;

    /// Computes the closed intersection of two rectangles.
    ///
    /// Returns [`None`] if the rectangles do not touch.
    fn intersect(&self, other: &Rect) -> Option<Self::Output> {
        if !self.intersects(other) {
            return None;
        }
        Some(Rect {
            p0: Point::new(self.p0.x.max(other.p0.x), self.p0.y.max(other.p0.y)),
            p1: Point::new(self.p1.x.min(other.p1.x), self.p1.y.min(other.p1.y)),
        })
    }
}

impl Bbox for Rect {
    fn bbox(&self) -> Rect {
        if self.is_empty() {
            Rect::EMPTY
        } else {
            *self
        }
    }
}

impl TranslateMut for Rect {
    fn translate_mut(&mut self, p: Point) {
        self.p0.translate_mut(p);
        self.p1.translate_mut(p);
    }
}

impl TransformMut for Rect {
    fn transform_mut(&mut self, trans: Transformation) {
        *self = Rect::new(trans.apply(self.p0), trans.apply(self.p1));
    }
}
