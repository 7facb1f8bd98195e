//! 2-D points.

use serde::{Deserialize, Serialize};

use crate::dir::Dir;
use crate::transform::{TransformMut, Transformation, TranslateMut};

/// A point in two-dimensional integer space.
///
/// Points double as offset vectors (for example, the basis vectors of an array
/// repetition). All arithmetic saturates at the bounds of [`i32`] instead of wrapping.
#[derive(
    Debug, Copy, Clone, Default, Hash, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord,
)]
pub struct Point {
    /// The x-coordinate of the point.
    pub x: i32,
    /// The y-coordinate of the point.
    pub y: i32,
}

impl Point {
    /// Creates a new [`Point`] from (x,y) coordinates.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Creates a new point from wide coordinates, saturating each one to the range of [`i32`].
    ///
    /// # Example
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// let p = Point::saturating_from_i64(i64::MAX, -5);
    /// assert_eq!(p, Point::new(i32::MAX, -5));
    /// ```
    pub fn saturating_from_i64(x: i64, y: i64) -> Self {
        Self::new(saturate(x), saturate(y))
    }

    /// Creates a new point from the given direction and coordinates.
    ///
    /// If `dir` is [`Dir::Horiz`], `a` becomes the x-coordinate and `b` becomes the y-coordinate.
    /// If `dir` is [`Dir::Vert`], `a` becomes the y-coordinate and `b` becomes the x-coordinate.
    pub const fn from_dir_coords(dir: Dir, a: i32, b: i32) -> Self {
        match dir {
            Dir::Horiz => Self::new(a, b),
            Dir::Vert => Self::new(b, a),
        }
    }

    /// Returns the origin, `(0, 0)`.
    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0, y: 0 }
    }

    /// Gets the coordinate associated with direction `dir`.
    pub const fn coord(&self, dir: Dir) -> i32 {
        match dir {
            Dir::Horiz => self.x,
            Dir::Vert => self.y,
        }
    }

    /// The z-component of the cross product of `self` and `other`.
    #[inline]
    pub fn cross(&self, other: Point) -> i64 {
        self.x as i64 * other.y as i64 - self.y as i64 * other.x as i64
    }

    /// The dot product of `self` and `other`.
    #[inline]
    pub fn dot(&self, other: Point) -> i64 {
        self.x as i64 * other.x as i64 + self.y as i64 * other.y as i64
    }
}

/// Clamps a wide coordinate to the range of [`i32`].
#[inline]
pub(crate) fn saturate(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

impl TranslateMut for Point {
    fn translate_mut(&mut self, p: Point) {
        *self = *self + p;
    }
}

impl TransformMut for Point {
    fn transform_mut(&mut self, trans: Transformation) {
        *self = trans.apply(*self);
    }
}

impl std::ops::Add<Point> for Point {
    type Output = Self;
    fn add(self, rhs: Point) -> Self::Output {
        Self::new(self.x.saturating_add(rhs.x), self.y.saturating_add(rhs.y))
    }
}

impl std::ops::AddAssign<Point> for Point {
    fn add_assign(&mut self, rhs: Point) {
        *self = *self + rhs;
    }
}

impl std::ops::Sub<Point> for Point {
    type Output = Self;
    fn sub(self, rhs: Point) -> Self::Output {
        Self::new(self.x.saturating_sub(rhs.x), self.y.saturating_sub(rhs.y))
    }
}

impl std::ops::SubAssign<Point> for Point {
    fn sub_assign(&mut self, rhs: Point) {
        *self = *self - rhs;
    }
}

impl std::ops::Neg for Point {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self::new(self.x.saturating_neg(), self.y.saturating_neg())
    }
}

impl std::ops::Mul<i64> for Point {
    type Output = Self;

    /// Scales both coordinates by `rhs`, saturating on overflow.
    fn mul(self, rhs: i64) -> Self::Output {
        Self::saturating_from_i64(
            (self.x as i64).saturating_mul(rhs),
            (self.y as i64).saturating_mul(rhs),
        )
    }
}

impl From<(i32, i32)> for Point {
    fn from(value: (i32, i32)) -> Self {
        Self {
            x: value.0,
            y: value.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_saturates() {
        let p = Point::new(i32::MAX - 1, i32::MIN + 1);
        assert_eq!(p + Point::new(10, 0), Point::new(i32::MAX, i32::MIN + 1));
        assert_eq!(p - Point::new(0, 10), Point::new(i32::MAX - 1, i32::MIN));
        assert_eq!(-Point::new(i32::MIN, 3), Point::new(i32::MAX, -3));
        assert_eq!(Point::new(1 << 20, -(1 << 20)) * (1 << 20), Point::new(i32::MAX, i32::MIN));
    }

    #[test]
    fn cross_and_dot_do_not_overflow() {
        let a = Point::new(i32::MAX, 0);
        let b = Point::new(0, i32::MAX);
        assert_eq!(a.cross(b), i32::MAX as i64 * i32::MAX as i64);
        assert_eq!(a.dot(b), 0);
    }
}
