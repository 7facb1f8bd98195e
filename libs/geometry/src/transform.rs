//! Transformation types and traits.

use approx::{AbsDiffEq, RelativeEq};
use impl_trait_for_tuples::impl_for_tuples;
use serde::{Deserialize, Serialize};

use crate::point::Point;
use crate::rect::Rect;

/// A Manhattan rotation: 0, 90, 180, or 270 degrees counterclockwise.
#[derive(
    Debug, Clone, Copy, Default, Hash, Eq, Ord, PartialOrd, PartialEq, Serialize, Deserialize,
)]
pub enum Rotation {
    /// 0 degrees; no rotation.
    #[default]
    R0,
    /// 90 degrees counterclockwise.
    R90,
    /// 180 degrees counterclockwise.
    R180,
    /// 270 degrees counterclockwise.
    R270,
}

impl Rotation {
    /// Creates a rotation from a number of counterclockwise quarter turns.
    ///
    /// # Example
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// assert_eq!(Rotation::from_quarter_turns(5), Rotation::R90);
    /// assert_eq!(Rotation::from_quarter_turns(-1), Rotation::R270);
    /// ```
    pub const fn from_quarter_turns(n: i32) -> Self {
        match n.rem_euclid(4) {
            0 => Rotation::R0,
            1 => Rotation::R90,
            2 => Rotation::R180,
            _ => Rotation::R270,
        }
    }

    /// The number of counterclockwise quarter turns, in `0..4`.
    pub const fn quarter_turns(&self) -> i32 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 1,
            Rotation::R180 => 2,
            Rotation::R270 => 3,
        }
    }

    /// Returns `true` if the rotation exchanges the x and y axes.
    pub const fn swaps_axes(&self) -> bool {
        matches!(self, Rotation::R90 | Rotation::R270)
    }

    /// The angle of this rotation, in degrees.
    pub fn degrees(&self) -> f64 {
        90. * self.quarter_turns() as f64
    }

    /// Rotates the vector `(x, y)` counterclockwise by this rotation.
    #[inline]
    fn rotate_f64(&self, x: f64, y: f64) -> [f64; 2] {
        match self {
            Rotation::R0 => [x, y],
            Rotation::R90 => [-y, x],
            Rotation::R180 => [-x, -y],
            Rotation::R270 => [y, -x],
        }
    }
}

impl std::ops::Add<Rotation> for Rotation {
    type Output = Rotation;
    fn add(self, rhs: Rotation) -> Self::Output {
        Rotation::from_quarter_turns(self.quarter_turns() + rhs.quarter_turns())
    }
}

impl std::ops::AddAssign for Rotation {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::ops::Sub<Rotation> for Rotation {
    type Output = Rotation;
    fn sub(self, rhs: Rotation) -> Self::Output {
        Rotation::from_quarter_turns(self.quarter_turns() - rhs.quarter_turns())
    }
}

impl std::ops::SubAssign for Rotation {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

/// Rounds half away from zero, saturating at the bounds of [`i32`].
#[inline]
fn round_i32(v: f64) -> i32 {
    v.round() as i32
}

/// An orthogonal transformation with magnification and a floating point translation.
///
/// A point is transformed by, in order:
/// 1. mirroring about the x-axis if the magnification is negative,
/// 2. scaling by the absolute value of the magnification,
/// 3. rotating counterclockwise by `rotation`,
/// 4. translating by `b`.
///
/// Integer results are rounded half away from zero and saturated to the range of [`i32`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transformation {
    /// The x-y translation applied after the linear part.
    pub(crate) b: [f64; 2],
    /// The counterclockwise rotation.
    pub(crate) rotation: Rotation,
    /// The signed magnification. Negative values mirror about the x-axis first.
    pub(crate) mag: f64,
}

impl Default for Transformation {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transformation {
    /// Returns the identity transform, leaving any transformed object unmodified.
    pub const fn identity() -> Self {
        Self {
            b: [0., 0.],
            rotation: Rotation::R0,
            mag: 1.,
        }
    }

    /// Returns a translation by `(x,y)`.
    pub fn translate(x: f64, y: f64) -> Self {
        Self {
            b: [x, y],
            ..Self::identity()
        }
    }

    /// Returns a rotation by `angle`.
    pub fn rotate(angle: Rotation) -> Self {
        Self {
            rotation: angle,
            ..Self::identity()
        }
    }

    /// Returns a reflection about the x-axis.
    pub fn reflect_vert() -> Self {
        Self {
            mag: -1.,
            ..Self::identity()
        }
    }

    /// Returns a new [`TransformationBuilder`].
    #[inline]
    pub fn builder() -> TransformationBuilder {
        TransformationBuilder::default()
    }

    /// Creates a transform from only an offset.
    pub fn from_offset(offset: Point) -> Self {
        Self::translate(offset.x as f64, offset.y as f64)
    }

    /// Create a new [`Transformation`] that is the cascade of `parent` and `child`.
    ///
    /// "Parents" and "children" refer to typical layout-instance hierarchies,
    /// in which each layer of instance has a nested set of transformations relative to its top-level parent.
    /// The result applies `child` first, then `parent`.
    ///
    /// Note this operation *is not* commutative.
    /// For example the set of transformations:
    /// * (a) Reflect vertically, then
    /// * (b) Translate by (1,1)
    /// * (c) Place a point at (local coordinate) (1,1)
    ///
    /// Lands said point at (2,-2) in top-level space,
    /// whereas reversing the order of (a) and (b) lands it at (2,0).
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// let a = Transformation::reflect_vert();
    /// let b = Transformation::translate(1., 1.);
    /// let p = Point::new(1, 1);
    /// assert_eq!(Transformation::cascade(a, b).apply(p), Point::new(2, -2));
    /// assert_eq!(Transformation::cascade(b, a).apply(p), Point::new(2, 0));
    /// ```
    pub fn cascade(parent: Transformation, child: Transformation) -> Transformation {
        // Mirroring reverses the sense of every rotation that follows it.
        let rotation = if parent.mag < 0. {
            parent.rotation - child.rotation
        } else {
            parent.rotation + child.rotation
        };
        Self {
            b: parent.apply_f64(child.b),
            rotation,
            mag: parent.mag * child.mag,
        }
    }

    /// Returns the inverse [`Transformation`] of `self`.
    ///
    /// # Examples
    ///
    /// ```
    /// use geometry::transform::{Rotation, Transformation};
    /// use approx::assert_relative_eq;
    ///
    /// let trans = Transformation::cascade(
    ///     Transformation::rotate(Rotation::R90),
    ///     Transformation::translate(5., 10.),
    /// );
    /// let inv = trans.inv();
    ///
    /// assert_relative_eq!(Transformation::cascade(inv, trans), Transformation::identity());
    /// ```
    pub fn inv(&self) -> Transformation {
        let rotation = if self.mag > 0. {
            Rotation::R0 - self.rotation
        } else {
            self.rotation
        };
        let mut inv = Self {
            b: [0., 0.],
            rotation,
            mag: 1. / self.mag,
        };
        inv.b = inv.apply_linear_f64([-self.b[0], -self.b[1]]);
        inv
    }

    /// The translation of this transformation.
    pub fn offset(&self) -> [f64; 2] {
        self.b
    }

    /// The translation of this transformation, rounded to the integer grid.
    pub fn offset_point(&self) -> Point {
        Point::new(round_i32(self.b[0]), round_i32(self.b[1]))
    }

    /// The counterclockwise rotation.
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// The signed magnification.
    pub fn mag(&self) -> f64 {
        self.mag
    }

    /// Returns `true` if the transformation mirrors about the x-axis.
    pub fn is_mirror(&self) -> bool {
        self.mag < 0.
    }

    /// Returns `true` if the transformation only translates.
    pub fn is_translation(&self) -> bool {
        self.rotation == Rotation::R0 && self.mag == 1.
    }

    /// Returns the integer translation equivalent to `self`, if one exists.
    pub fn as_simple(&self) -> Option<SimpleTransformation> {
        (self.is_translation() && self.b[0].fract() == 0. && self.b[1].fract() == 0.)
            .then(|| SimpleTransformation::new(self.offset_point()))
    }

    /// Returns `self` with its translation moved by `p`.
    pub fn translated(mut self, p: Point) -> Self {
        self.b[0] += p.x as f64;
        self.b[1] += p.y as f64;
        self
    }

    /// Applies the linear part (mirror, magnification and rotation) to a floating point vector.
    #[inline]
    fn apply_linear_f64(&self, v: [f64; 2]) -> [f64; 2] {
        let s = self.mag.abs();
        let y = if self.mag < 0. { -v[1] } else { v[1] };
        self.rotation.rotate_f64(v[0] * s, y * s)
    }

    /// Applies the transformation to a floating point position.
    pub fn apply_f64(&self, p: [f64; 2]) -> [f64; 2] {
        let [x, y] = self.apply_linear_f64(p);
        [x + self.b[0], y + self.b[1]]
    }

    /// Applies the transformation to a point.
    ///
    /// # Example
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// let trans = Transformation::builder()
    ///     .point(Point::new(10, 0))
    ///     .rotation(Rotation::R90)
    ///     .mag(2.)
    ///     .build();
    /// assert_eq!(trans.apply(Point::new(1, 2)), Point::new(6, 2));
    /// ```
    pub fn apply(&self, p: Point) -> Point {
        let [x, y] = self.apply_f64([p.x as f64, p.y as f64]);
        Point::new(round_i32(x), round_i32(y))
    }

    /// Applies the transformation to a displacement vector, ignoring the translation.
    pub fn apply_vector(&self, v: Point) -> Point {
        let [x, y] = self.apply_linear_f64([v.x as f64, v.y as f64]);
        Point::new(round_i32(x), round_i32(y))
    }

    /// Applies the transformation to a rectangle.
    ///
    /// Orthogonal transformations map rectangles to rectangles, so the result is exact up to rounding.
    pub fn apply_rect(&self, r: Rect) -> Rect {
        Rect::new(self.apply(r.lower_left()), self.apply(r.upper_right()))
    }

    /// Scales a length by the absolute magnification.
    pub fn scale(&self, len: i32) -> i32 {
        round_i32(len as f64 * self.mag.abs())
    }
}

impl AbsDiffEq for Transformation {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.rotation == other.rotation
            && self.mag.abs_diff_eq(&other.mag, epsilon)
            && self.b[0].abs_diff_eq(&other.b[0], epsilon)
            && self.b[1].abs_diff_eq(&other.b[1], epsilon)
    }
}

impl RelativeEq for Transformation {
    fn default_max_relative() -> Self::Epsilon {
        f64::default_max_relative()
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        self.rotation == other.rotation
            && self.mag.relative_eq(&other.mag, epsilon, max_relative)
            && self.b[0].relative_eq(&other.b[0], epsilon, max_relative)
            && self.b[1].relative_eq(&other.b[1], epsilon, max_relative)
    }
}

/// A builder for creating transformations from translations, rotations and magnifications.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformationBuilder {
    b: [f64; 2],
    rotation: Rotation,
    mag: f64,
    reflect_vert: bool,
}

impl TransformationBuilder {
    /// Specifies an integer x-y translation.
    pub fn point(&mut self, point: impl Into<Point>) -> &mut Self {
        let point = point.into();
        self.b = [point.x as f64, point.y as f64];
        self
    }

    /// Specifies a floating point x-y translation.
    pub fn offset(&mut self, b: [f64; 2]) -> &mut Self {
        self.b = b;
        self
    }

    /// Specifies the counterclockwise rotation.
    pub fn rotation(&mut self, rotation: Rotation) -> &mut Self {
        self.rotation = rotation;
        self
    }

    /// Specifies the magnification. Zero is treated as unity.
    pub fn mag(&mut self, mag: f64) -> &mut Self {
        self.mag = mag;
        self
    }

    /// Specifies whether the transformation mirrors about the x-axis.
    pub fn reflect_vert(&mut self, reflect_vert: bool) -> &mut Self {
        self.reflect_vert = reflect_vert;
        self
    }

    /// Builds a [`Transformation`] from the specified parameters.
    pub fn build(&mut self) -> Transformation {
        let mag = if self.mag == 0. { 1. } else { self.mag.abs() };
        Transformation {
            b: self.b,
            rotation: self.rotation,
            mag: if self.reflect_vert || self.mag < 0. {
                -mag
            } else {
                mag
            },
        }
    }
}

/// A translation by an integer offset.
#[derive(
    Debug, Clone, Copy, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SimpleTransformation {
    offset: Point,
}

impl SimpleTransformation {
    /// Creates a translation by `offset`.
    pub const fn new(offset: Point) -> Self {
        Self { offset }
    }

    /// The translation offset.
    pub const fn offset(&self) -> Point {
        self.offset
    }

    /// Applies the translation to a point, saturating on overflow.
    pub fn apply(&self, p: Point) -> Point {
        p + self.offset
    }

    /// Applies the translation to a rectangle.
    pub fn apply_rect(&self, r: Rect) -> Rect {
        r.translate(self.offset)
    }

    /// The cascade of two translations: `child` then `parent`.
    pub fn cascade(parent: SimpleTransformation, child: SimpleTransformation) -> Self {
        Self::new(parent.offset + child.offset)
    }

    /// The inverse translation.
    pub fn inv(&self) -> Self {
        Self::new(-self.offset)
    }

    /// Converts to the general [`Transformation`].
    pub fn to_full(&self) -> Transformation {
        Transformation::from_offset(self.offset)
    }
}

impl From<SimpleTransformation> for Transformation {
    fn from(value: SimpleTransformation) -> Self {
        value.to_full()
    }
}

/// Either an integer translation or a general transformation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TransformationVar {
    /// An integer translation.
    Simple(SimpleTransformation),
    /// A general transformation.
    Full(Transformation),
}

impl Default for TransformationVar {
    fn default() -> Self {
        Self::Simple(SimpleTransformation::default())
    }
}

impl TransformationVar {
    /// Picks the smallest representation of `trans`.
    pub fn new(trans: Transformation) -> Self {
        match trans.as_simple() {
            Some(simple) => Self::Simple(simple),
            None => Self::Full(trans),
        }
    }

    /// The cascade of `parent` and `child`. Two translations stay a translation.
    pub fn cascade(parent: TransformationVar, child: TransformationVar) -> Self {
        match (parent, child) {
            (Self::Simple(p), Self::Simple(c)) => Self::Simple(SimpleTransformation::cascade(p, c)),
            (p, c) => Self::Full(Transformation::cascade(p.to_full(), c.to_full())),
        }
    }

    /// Converts to the general [`Transformation`].
    pub fn to_full(&self) -> Transformation {
        match self {
            Self::Simple(simple) => simple.to_full(),
            Self::Full(full) => *full,
        }
    }

    /// Applies the transformation to a point.
    pub fn apply(&self, p: Point) -> Point {
        match self {
            Self::Simple(simple) => simple.apply(p),
            Self::Full(full) => full.apply(p),
        }
    }

    /// Applies the transformation to a rectangle.
    pub fn apply_rect(&self, r: Rect) -> Rect {
        match self {
            Self::Simple(simple) => simple.apply_rect(r),
            Self::Full(full) => full.apply_rect(r),
        }
    }
}

impl From<Transformation> for TransformationVar {
    fn from(value: Transformation) -> Self {
        Self::new(value)
    }
}

impl From<SimpleTransformation> for TransformationVar {
    fn from(value: SimpleTransformation) -> Self {
        Self::Simple(value)
    }
}

/// A trait for specifying how an object is changed by a [`Transformation`].
#[impl_for_tuples(32)]
pub trait TransformMut {
    /// Applies matrix-vector [`Transformation`] `trans`.
    fn transform_mut(&mut self, trans: Transformation);
}

impl<T: TransformMut> TransformMut for Vec<T> {
    fn transform_mut(&mut self, trans: Transformation) {
        for i in self.iter_mut() {
            i.transform_mut(trans);
        }
    }
}

impl<T: TransformMut> TransformMut for Option<T> {
    fn transform_mut(&mut self, trans: Transformation) {
        if let Some(inner) = self.as_mut() {
            inner.transform_mut(trans);
        }
    }
}

/// A trait for specifying how an object is changed by a [`Transformation`].
///
/// Takes in an owned copy of the shape and returns the transformed version.
pub trait Transform: TransformMut + Sized {
    /// Applies matrix-vector [`Transformation`] `trans`.
    ///
    /// Creates a new shape at a location equal to the transformation of the original.
    #[inline]
    fn transform(mut self, trans: Transformation) -> Self {
        self.transform_mut(trans);
        self
    }
}

impl<T: TransformMut + Sized> Transform for T {}

/// A trait for specifying how a shape is translated by a [`Point`].
#[impl_for_tuples(32)]
pub trait TranslateMut {
    /// Translates the shape by a [`Point`] through mutation.
    fn translate_mut(&mut self, p: Point);
}

impl<T: TranslateMut> TranslateMut for Vec<T> {
    fn translate_mut(&mut self, p: Point) {
        for i in self.iter_mut() {
            i.translate_mut(p);
        }
    }
}

impl<T: TranslateMut> TranslateMut for Option<T> {
    fn translate_mut(&mut self, p: Point) {
        if let Some(inner) = self.as_mut() {
            inner.translate_mut(p);
        }
    }
}

/// A trait for specifying how a shape is translated by a [`Point`].
///
/// Takes in an owned copy of the shape and returns the translated version.
pub trait Translate: TranslateMut + Sized {
    /// Translates the shape by a [`Point`] through mutation.
    ///
    /// Creates a new shape at a location equal to the translation of the original.
    fn translate(mut self, p: Point) -> Self {
        self.translate_mut(p);
        self
    }
}

impl<T: TranslateMut + Sized> Translate for T {}
