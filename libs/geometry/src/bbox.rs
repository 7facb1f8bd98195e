//! Axis-aligned rectangular bounding boxes.

use impl_trait_for_tuples::impl_for_tuples;

use crate::rect::Rect;

/// A geometric object that has a bounding box.
///
/// Objects with no extent report [`Rect::EMPTY`], which every union ignores.
///
/// # Examples
///
/// ```
/// # use geometry::prelude::*;
/// let rect = Rect::from_sides(0, 0, 100, 200);
/// assert_eq!(rect.bbox(), Rect::from_sides(0, 0, 100, 200));
/// let shapes = vec![rect, Rect::from_sides(-10, 0, 0, 5)];
/// assert_eq!(shapes.bbox(), Rect::from_sides(-10, 0, 100, 200));
/// assert!(Vec::<Rect>::new().bbox().is_empty());
/// ```
pub trait Bbox {
    /// Computes the axis-aligned rectangular bounding box.
    fn bbox(&self) -> Rect;
}

impl<T> Bbox for &T
where
    T: Bbox + ?Sized,
{
    fn bbox(&self) -> Rect {
        T::bbox(*self)
    }
}

#[impl_for_tuples(32)]
impl Bbox for TupleIdentifier {
    #[allow(clippy::let_and_return)]
    fn bbox(&self) -> Rect {
        let mut bbox = Rect::EMPTY;
        for_tuples!( #( bbox = bbox.union(TupleIdentifier.bbox()); )* );
        bbox
    }
}

impl<T: Bbox> Bbox for [T] {
    fn bbox(&self) -> Rect {
        self.iter().fold(Rect::EMPTY, |acc, item| acc.union(item.bbox()))
    }
}

impl<T: Bbox> Bbox for Vec<T> {
    fn bbox(&self) -> Rect {
        self.as_slice().bbox()
    }
}

impl<T: Bbox> Bbox for Option<T> {
    fn bbox(&self) -> Rect {
        match self {
            Some(item) => item.bbox(),
            None => Rect::EMPTY,
        }
    }
}
