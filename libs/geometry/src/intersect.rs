//! Intersections of geometric objects.

/// Trait for calculating the intersection with another geometric object.
pub trait Intersect<T: ?Sized> {
    /// The type of the output shape representing the intersection.
    type Output;

    /// Calculates the closed intersection of this object with `other`.
    ///
    /// Returns [`None`] if the two objects share no point.
    fn intersect(&self, other: &T) -> Option<Self::Output>;
}
