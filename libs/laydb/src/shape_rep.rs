//! Shapes repeated over a set of offsets.

use geometry::prelude::*;
use geometry::repetition::OffsetsIn;
use serde::{Deserialize, Serialize};

/// A shape placed once at every offset of a [`Repetition`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShapeRepetition<S> {
    shape: S,
    repetition: Repetition,
}

impl<S> ShapeRepetition<S>
where
    S: Bbox + Translate + Clone,
{
    /// Creates a new shape repetition.
    pub fn new(shape: S, repetition: Repetition) -> Self {
        Self { shape, repetition }
    }

    /// The shape at offset `(0, 0)`.
    pub fn shape(&self) -> &S {
        &self.shape
    }

    /// The repetition offsets.
    pub fn repetition(&self) -> &Repetition {
        &self.repetition
    }

    /// The number of repeated shapes.
    pub fn len(&self) -> usize {
        self.repetition.len()
    }

    /// Returns `true` if there are no repeated shapes.
    pub fn is_empty(&self) -> bool {
        self.repetition.is_empty()
    }

    /// The bounding box over all repeated shapes.
    pub fn bbox(&self) -> Rect {
        let bbox = self.shape.bbox();
        if bbox.is_empty() || self.repetition.is_empty() {
            return Rect::EMPTY;
        }
        bbox.minkowski_sum(&self.repetition.bbox())
    }

    /// The bounding box of the `i`-th repeated shape.
    pub fn bbox_at(&self, i: usize) -> Rect {
        self.shape.bbox().translate(self.repetition.offset(i))
    }

    /// The `i`-th repeated shape.
    pub fn shape_at(&self, i: usize) -> S {
        self.shape.clone().translate(self.repetition.offset(i))
    }

    /// Iterates over all repeated shapes in index order.
    pub fn shapes(&self) -> impl Iterator<Item = S> + '_ {
        self.repetition
            .offsets()
            .map(|offset| self.shape.clone().translate(offset))
    }

    /// The offsets at which the shape's bounding box touches `region`.
    fn search_region(&self, region: &Rect) -> Option<Rect> {
        let bbox = self.shape.bbox();
        if bbox.is_empty() {
            return None;
        }
        Some(Rect::new(
            region.lower_left() - bbox.upper_right(),
            region.upper_right() - bbox.lower_left(),
        ))
    }

    /// Returns `true` if any repeated shape's bounding box touches `region`.
    pub fn has_shape_intersect(&self, region: &Rect) -> bool {
        self.search_region(region)
            .is_some_and(|search| self.repetition.has_offset_in(&search))
    }

    /// The first index at or after `start` whose shape bounding box touches `region`.
    pub fn find_intersecting(&self, region: &Rect, start: usize) -> Option<usize> {
        self.intersecting(region)
            .map(|(i, _)| i)
            .find(|&i| i >= start)
    }

    /// Lazily iterates over `(index, offset)` pairs whose shape bounding box touches `region`.
    pub fn intersecting(&self, region: &Rect) -> OffsetsIn<'_> {
        match self.search_region(region) {
            Some(search) => self.repetition.offsets_in(search),
            None => OffsetsIn::empty(),
        }
    }
}

impl<S: TranslateMut> TranslateMut for ShapeRepetition<S> {
    fn translate_mut(&mut self, p: Point) {
        self.shape.translate_mut(p);
    }
}

impl<S: TransformMut> TransformMut for ShapeRepetition<S> {
    fn transform_mut(&mut self, trans: Transformation) {
        self.shape.transform_mut(trans);
        self.repetition = self.repetition.transformed_without_translation(&trans);
    }
}
