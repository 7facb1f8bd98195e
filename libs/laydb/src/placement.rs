//! Instance placements: a transformation, optionally repeated.

use geometry::prelude::*;
use geometry::repetition::OffsetsIn;
use serde::{Deserialize, Serialize};

/// Where and how often a child cell is placed.
///
/// The smallest applicable form is chosen on construction: integer
/// translations are stored as [`SimpleTransformation`]s and non-repeated
/// placements carry no repetition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Placement {
    Simple(SimpleTransformation),
    Full(Transformation),
    SimpleRepeated(SimpleTransformation, Box<Repetition>),
    FullRepeated(Transformation, Box<Repetition>),
}

impl Default for Placement {
    fn default() -> Self {
        Placement::Simple(SimpleTransformation::default())
    }
}

impl Placement {
    /// Creates a placement, picking the smallest representation.
    ///
    /// # Example
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// # use laydb::placement::Placement;
    /// let placement = Placement::new(Transformation::translate(10., 0.), None);
    /// assert!(matches!(placement, Placement::Simple(_)));
    /// ```
    pub fn new(trans: Transformation, repetition: Option<Repetition>) -> Self {
        match (TransformationVar::new(trans), repetition) {
            (TransformationVar::Simple(s), None) => Placement::Simple(s),
            (TransformationVar::Full(t), None) => Placement::Full(t),
            (TransformationVar::Simple(s), Some(r)) => Placement::SimpleRepeated(s, Box::new(r)),
            (TransformationVar::Full(t), Some(r)) => Placement::FullRepeated(t, Box::new(r)),
        }
    }

    /// Returns a new [`PlacementBuilder`].
    pub fn builder() -> PlacementBuilder {
        PlacementBuilder::default()
    }

    /// The number of placed copies.
    pub fn len(&self) -> usize {
        self.repetition().map_or(1, Repetition::len)
    }

    /// Returns `true` if the placement has a repetition with no offsets.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The transformation of the copy at offset `(0, 0)`.
    pub fn base(&self) -> Transformation {
        self.base_var().to_full()
    }

    /// The transformation of the copy at offset `(0, 0)`, in its smallest form.
    pub fn base_var(&self) -> TransformationVar {
        match self {
            Placement::Simple(s) | Placement::SimpleRepeated(s, _) => TransformationVar::Simple(*s),
            Placement::Full(t) | Placement::FullRepeated(t, _) => TransformationVar::Full(*t),
        }
    }

    pub fn repetition(&self) -> Option<&Repetition> {
        match self {
            Placement::Simple(_) | Placement::Full(_) => None,
            Placement::SimpleRepeated(_, r) | Placement::FullRepeated(_, r) => Some(&**r),
        }
    }

    /// The transformation of the `i`-th copy.
    ///
    /// Copies are displaced from the base by the repetition offsets, which are
    /// applied after the base transformation.
    pub fn trans(&self, i: usize) -> Transformation {
        match self.repetition() {
            Some(rep) => self.base().translated(rep.offset(i)),
            None => self.base(),
        }
    }

    /// The bounding box of every copy of a child whose bounding box is `child`.
    pub fn bbox(&self, child: Rect) -> Rect {
        if child.is_empty() {
            return Rect::EMPTY;
        }
        let placed = self.base_var().apply_rect(child);
        match self.repetition() {
            Some(rep) if rep.is_empty() => Rect::EMPTY,
            Some(rep) => placed.minkowski_sum(&rep.bbox()),
            None => placed,
        }
    }

    /// Applies `trans` on top of the placement.
    pub fn transform(&mut self, trans: &Transformation) {
        let base = Transformation::cascade(*trans, self.base());
        let repetition = self
            .repetition()
            .map(|rep| rep.transformed_without_translation(trans));
        *self = Placement::new(base, repetition);
    }

    /// Lazily iterates over the copies of a child with bounding box `child`
    /// that touch `region`, yielding the repeat index and the copy's transformation.
    ///
    /// Without a region every copy is yielded. The repeat index is [`None`]
    /// for non-repeated placements.
    pub fn offsets_in(&self, child: Rect, region: Option<Rect>) -> Repeats<'_> {
        let base = self.base();
        let placed = self.base_var().apply_rect(child);
        match self.repetition() {
            None => Repeats::Single(
                region
                    .is_none_or(|r| !placed.is_empty() && placed.intersects(&r))
                    .then_some(base),
            ),
            Some(rep) => {
                let offsets = match region {
                    _ if placed.is_empty() => OffsetsIn::empty(),
                    None => rep.offsets_in(rep.bbox()),
                    Some(r) => rep.offsets_in(Rect::new(
                        r.lower_left() - placed.upper_right(),
                        r.upper_right() - placed.lower_left(),
                    )),
                };
                Repeats::Repeated { base, offsets }
            }
        }
    }
}

/// Iterator over the copies of a placement. Created by [`Placement::offsets_in`].
#[derive(Debug, Clone)]
pub enum Repeats<'a> {
    Single(Option<Transformation>),
    Repeated {
        base: Transformation,
        offsets: OffsetsIn<'a>,
    },
}

impl Iterator for Repeats<'_> {
    type Item = (Option<usize>, Transformation);

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Repeats::Single(trans) => trans.take().map(|t| (None, t)),
            Repeats::Repeated { base, offsets } => offsets
                .next()
                .map(|(i, offset)| (Some(i), base.translated(offset))),
        }
    }
}

/// A builder for [`Placement`]s.
#[derive(Debug, Clone, Default)]
pub struct PlacementBuilder {
    trans: Transformation,
    repetition: Option<Repetition>,
}

impl PlacementBuilder {
    /// Sets the base transformation.
    pub fn trans(&mut self, trans: Transformation) -> &mut Self {
        self.trans = trans;
        self
    }

    /// Sets the base transformation to a translation by `offset`.
    pub fn offset(&mut self, offset: Point) -> &mut Self {
        self.trans = Transformation::from_offset(offset);
        self
    }

    /// Repeats the placement over `repetition`.
    pub fn repetition(&mut self, repetition: Repetition) -> &mut Self {
        self.repetition = Some(repetition);
        self
    }

    pub fn build(&mut self) -> Placement {
        Placement::new(self.trans, self.repetition.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smallest_form_is_chosen() {
        assert!(matches!(
            Placement::new(Transformation::rotate(Rotation::R90), None),
            Placement::Full(_)
        ));
        assert!(matches!(
            Placement::builder()
                .offset(Point::new(3, 4))
                .repetition(Repetition::horizontal(vec![0, 10]))
                .build(),
            Placement::SimpleRepeated(..)
        ));
    }

    #[test]
    fn translated_placement_bbox_is_exact() {
        let placement = Placement::builder()
            .offset(Point::new(100, 50))
            .repetition(Repetition::array(2, 3, Point::new(0, 30), Point::new(20, 0)))
            .build();
        let child = Rect::from_sides(0, 0, 10, 10);
        assert_eq!(placement.bbox(child), Rect::from_sides(100, 50, 150, 90));
        assert_eq!(placement.bbox(Rect::EMPTY), Rect::EMPTY);
        assert_eq!(placement.len(), 6);
        assert_eq!(
            placement.trans(4).apply(Point::zero()),
            Point::new(120, 80)
        );
    }

    #[test]
    fn rotated_placement_bbox() {
        let placement = Placement::new(
            Transformation::builder()
                .point(Point::new(5, 0))
                .rotation(Rotation::R90)
                .build(),
            None,
        );
        assert_eq!(
            placement.bbox(Rect::from_sides(0, 0, 10, 20)),
            Rect::from_sides(-15, 0, 5, 10)
        );
    }

    #[test]
    fn offsets_in_region() {
        let placement = Placement::builder()
            .repetition(Repetition::array(1, 100, Point::zero(), Point::new(10, 0)))
            .build();
        let child = Rect::from_sides(0, 0, 5, 5);
        let hits: Vec<_> = placement
            .offsets_in(child, Some(Rect::from_sides(21, 0, 36, 1)))
            .map(|(i, t)| (i, t.offset_point()))
            .collect();
        assert_eq!(
            hits,
            vec![(Some(2), Point::new(20, 0)), (Some(3), Point::new(30, 0))]
        );
        assert_eq!(placement.offsets_in(child, None).count(), 100);
    }

    #[test]
    fn transform_composes_on_top() {
        let mut placement = Placement::builder()
            .offset(Point::new(10, 0))
            .repetition(Repetition::horizontal(vec![0, 5]))
            .build();
        placement.transform(&Transformation::rotate(Rotation::R90));
        assert_eq!(placement.trans(0).apply(Point::zero()), Point::new(0, 10));
        assert_eq!(placement.trans(1).apply(Point::zero()), Point::new(0, 15));
        assert!(matches!(placement, Placement::FullRepeated(..)));
    }
}
