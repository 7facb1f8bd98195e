//! Per-layer shape storage.

use std::sync::OnceLock;

use geometry::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::shape_rep::ShapeRepetition;
use crate::text::Text;

/// The kinds of shape stored in [`Shapes`].
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShapeKind {
    Rect,
    Polygon,
    Text,
    Path,
    RectRep,
    PolygonRep,
}

impl ShapeKind {
    /// The kinds that cover area, in enumeration order.
    pub const AREA: [ShapeKind; 5] = [
        ShapeKind::Rect,
        ShapeKind::Polygon,
        ShapeKind::Path,
        ShapeKind::RectRep,
        ShapeKind::PolygonRep,
    ];

    /// Returns `true` for every kind except [`ShapeKind::Text`].
    pub fn has_area(&self) -> bool {
        !matches!(self, ShapeKind::Text)
    }

    /// Returns `true` for repeated shapes.
    pub fn is_repetition(&self) -> bool {
        matches!(self, ShapeKind::RectRep | ShapeKind::PolygonRep)
    }
}

/// An owned shape of any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Rect(Rect),
    Polygon(Polygon),
    Path(Path),
    Text(Text),
    RectRep(ShapeRepetition<Rect>),
    PolygonRep(ShapeRepetition<Polygon>),
}

impl Shape {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Rect(_) => ShapeKind::Rect,
            Shape::Polygon(_) => ShapeKind::Polygon,
            Shape::Path(_) => ShapeKind::Path,
            Shape::Text(_) => ShapeKind::Text,
            Shape::RectRep(_) => ShapeKind::RectRep,
            Shape::PolygonRep(_) => ShapeKind::PolygonRep,
        }
    }

    /// The bounding box of the shape. Texts have none.
    pub fn bbox(&self) -> Rect {
        match self {
            Shape::Rect(r) => r.bbox(),
            Shape::Polygon(p) => p.bbox(),
            Shape::Path(p) => p.bbox(),
            Shape::Text(_) => Rect::EMPTY,
            Shape::RectRep(r) => r.bbox(),
            Shape::PolygonRep(r) => r.bbox(),
        }
    }
}

impl TransformMut for Shape {
    fn transform_mut(&mut self, trans: Transformation) {
        match self {
            Shape::Rect(r) => r.transform_mut(trans),
            Shape::Polygon(p) => p.transform_mut(trans),
            Shape::Path(p) => p.transform_mut(trans),
            Shape::Text(t) => t.transform_mut(trans),
            Shape::RectRep(r) => r.transform_mut(trans),
            Shape::PolygonRep(r) => r.transform_mut(trans),
        }
    }
}

impl From<Rect> for Shape {
    fn from(value: Rect) -> Self {
        Shape::Rect(value)
    }
}

impl From<Polygon> for Shape {
    fn from(value: Polygon) -> Self {
        Shape::Polygon(value)
    }
}

impl From<Path> for Shape {
    fn from(value: Path) -> Self {
        Shape::Path(value)
    }
}

impl From<Text> for Shape {
    fn from(value: Text) -> Self {
        Shape::Text(value)
    }
}

impl From<ShapeRepetition<Rect>> for Shape {
    fn from(value: ShapeRepetition<Rect>) -> Self {
        Shape::RectRep(value)
    }
}

impl From<ShapeRepetition<Polygon>> for Shape {
    fn from(value: ShapeRepetition<Polygon>) -> Self {
        Shape::PolygonRep(value)
    }
}

/// The shapes of one cell on one layer, grouped by kind.
///
/// Shapes are addressed by kind and index. Deletion swap-removes, so the last
/// shape of a kind takes the index of a deleted one.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Shapes {
    pub(crate) rects: Vec<Rect>,
    pub(crate) polygons: Vec<Polygon>,
    pub(crate) paths: Vec<Path>,
    pub(crate) texts: Vec<Text>,
    pub(crate) rect_reps: Vec<ShapeRepetition<Rect>>,
    pub(crate) polygon_reps: Vec<ShapeRepetition<Polygon>>,
    #[serde(skip)]
    bbox: OnceLock<Rect>,
}

impl Shapes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a shape, returning its index among shapes of the same kind.
    pub fn insert(&mut self, shape: impl Into<Shape>) -> u32 {
        self.invalidate();
        fn push<T>(v: &mut Vec<T>, item: T) -> u32 {
            v.push(item);
            (v.len() - 1) as u32
        }
        match shape.into() {
            Shape::Rect(r) => push(&mut self.rects, r),
            Shape::Polygon(p) => push(&mut self.polygons, p),
            Shape::Path(p) => push(&mut self.paths, p),
            Shape::Text(t) => push(&mut self.texts, t),
            Shape::RectRep(r) => push(&mut self.rect_reps, r),
            Shape::PolygonRep(r) => push(&mut self.polygon_reps, r),
        }
    }

    /// Replaces the shape at `index` of the new shape's kind, returning the old shape.
    pub fn replace(&mut self, index: u32, shape: impl Into<Shape>) -> Result<Shape> {
        let shape = shape.into();
        let i = index as usize;
        if i >= self.count(shape.kind()) {
            return Err(Error::ForeignShape);
        }
        self.invalidate();
        Ok(match shape {
            Shape::Rect(r) => Shape::Rect(std::mem::replace(&mut self.rects[i], r)),
            Shape::Polygon(p) => Shape::Polygon(std::mem::replace(&mut self.polygons[i], p)),
            Shape::Path(p) => Shape::Path(std::mem::replace(&mut self.paths[i], p)),
            Shape::Text(t) => Shape::Text(std::mem::replace(&mut self.texts[i], t)),
            Shape::RectRep(r) => Shape::RectRep(std::mem::replace(&mut self.rect_reps[i], r)),
            Shape::PolygonRep(r) => {
                Shape::PolygonRep(std::mem::replace(&mut self.polygon_reps[i], r))
            }
        })
    }

    /// Deletes the shapes of `kind` at `indices`.
    ///
    /// Either every index is valid and all are deleted, or nothing changes.
    pub fn delete(&mut self, kind: ShapeKind, indices: &[u32]) -> Result<()> {
        let count = self.count(kind);
        if indices.iter().any(|&i| i as usize >= count) {
            return Err(Error::ForeignShape);
        }
        let mut indices = indices.to_vec();
        indices.sort_unstable_by(|a, b| b.cmp(a));
        indices.dedup();
        self.invalidate();
        for i in indices {
            let i = i as usize;
            match kind {
                ShapeKind::Rect => {
                    self.rects.swap_remove(i);
                }
                ShapeKind::Polygon => {
                    self.polygons.swap_remove(i);
                }
                ShapeKind::Path => {
                    self.paths.swap_remove(i);
                }
                ShapeKind::Text => {
                    self.texts.swap_remove(i);
                }
                ShapeKind::RectRep => {
                    self.rect_reps.swap_remove(i);
                }
                ShapeKind::PolygonRep => {
                    self.polygon_reps.swap_remove(i);
                }
            }
        }
        Ok(())
    }

    /// The number of stored shapes of `kind`, counting each repetition once.
    pub fn count(&self, kind: ShapeKind) -> usize {
        match kind {
            ShapeKind::Rect => self.rects.len(),
            ShapeKind::Polygon => self.polygons.len(),
            ShapeKind::Path => self.paths.len(),
            ShapeKind::Text => self.texts.len(),
            ShapeKind::RectRep => self.rect_reps.len(),
            ShapeKind::PolygonRep => self.polygon_reps.len(),
        }
    }

    /// The number of shapes, with repetitions counted at their expanded size.
    pub fn len(&self, include_text: bool) -> usize {
        let text = if include_text { self.texts.len() } else { 0 };
        self.rects.len()
            + self.polygons.len()
            + self.paths.len()
            + text
            + self.rect_reps.iter().map(|r| r.len()).sum::<usize>()
            + self.polygon_reps.iter().map(|r| r.len()).sum::<usize>()
    }

    /// The number of area shapes, with repetitions expanded.
    pub fn polygon_count(&self) -> usize {
        self.len(false)
    }

    /// Returns `true` if no shape of any kind is stored.
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty() && !self.has_area_shapes()
    }

    /// Returns `true` if any shape other than text is stored.
    pub fn has_area_shapes(&self) -> bool {
        !(self.rects.is_empty()
            && self.polygons.is_empty()
            && self.paths.is_empty()
            && self.rect_reps.is_empty()
            && self.polygon_reps.is_empty())
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Moves every shape of `other` into `self`.
    pub fn merge(&mut self, other: Shapes) {
        self.invalidate();
        self.rects.extend(other.rects);
        self.polygons.extend(other.polygons);
        self.paths.extend(other.paths);
        self.texts.extend(other.texts);
        self.rect_reps.extend(other.rect_reps);
        self.polygon_reps.extend(other.polygon_reps);
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    pub fn texts(&self) -> &[Text] {
        &self.texts
    }

    pub fn rect_reps(&self) -> &[ShapeRepetition<Rect>] {
        &self.rect_reps
    }

    pub fn polygon_reps(&self) -> &[ShapeRepetition<Polygon>] {
        &self.polygon_reps
    }

    /// Returns a copy of the shape of `kind` at `index`.
    pub fn get(&self, kind: ShapeKind, index: u32) -> Option<Shape> {
        let i = index as usize;
        Some(match kind {
            ShapeKind::Rect => Shape::Rect(*self.rects.get(i)?),
            ShapeKind::Polygon => Shape::Polygon(self.polygons.get(i)?.clone()),
            ShapeKind::Path => Shape::Path(self.paths.get(i)?.clone()),
            ShapeKind::Text => Shape::Text(self.texts.get(i)?.clone()),
            ShapeKind::RectRep => Shape::RectRep(self.rect_reps.get(i)?.clone()),
            ShapeKind::PolygonRep => Shape::PolygonRep(self.polygon_reps.get(i)?.clone()),
        })
    }

    /// The bounding box of the shape of `kind` at `index`.
    ///
    /// Texts and out-of-range indices give the empty rectangle.
    pub fn shape_bbox(&self, kind: ShapeKind, index: u32) -> Rect {
        let i = index as usize;
        match kind {
            ShapeKind::Rect => self.rects.get(i).bbox(),
            ShapeKind::Polygon => self.polygons.get(i).bbox(),
            ShapeKind::Path => self.paths.get(i).bbox(),
            ShapeKind::Text => Rect::EMPTY,
            ShapeKind::RectRep => self.rect_reps.get(i).map(|r| r.bbox()).unwrap_or_default(),
            ShapeKind::PolygonRep => self
                .polygon_reps
                .get(i)
                .map(|r| r.bbox())
                .unwrap_or_default(),
        }
    }

    /// Returns `true` if the shape of `kind` at `index` touches `region`.
    ///
    /// Repeated shapes are tested per repeat.
    pub(crate) fn shape_intersects(&self, kind: ShapeKind, index: u32, region: &Rect) -> bool {
        let i = index as usize;
        match kind {
            ShapeKind::RectRep => self
                .rect_reps
                .get(i)
                .is_some_and(|r| r.has_shape_intersect(region)),
            ShapeKind::PolygonRep => self
                .polygon_reps
                .get(i)
                .is_some_and(|r| r.has_shape_intersect(region)),
            _ => {
                let bbox = self.shape_bbox(kind, index);
                !bbox.is_empty() && bbox.intersects(region)
            }
        }
    }

    /// The union of the bounding boxes of all area shapes. Cached until the next mutation.
    pub fn bbox(&self) -> Rect {
        *self.bbox.get_or_init(|| {
            self.rects
                .bbox()
                .union(self.polygons.bbox())
                .union(self.paths.bbox())
                .union(
                    self.rect_reps
                        .iter()
                        .fold(Rect::EMPTY, |acc, r| acc.union(r.bbox())),
                )
                .union(
                    self.polygon_reps
                        .iter()
                        .fold(Rect::EMPTY, |acc, r| acc.union(r.bbox())),
                )
        })
    }

    pub(crate) fn invalidate(&mut self) {
        self.bbox.take();
    }
}

impl TransformMut for Shapes {
    fn transform_mut(&mut self, trans: Transformation) {
        self.invalidate();
        self.rects.transform_mut(trans);
        self.polygons.transform_mut(trans);
        self.paths.transform_mut(trans);
        self.texts.transform_mut(trans);
        self.rect_reps.transform_mut(trans);
        self.polygon_reps.transform_mut(trans);
    }
}
