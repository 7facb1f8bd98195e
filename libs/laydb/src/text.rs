//! Text labels.

use arcstr::ArcStr;
use geometry::prelude::*;
use serde::{Deserialize, Serialize};

/// A text label.
///
/// Texts mark positions and carry no area: they never contribute to bounding
/// boxes or spatial queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    text: ArcStr,
    trans: Transformation,
    font: i16,
    alignment: i16,
}

impl Text {
    /// Creates a label at the position and orientation given by `trans`.
    pub fn new(text: impl Into<ArcStr>, trans: Transformation) -> Self {
        Self {
            text: text.into(),
            trans,
            font: 0,
            alignment: 0,
        }
    }

    /// Sets the font index.
    pub fn with_font(mut self, font: i16) -> Self {
        self.font = font;
        self
    }

    /// Sets the alignment code.
    pub fn with_alignment(mut self, alignment: i16) -> Self {
        self.alignment = alignment;
        self
    }

    /// The label string.
    pub fn text(&self) -> &ArcStr {
        &self.text
    }

    /// The label transformation.
    pub fn trans(&self) -> Transformation {
        self.trans
    }

    /// The label anchor point.
    pub fn position(&self) -> Point {
        self.trans.offset_point()
    }

    /// The font index.
    pub fn font(&self) -> i16 {
        self.font
    }

    /// The alignment code.
    pub fn alignment(&self) -> i16 {
        self.alignment
    }
}

impl TranslateMut for Text {
    fn translate_mut(&mut self, p: Point) {
        self.trans = self.trans.translated(p);
    }
}

impl TransformMut for Text {
    fn transform_mut(&mut self, trans: Transformation) {
        self.trans = Transformation::cascade(trans, self.trans);
    }
}
