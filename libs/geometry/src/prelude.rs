//! An import prelude that re-exports commonly used items.

pub use crate::bbox::Bbox;
pub use crate::dir::Dir;
pub use crate::intersect::Intersect;
pub use crate::path::Path;
pub use crate::point::Point;
pub use crate::polygon::{ManhattanKind, Polygon};
pub use crate::rect::Rect;
pub use crate::repetition::Repetition;
pub use crate::transform::{
    Rotation, SimpleTransformation, Transform, TransformMut, Transformation, TransformationVar,
    Translate, TranslateMut,
};
