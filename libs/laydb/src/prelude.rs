//! An import prelude that re-exports commonly used items.

pub use crate::cell::{Cell, CellUpdateOption, UpdateFlags};
pub use crate::element::{Element, ElementKind, InstanceRef, ShapeRef};
pub use crate::error::{Error, Result};
pub use crate::instance::Instance;
pub use crate::iter::{CellElementIterator, ElementIterator, ElementIteratorOption, Visit};
pub use crate::layer::Layer;
pub use crate::layout::{DeleteMode, Layout, LayoutUpdateOption};
pub use crate::placement::Placement;
pub use crate::shape_rep::ShapeRepetition;
pub use crate::shapes::{Shape, ShapeKind, Shapes};
pub use crate::spatial::{QueryKind, QueryMode, SpatialIndex, SpatialIndexOption};
pub use crate::text::Text;
pub use crate::CellId;
