//! A hierarchical layout geometry database.
//!
//! A [`Layout`] owns a pool of [`Cell`]s. Each cell stores [`Shapes`] per
//! [`Layer`] and [`Instance`]s of other cells, placed by a [`Placement`]
//! that may repeat the child many times. Bounding boxes, layer lists and
//! grid [`SpatialIndex`]es are computed lazily per cell and layer, cached,
//! and invalidated along the parent links when anything below changes.
//!
//! # Example
//!
//! ```
//! # use geometry::prelude::*;
//! # use laydb::prelude::*;
//! let mut layout = Layout::new();
//! let top = layout.create_cell("top").unwrap();
//! let unit = layout.create_cell("unit").unwrap();
//! let layer = Layer::new(1, 0);
//!
//! layout.insert_shape(unit, layer, Rect::from_sides(0, 0, 10, 10)).unwrap();
//! let placement = Placement::builder()
//!     .offset(Point::new(100, 0))
//!     .repetition(Repetition::array(1, 3, Point::zero(), Point::new(50, 0)))
//!     .build();
//! layout.insert_instance(top, Instance::new(unit, placement)).unwrap();
//!
//! assert_eq!(layout.cell_bbox(top, layer), Rect::from_sides(100, 0, 210, 10));
//! ```

pub mod cell;
pub mod compress;
pub mod element;
pub mod error;
pub mod instance;
pub mod iter;
pub mod layer;
pub mod layout;
pub mod placement;
pub mod prelude;
pub mod shape_rep;
pub mod shapes;
pub mod spatial;
pub mod text;

#[cfg(test)]
mod tests;

use slotmap::new_key_type;

new_key_type! {
    /// A stable handle to a cell in a [`Layout`].
    pub struct CellId;
}

pub use cell::Cell;
pub use element::{Element, ElementKind, InstanceRef, ShapeRef};
pub use error::{Error, Result};
pub use instance::Instance;
pub use layer::Layer;
pub use layout::Layout;
pub use placement::Placement;
pub use shapes::{Shape, ShapeKind, Shapes};
pub use spatial::SpatialIndex;
