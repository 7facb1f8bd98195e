//! 2-D integer geometry for hierarchical integrated circuit layout.
//!
//! Coordinates are [`i32`] database units. Arithmetic saturates at the bounds of
//! [`i32`] rather than wrapping.
//!
//! # Examples
//!
//! Create a [rectangle](crate::rect::Rect) and move it:
//!
//! ```
//! # use geometry::prelude::*;
//! let rect = Rect::from_sides(10, 20, 30, 40);
//! let moved = rect.transform(Transformation::rotate(Rotation::R180));
//! assert_eq!(moved, Rect::from_sides(-30, -40, -10, -20));
//! ```
#![warn(missing_docs)]

extern crate self as geometry;

pub mod bbox;
pub mod dir;
pub mod intersect;
pub mod path;
pub mod point;
pub mod polygon;
pub mod prelude;
pub mod rect;
pub mod repetition;
pub mod transform;
