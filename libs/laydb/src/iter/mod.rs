//! Element iterators: over one cell, or over a cell and its descendants.

pub mod cell;
pub mod element;

pub use cell::{CellElementIterator, INDEX_THRESHOLD};
pub use element::{ElementIterator, ElementIteratorOption, Visit};
