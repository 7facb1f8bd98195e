//! Layer identifiers.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// A layer, identified by a layer number and a data type.
///
/// Layers order by number first, then by data type.
#[derive(
    Debug, Default, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Layer {
    /// The layer number.
    pub id: u32,
    /// The data type.
    pub ty: u32,
}

impl Layer {
    /// Creates a new layer.
    pub const fn new(id: u32, ty: u32) -> Self {
        Self { id, ty }
    }
}

impl Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.id, self.ty)
    }
}

impl From<(u32, u32)> for Layer {
    fn from(value: (u32, u32)) -> Self {
        Self::new(value.0, value.1)
    }
}
