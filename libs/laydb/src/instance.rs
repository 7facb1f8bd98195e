//! Placed references to child cells.

use serde::{Deserialize, Serialize};

use crate::placement::Placement;
use crate::CellId;

/// An instance of a child cell inside a parent cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    cell: CellId,
    placement: Placement,
}

impl Instance {
    pub fn new(cell: CellId, placement: Placement) -> Self {
        Self { cell, placement }
    }

    /// The instantiated child cell.
    pub fn cell(&self) -> CellId {
        self.cell
    }

    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    pub(crate) fn placement_mut(&mut self) -> &mut Placement {
        &mut self.placement
    }
}
